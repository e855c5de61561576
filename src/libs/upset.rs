use crate::libs::graph::{Edge, EdgeType};
use indexmap::IndexMap;
use itertools::Itertools;
use std::io::Write;

/// True/False literals of the membership tables and category labels.
pub fn bool_str(b: bool) -> &'static str {
    if b {
        "True"
    } else {
        "False"
    }
}

/// Factor-ordered boolean matrix: one row per region, one column per factor.
#[derive(Debug, Clone)]
pub struct Membership {
    pub factors: Vec<String>,
    pub rows: IndexMap<String, Vec<bool>>,
}

impl Membership {
    /// Category label of one region, e.g. `Promoter_True_False`; regions
    /// absent from the matrix get `Promoter_NoBinding`.
    ///
    /// ```
    /// # use placr::libs::upset::Membership;
    /// # use indexmap::IndexMap;
    /// let mut rows = IndexMap::new();
    /// rows.insert("chr1:100-200".to_string(), vec![true, false]);
    /// let m = Membership {
    ///     factors: vec!["FA".to_string(), "FB".to_string()],
    ///     rows,
    /// };
    /// assert_eq!(m.label("Promoter", "chr1:100-200"), "Promoter_True_False");
    /// assert_eq!(m.label("Promoter", "chr9:1-2"), "Promoter_NoBinding");
    /// ```
    pub fn label(&self, kind: &str, region: &str) -> String {
        match self.rows.get(region) {
            Some(flags) => {
                let joined = flags.iter().map(|b| bool_str(*b)).join("_");
                format!("{}_{}", kind, joined)
            }
            None => format!("{}_NoBinding", kind),
        }
    }
}

/// The default fixed factor order: sorted unique Factor-* sources across the
/// supplied edge sets.
pub fn default_factors(edge_sets: &[&[Edge]]) -> Vec<String> {
    edge_sets
        .iter()
        .flat_map(|edges| edges.iter())
        .filter(|e| e.etype.is_factor())
        .map(|e| e.source.clone())
        .unique()
        .sorted()
        .collect()
}

/// Builds the membership matrix of one edge type. Rows appear in first-seen
/// target order; duplicate (factor, region) pairs OR-collapse. Sources not
/// in `factors` are ignored.
pub fn membership(edges: &[Edge], etype: EdgeType, factors: &[String]) -> Membership {
    let mut rows: IndexMap<String, Vec<bool>> = IndexMap::new();
    for e in edges.iter().filter(|e| e.etype == etype) {
        let Some(idx) = factors.iter().position(|f| *f == e.source) else {
            continue;
        };
        rows.entry(e.target.clone())
            .or_insert_with(|| vec![false; factors.len()])[idx] = true;
    }
    Membership {
        factors: factors.to_vec(),
        rows,
    }
}

/// Groups the matrix rows by their full boolean combination and counts them,
/// first-seen combination order.
pub fn combination_counts(m: &Membership) -> IndexMap<Vec<bool>, usize> {
    let mut counts: IndexMap<Vec<bool>, usize> = IndexMap::new();
    for flags in m.rows.values() {
        *counts.entry(flags.clone()).or_default() += 1;
    }
    counts
}

/// Promoter-category × distal-category co-occurrence over the view's
/// Distal-Promoter edges (Source = distal region, Target = promoter region).
pub fn crosstab(
    edges: &[Edge],
    promoter: &Membership,
    distal: &Membership,
) -> IndexMap<(String, String), usize> {
    let mut counts: IndexMap<(String, String), usize> = IndexMap::new();
    for e in edges.iter().filter(|e| e.etype == EdgeType::DistalPromoter) {
        let key = (
            promoter.label("Promoter", &e.target),
            distal.label("Distal", &e.source),
        );
        *counts.entry(key).or_default() += 1;
    }
    counts
}

pub fn write_membership<W: Write>(writer: &mut W, m: &Membership) -> anyhow::Result<()> {
    writeln!(writer, "Region\t{}", m.factors.join("\t"))?;
    for (region, flags) in &m.rows {
        let values = flags.iter().map(|b| bool_str(*b)).join("\t");
        writeln!(writer, "{}\t{}", region, values)?;
    }
    Ok(())
}

pub fn write_combination_counts<W: Write>(writer: &mut W, m: &Membership) -> anyhow::Result<()> {
    writeln!(writer, "{}\tCount", m.factors.join("\t"))?;
    for (flags, count) in combination_counts(m) {
        let values = flags.iter().map(|b| bool_str(*b)).join("\t");
        writeln!(writer, "{}\t{}", values, count)?;
    }
    Ok(())
}

pub fn write_crosstab<W: Write>(
    writer: &mut W,
    counts: &IndexMap<(String, String), usize>,
) -> anyhow::Result<()> {
    writeln!(writer, "Promoter_category\tDistal_category\tCount")?;
    for ((p, d), count) in counts {
        writeln!(writer, "{}\t{}\t{}", p, d, count)?;
    }
    Ok(())
}
