use crate::libs::anno::{is_na, Unified};
use anyhow::{bail, Context};
use indexmap::{IndexMap, IndexSet};
use std::io::{BufRead, Write};

/// The five typed relations of the graph export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeType {
    FactorDistal,
    FactorPromoter,
    DistalPromoter,
    PromoterPromoter,
    PromoterGene,
}

impl EdgeType {
    pub const ALL: [EdgeType; 5] = [
        EdgeType::FactorDistal,
        EdgeType::FactorPromoter,
        EdgeType::DistalPromoter,
        EdgeType::PromoterPromoter,
        EdgeType::PromoterGene,
    ];

    /// ```
    /// # use placr::libs::graph::EdgeType;
    /// assert_eq!(EdgeType::FactorDistal.as_str(), "Factor-Distal");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::FactorDistal => "Factor-Distal",
            EdgeType::FactorPromoter => "Factor-Promoter",
            EdgeType::DistalPromoter => "Distal-Promoter",
            EdgeType::PromoterPromoter => "Promoter-Promoter",
            EdgeType::PromoterGene => "Promoter-Gene",
        }
    }

    /// Lower-case file-name slug for the per-type tables.
    pub fn slug(&self) -> &'static str {
        match self {
            EdgeType::FactorDistal => "factor-distal",
            EdgeType::FactorPromoter => "factor-promoter",
            EdgeType::DistalPromoter => "distal-promoter",
            EdgeType::PromoterPromoter => "promoter-promoter",
            EdgeType::PromoterGene => "promoter-gene",
        }
    }

    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "Factor-Distal" => Ok(EdgeType::FactorDistal),
            "Factor-Promoter" => Ok(EdgeType::FactorPromoter),
            "Distal-Promoter" => Ok(EdgeType::DistalPromoter),
            "Promoter-Promoter" => Ok(EdgeType::PromoterPromoter),
            "Promoter-Gene" => Ok(EdgeType::PromoterGene),
            _ => bail!("unknown edge type {:?}", s),
        }
    }

    pub fn is_factor(&self) -> bool {
        matches!(self, EdgeType::FactorDistal | EdgeType::FactorPromoter)
    }
}

/// Node types in tie-break priority order: an identifier playing several
/// roles is typed by the first matching variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeType {
    Factor,
    Distal,
    Promoter,
    Gene,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Factor => "Factor",
            NodeType::Distal => "Distal",
            NodeType::Promoter => "Promoter",
            NodeType::Gene => "Gene",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub score: f64,
    pub etype: EdgeType,
}

/// One genome-wide peak×anchor intersection row. Column 4 is the factor
/// name; `peak_key` rebuilds the 0-based `chr:start-end` of the peak by
/// subtracting 1 from the intersection tool's start.
#[derive(Debug, Clone)]
pub struct FactorOverlap {
    pub factor: String,
    pub peak_key: String,
    pub interaction_id: usize,
}

/// ```
/// # use placr::libs::graph::read_factor_overlaps;
/// let data = "Chr\tStart\tEnd\tPeak\tChr_a\tStart_a\tEnd_a\tInteraction_ID\n\
///     chr1\t151\t160\tFA\tchr1\t100\t200\t1\n";
/// let overlaps = read_factor_overlaps(data.as_bytes()).unwrap();
/// assert_eq!(overlaps[0].factor, "FA");
/// assert_eq!(overlaps[0].peak_key, "chr1:150-160");
/// ```
pub fn read_factor_overlaps<R: BufRead>(reader: R) -> anyhow::Result<Vec<FactorOverlap>> {
    let mut lines = reader.lines();
    if lines.next().is_none() {
        bail!("overlap table is empty, expected a header row");
    }

    let mut overlaps = vec![];
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 8 {
            bail!("overlap row {}: {} columns, expected 8", i + 1, fields.len());
        }
        let start: u64 = fields[1]
            .parse()
            .with_context(|| format!("overlap row {}: bad start {:?}", i + 1, fields[1]))?;
        overlaps.push(FactorOverlap {
            factor: fields[3].to_string(),
            peak_key: format!("{}:{}-{}", fields[0], start.saturating_sub(1), fields[2]),
            interaction_id: fields[7]
                .parse()
                .with_context(|| format!("overlap row {}: bad interaction id {:?}", i + 1, fields[7]))?,
        });
    }

    Ok(overlaps)
}

/// `-log10(q)` with q floored at the smallest positive double, so q = 0
/// never produces a non-finite score.
///
/// ```
/// # use placr::libs::graph::neg_log10_q;
/// assert!((neg_log10_q(0.01) - 2.0).abs() < 1e-12);
/// assert!(neg_log10_q(0.0).is_finite());
/// ```
pub fn neg_log10_q(q: f64) -> f64 {
    let q = if q > 0.0 { q } else { f64::MIN_POSITIVE };
    -q.log10()
}

fn by_interaction(overlaps: &[FactorOverlap]) -> IndexMap<usize, Vec<&FactorOverlap>> {
    let mut map: IndexMap<usize, Vec<&FactorOverlap>> = IndexMap::new();
    for o in overlaps {
        map.entry(o.interaction_id).or_default().push(o);
    }
    map
}

/// Derives every typed edge from the unified table and the genome-wide
/// overlaps. Duplicate `(Source, Target, Edge_type)` keys keep the first
/// occurrence; iteration order is unified row order, anchor side 1 before
/// side 2, overlap rows in input order.
pub fn build_edges(
    unified: &[Unified],
    ovl1: &[FactorOverlap],
    ovl2: &[FactorOverlap],
) -> Vec<Edge> {
    let map1 = by_interaction(ovl1);
    let map2 = by_interaction(ovl2);

    let mut seen: IndexSet<(String, String, EdgeType)> = IndexSet::new();
    let mut edges = vec![];
    let mut push = |edges: &mut Vec<Edge>, source: String, target: String, score: f64, etype: EdgeType| {
        if seen.insert((source.clone(), target.clone(), etype)) {
            edges.push(Edge {
                source,
                target,
                score,
                etype,
            });
        }
    };

    for u in unified {
        let id = u.interaction.id;

        for (side, map) in [(1u8, &map1), (2u8, &map2)] {
            let partner = 3 - side;
            let Some(overlaps) = map.get(&id) else {
                continue;
            };
            let coord = u.anchor(side).coord_id();
            for o in overlaps {
                if u.tss(side) {
                    push(
                        &mut edges,
                        o.factor.clone(),
                        coord.clone(),
                        1.0,
                        EdgeType::FactorPromoter,
                    );
                } else if u.tss(partner) {
                    push(
                        &mut edges,
                        o.factor.clone(),
                        coord.clone(),
                        1.0,
                        EdgeType::FactorDistal,
                    );
                }
            }
        }

        let (t1, t2) = (u.tss(1), u.tss(2));
        if t1 != t2 {
            let (distal, promoter) = if t2 { (1, 2) } else { (2, 1) };
            push(
                &mut edges,
                u.anchor(distal).coord_id(),
                u.anchor(promoter).coord_id(),
                u.interaction.q_value,
                EdgeType::DistalPromoter,
            );
        } else if t1 && t2 {
            push(
                &mut edges,
                u.anchor(1).coord_id(),
                u.anchor(2).coord_id(),
                neg_log10_q(u.interaction.q_value),
                EdgeType::PromoterPromoter,
            );
        }

        for side in [1u8, 2u8] {
            if !u.tss(side) {
                continue;
            }
            let Some(anno) = u.anno(side) else {
                continue;
            };
            if is_na(&anno.gene) {
                continue;
            }
            push(
                &mut edges,
                u.anchor(side).coord_id(),
                anno.gene.clone(),
                1.0,
                EdgeType::PromoterGene,
            );
        }
    }

    edges
}

/// Keeps every Factor-* edge; other edges survive only when at least one
/// endpoint is a target of some Factor-* edge.
pub fn factor_view(edges: &[Edge]) -> Vec<Edge> {
    let bound: IndexSet<&str> = edges
        .iter()
        .filter(|e| e.etype.is_factor())
        .map(|e| e.target.as_str())
        .collect();

    edges
        .iter()
        .filter(|e| {
            e.etype.is_factor()
                || bound.contains(e.source.as_str())
                || bound.contains(e.target.as_str())
        })
        .cloned()
        .collect()
}

/// Seeds on Promoter-Gene edges whose gene is listed, then propagates
/// backward: Distal-Promoter edges into the seed promoters, Factor-Distal
/// edges onto those distal anchors, Promoter-Promoter edges touching the
/// seed promoters, and Factor-Promoter edges onto any retained promoter.
pub fn gene_view(edges: &[Edge], genes: &IndexSet<String>) -> Vec<Edge> {
    let p0: IndexSet<&str> = edges
        .iter()
        .filter(|e| e.etype == EdgeType::PromoterGene && genes.contains(&e.target))
        .map(|e| e.source.as_str())
        .collect();

    let mut promoters: IndexSet<&str> = p0.clone();
    for e in edges {
        if e.etype == EdgeType::PromoterPromoter
            && (p0.contains(e.source.as_str()) || p0.contains(e.target.as_str()))
        {
            promoters.insert(e.source.as_str());
            promoters.insert(e.target.as_str());
        }
    }

    let distal: IndexSet<&str> = edges
        .iter()
        .filter(|e| e.etype == EdgeType::DistalPromoter && p0.contains(e.target.as_str()))
        .map(|e| e.source.as_str())
        .collect();

    edges
        .iter()
        .filter(|e| match e.etype {
            EdgeType::PromoterGene => genes.contains(&e.target),
            EdgeType::PromoterPromoter => {
                p0.contains(e.source.as_str()) || p0.contains(e.target.as_str())
            }
            EdgeType::DistalPromoter => p0.contains(e.target.as_str()),
            EdgeType::FactorDistal => distal.contains(e.target.as_str()),
            EdgeType::FactorPromoter => promoters.contains(e.target.as_str()),
        })
        .cloned()
        .collect()
}

/// Derives the node table of an edge set. Every endpoint appears once, in
/// first-seen order, typed by the fixed priority Factor > Distal > Promoter
/// > Gene.
pub fn nodes(edges: &[Edge]) -> Vec<(String, NodeType)> {
    let mut types: IndexMap<String, NodeType> = IndexMap::new();

    for e in edges {
        let (st, tt) = match e.etype {
            EdgeType::FactorDistal => (NodeType::Factor, NodeType::Distal),
            EdgeType::FactorPromoter => (NodeType::Factor, NodeType::Promoter),
            EdgeType::DistalPromoter => (NodeType::Distal, NodeType::Promoter),
            EdgeType::PromoterPromoter => (NodeType::Promoter, NodeType::Promoter),
            EdgeType::PromoterGene => (NodeType::Promoter, NodeType::Gene),
        };
        for (name, t) in [(&e.source, st), (&e.target, tt)] {
            match types.get_mut(name.as_str()) {
                Some(cur) => {
                    if t < *cur {
                        *cur = t;
                    }
                }
                None => {
                    types.insert(name.clone(), t);
                }
            }
        }
    }

    types.into_iter().collect()
}

pub const EDGE_HEADER: &str = "Source\tTarget\tEdge_score\tEdge_type";
pub const NODE_HEADER: &str = "Node\tNode_type";

pub fn write_edges<W: Write>(writer: &mut W, edges: &[Edge]) -> anyhow::Result<()> {
    writeln!(writer, "{}", EDGE_HEADER)?;
    for e in edges {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            e.source,
            e.target,
            e.score,
            e.etype.as_str()
        )?;
    }
    Ok(())
}

pub fn write_nodes<W: Write>(writer: &mut W, nodes: &[(String, NodeType)]) -> anyhow::Result<()> {
    writeln!(writer, "{}", NODE_HEADER)?;
    for (name, t) in nodes {
        writeln!(writer, "{}\t{}", name, t.as_str())?;
    }
    Ok(())
}

/// Reads an edge table back (for the aggregation stage).
pub fn read_edges<R: BufRead>(reader: R) -> anyhow::Result<Vec<Edge>> {
    let mut lines = reader.lines();
    if lines.next().is_none() {
        bail!("edge table is empty, expected a header row");
    }

    let mut edges = vec![];
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 4 {
            bail!("edge row {}: {} columns, expected 4", i + 1, fields.len());
        }
        edges.push(Edge {
            source: fields[0].to_string(),
            target: fields[1].to_string(),
            score: fields[2]
                .parse()
                .with_context(|| format!("edge row {}: bad score {:?}", i + 1, fields[2]))?,
            etype: EdgeType::from_str(fields[3])?,
        });
    }

    Ok(edges)
}
