use crate::libs::interaction::{Anchor, Interaction};
use anyhow::{bail, Context};
use indexmap::IndexMap;
use std::io::{BufRead, Write};

/// Promoter window around a TSS, in bp.
pub const TSS_DISTANCE: i64 = 2500;
/// Outer edge of the proximal window, in bp.
pub const PROXIMAL_DISTANCE: i64 = 10000;

/// The annotator null literal, also used in every placr output.
pub const NA: &str = "NA";

/// True for empty fields and the `NA` literal.
pub fn is_na(value: &str) -> bool {
    value.is_empty() || value == NA
}

/// One row of an external annotator (HOMER-style) table.
///
/// `key` is the annotator's own row id (first column); for anchor tables this
/// is the interaction ID passed through, for peak tables the peak ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnoRecord {
    pub key: String,
    pub chr: String,
    pub start: u64,
    pub end: u64,
    pub strand: String,
    pub annotation: String,
    pub distance_to_tss: i64,
    pub entrez: String,
    pub refseq: String,
    pub ensembl: String,
    pub gene: String,
}

impl AnnoRecord {
    /// ```
    /// # use placr::libs::anno::AnnoRecord;
    /// let mut rec = AnnoRecord {
    ///     key: "1".to_string(),
    ///     chr: "chr1".to_string(),
    ///     start: 101,
    ///     end: 200,
    ///     strand: "+".to_string(),
    ///     annotation: String::new(),
    ///     distance_to_tss: -2000,
    ///     entrez: String::new(),
    ///     refseq: String::new(),
    ///     ensembl: String::new(),
    ///     gene: "GeneA".to_string(),
    /// };
    /// assert!(rec.is_tss());
    /// rec.distance_to_tss = 2501;
    /// assert!(!rec.is_tss());
    /// ```
    pub fn is_tss(&self) -> bool {
        self.distance_to_tss.abs() <= TSS_DISTANCE
    }
}

fn col_index(header: &[&str], name: &str) -> anyhow::Result<usize> {
    header
        .iter()
        .position(|x| *x == name)
        .with_context(|| format!("required column {:?} not found", name))
}

/// Reads an annotator output table, locating the required columns by header
/// name. `Strand` and `Annotation` are optional; the first column is always
/// the row key, whatever the annotator titled it.
pub fn read_anno<R: BufRead>(reader: R) -> anyhow::Result<Vec<AnnoRecord>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => bail!("annotation table is empty, expected a header row"),
    };
    let cols: Vec<&str> = header.split('\t').collect();

    let i_chr = col_index(&cols, "Chr")?;
    let i_start = col_index(&cols, "Start")?;
    let i_end = col_index(&cols, "End")?;
    let i_dist = col_index(&cols, "Distance to TSS")?;
    let i_entrez = col_index(&cols, "Entrez ID")?;
    let i_refseq = col_index(&cols, "Nearest Refseq")?;
    let i_ensembl = col_index(&cols, "Nearest Ensembl")?;
    let i_gene = col_index(&cols, "Gene Name")?;
    let i_strand = cols.iter().position(|x| *x == "Strand");
    let i_anno = cols.iter().position(|x| *x == "Annotation");

    let need = [
        i_chr, i_start, i_end, i_dist, i_entrez, i_refseq, i_ensembl, i_gene,
    ]
    .into_iter()
    .max()
    .unwrap();

    let mut records = vec![];
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() <= need {
            bail!("annotation row {}: {} columns, expected > {}", i + 1, fields.len(), need);
        }
        let key = fields[0].to_string();
        records.push(AnnoRecord {
            chr: fields[i_chr].to_string(),
            start: fields[i_start]
                .parse()
                .with_context(|| format!("annotation {}: bad Start {:?}", key, fields[i_start]))?,
            end: fields[i_end]
                .parse()
                .with_context(|| format!("annotation {}: bad End {:?}", key, fields[i_end]))?,
            strand: i_strand.map(|j| fields[j].to_string()).unwrap_or_default(),
            annotation: i_anno.map(|j| fields[j].to_string()).unwrap_or_default(),
            distance_to_tss: fields[i_dist].parse().with_context(|| {
                format!("annotation {}: bad Distance to TSS {:?}", key, fields[i_dist])
            })?,
            entrez: fields[i_entrez].to_string(),
            refseq: fields[i_refseq].to_string(),
            ensembl: fields[i_ensembl].to_string(),
            gene: fields[i_gene].to_string(),
            key,
        });
    }

    Ok(records)
}

/// One interaction with its per-anchor annotations and TSS flags.
///
/// A missing side annotation is the documented left-join state: fields are
/// written as `NA` and the TSS flag is 0.
#[derive(Debug, Clone)]
pub struct Unified {
    pub interaction: Interaction,
    pub anno1: Option<AnnoRecord>,
    pub anno2: Option<AnnoRecord>,
}

impl Unified {
    pub fn anno(&self, side: u8) -> Option<&AnnoRecord> {
        if side == 1 {
            self.anno1.as_ref()
        } else {
            self.anno2.as_ref()
        }
    }

    /// TSS flag for one anchor side; false when the side has no annotation.
    pub fn tss(&self, side: u8) -> bool {
        self.anno(side).map_or(false, |a| a.is_tss())
    }

    pub fn anchor(&self, side: u8) -> &Anchor {
        self.interaction.anchor(side)
    }
}

/// Aligns the per-anchor annotation tables onto the indexed interactions.
/// Both annotation tables are 1:1 with the ID domain, so the row count never
/// changes; an ID missing from a table becomes a null side.
pub fn merge_annotations(
    ints: Vec<Interaction>,
    anno1: Vec<AnnoRecord>,
    anno2: Vec<AnnoRecord>,
) -> Vec<Unified> {
    let mut map1: IndexMap<String, AnnoRecord> =
        anno1.into_iter().map(|a| (a.key.clone(), a)).collect();
    let mut map2: IndexMap<String, AnnoRecord> =
        anno2.into_iter().map(|a| (a.key.clone(), a)).collect();

    ints.into_iter()
        .map(|i| {
            let key = i.id.to_string();
            Unified {
                anno1: map1.swap_remove(&key),
                anno2: map2.swap_remove(&key),
                interaction: i,
            }
        })
        .collect()
}

const SIDE_COLS: [&str; 11] = [
    "Chr",
    "Start",
    "End",
    "Strand",
    "Annotation",
    "Distance_to_TSS",
    "Entrez_ID",
    "Nearest_Refseq",
    "Nearest_Ensembl",
    "Gene_Name",
    "TSS",
];

pub fn unified_header() -> String {
    let mut cols: Vec<String> = crate::libs::interaction::INDEXED_HEADER
        .split('\t')
        .map(|x| x.to_string())
        .collect();
    for side in ["1", "2"] {
        for name in SIDE_COLS {
            cols.push(format!("{}_{}", name, side));
        }
    }
    cols.join("\t")
}

fn side_fields(anno: Option<&AnnoRecord>) -> Vec<String> {
    match anno {
        Some(a) => vec![
            a.chr.clone(),
            a.start.to_string(),
            a.end.to_string(),
            if a.strand.is_empty() { NA.to_string() } else { a.strand.clone() },
            if a.annotation.is_empty() { NA.to_string() } else { a.annotation.clone() },
            a.distance_to_tss.to_string(),
            a.entrez.clone(),
            a.refseq.clone(),
            a.ensembl.clone(),
            a.gene.clone(),
            if a.is_tss() { "1".to_string() } else { "0".to_string() },
        ],
        None => {
            let mut fields = vec![NA.to_string(); 10];
            fields.push("0".to_string());
            fields
        }
    }
}

/// Writes the 32-column unified interaction-annotation table.
pub fn write_unified<W: Write>(writer: &mut W, unified: &[Unified]) -> anyhow::Result<()> {
    writeln!(writer, "{}", unified_header())?;
    for u in unified {
        let i = &u.interaction;
        let mut fields = vec![
            i.anchor1.chr.clone(),
            i.anchor1.start.to_string(),
            i.anchor1.end.to_string(),
            i.anchor2.chr.clone(),
            i.anchor2.start.to_string(),
            i.anchor2.end.to_string(),
            i.contact_count.clone(),
            i.p_value.clone(),
            i.q_raw.clone(),
            i.id.to_string(),
        ];
        fields.extend(side_fields(u.anno1.as_ref()));
        fields.extend(side_fields(u.anno2.as_ref()));
        writeln!(writer, "{}", fields.join("\t"))?;
    }
    Ok(())
}

fn parse_side(fields: &[&str], key: &str) -> anyhow::Result<Option<AnnoRecord>> {
    // Distance is the marker for an absent side.
    if is_na(fields[5]) {
        return Ok(None);
    }
    Ok(Some(AnnoRecord {
        key: key.to_string(),
        chr: fields[0].to_string(),
        start: fields[1]
            .parse()
            .with_context(|| format!("unified {}: bad Start {:?}", key, fields[1]))?,
        end: fields[2]
            .parse()
            .with_context(|| format!("unified {}: bad End {:?}", key, fields[2]))?,
        strand: fields[3].to_string(),
        annotation: fields[4].to_string(),
        distance_to_tss: fields[5]
            .parse()
            .with_context(|| format!("unified {}: bad Distance_to_TSS {:?}", key, fields[5]))?,
        entrez: fields[6].to_string(),
        refseq: fields[7].to_string(),
        ensembl: fields[8].to_string(),
        gene: fields[9].to_string(),
    }))
}

/// Reads a unified table back into typed records.
pub fn read_unified<R: BufRead>(reader: R) -> anyhow::Result<Vec<Unified>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => bail!("unified table is empty, expected a header row"),
    };
    let n_cols = header.split('\t').count();
    if n_cols < 32 {
        bail!("unified header has {} columns, expected 32", n_cols);
    }

    let mut unified = vec![];
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 32 {
            bail!("unified row {}: {} columns, expected 32", i + 1, fields.len());
        }

        let id: usize = fields[9]
            .parse()
            .with_context(|| format!("unified row {}: bad interaction_id {:?}", i + 1, fields[9]))?;
        let key = fields[9];
        let q_raw = fields[8].to_string();
        let q_value: f64 = q_raw
            .parse()
            .with_context(|| format!("unified {}: bad q_value {:?}", key, q_raw))?;

        let interaction = Interaction {
            id,
            anchor1: Anchor {
                chr: fields[0].to_string(),
                start: fields[1]
                    .parse()
                    .with_context(|| format!("unified {}: bad start1 {:?}", key, fields[1]))?,
                end: fields[2]
                    .parse()
                    .with_context(|| format!("unified {}: bad end1 {:?}", key, fields[2]))?,
            },
            anchor2: Anchor {
                chr: fields[3].to_string(),
                start: fields[4]
                    .parse()
                    .with_context(|| format!("unified {}: bad start2 {:?}", key, fields[4]))?,
                end: fields[5]
                    .parse()
                    .with_context(|| format!("unified {}: bad end2 {:?}", key, fields[5]))?,
            },
            contact_count: fields[6].to_string(),
            p_value: fields[7].to_string(),
            q_raw,
            q_value,
        };

        unified.push(Unified {
            interaction,
            anno1: parse_side(&fields[10..21], key)?,
            anno2: parse_side(&fields[21..32], key)?,
        });
    }

    Ok(unified)
}
