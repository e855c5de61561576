use crate::libs::anno::{is_na, AnnoRecord, Unified, NA, PROXIMAL_DISTANCE, TSS_DISTANCE};
use anyhow::{bail, Context};
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use std::io::BufRead;

/// The literal annotation tags of the output contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeakAnnotation {
    Promoter,
    ProximalAnno,
    PlacAnno,
    DistalNoInteraction,
}

impl PeakAnnotation {
    /// ```
    /// # use placr::libs::classify::PeakAnnotation;
    /// assert_eq!(PeakAnnotation::PlacAnno.as_str(), "Plac_anno");
    /// ```
    pub fn as_str(&self) -> &'static str {
        match self {
            PeakAnnotation::Promoter => "Promoter",
            PeakAnnotation::ProximalAnno => "Proximal_anno",
            PeakAnnotation::PlacAnno => "Plac_anno",
            PeakAnnotation::DistalNoInteraction => "Distal_no_Interaction",
        }
    }
}

impl std::fmt::Display for PeakAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Multiple-annotation resolution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiMode {
    Keep,
    QValue,
    Concentrate,
}

impl MultiMode {
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "keep" => Ok(MultiMode::Keep),
            "q-value" => Ok(MultiMode::QValue),
            "concentrate" => Ok(MultiMode::Concentrate),
            _ => bail!("unknown multiple-annotation mode {:?}", s),
        }
    }
}

/// One peak×anchor intersection row.
#[derive(Debug, Clone)]
pub struct Overlap {
    pub peak_id: String,
    pub interaction_id: usize,
}

/// Reads an 8-column intersection table (header required): peak interval +
/// peak id, matched anchor interval + interaction id.
pub fn read_overlaps<R: BufRead>(reader: R) -> anyhow::Result<Vec<Overlap>> {
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
        overlaps.push(Overlap {
            peak_id: fields[3].to_string(),
            interaction_id: fields[7]
                .parse()
                .with_context(|| format!("overlap row {}: bad interaction id {:?}", i + 1, fields[7]))?,
        });
    }

    Ok(overlaps)
}

/// One classified peak row before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotatedPeak {
    pub peak_id: String,
    pub chr: String,
    pub start: u64,
    pub end: u64,
    pub entrez: String,
    pub refseq: String,
    pub ensembl: String,
    pub gene: String,
    pub annotation: PeakAnnotation,
    pub q_raw: Option<String>,
}

impl AnnotatedPeak {
    pub fn q(&self) -> Option<f64> {
        self.q_raw.as_ref().and_then(|s| s.parse().ok())
    }
}

pub struct ClassifyResult {
    /// The deduplicated union of proximity and interaction annotations,
    /// fallback rows last. Resolution modes operate on this.
    pub rows: Vec<AnnotatedPeak>,
    /// Unique non-NA gene symbols of the union, first-seen order.
    pub genes: Vec<String>,
}

fn own_record(peak: &AnnoRecord, tag: PeakAnnotation) -> AnnotatedPeak {
    AnnotatedPeak {
        peak_id: peak.key.clone(),
        chr: peak.chr.clone(),
        start: peak.start,
        end: peak.end,
        entrez: peak.entrez.clone(),
        refseq: peak.refseq.clone(),
        ensembl: peak.ensembl.clone(),
        gene: peak.gene.clone(),
        annotation: tag,
        q_raw: None,
    }
}

fn by_peak<'a>(overlaps: &'a [Overlap]) -> IndexMap<&'a str, Vec<usize>> {
    let mut map: IndexMap<&str, Vec<usize>> = IndexMap::new();
    for o in overlaps {
        map.entry(o.peak_id.as_str())
            .or_default()
            .push(o.interaction_id);
    }
    map
}

/// Classifies one factor's peak set. Pure per factor; independent factors can
/// run in parallel and the results concatenate.
///
/// Every peak is classified by its own nearest-TSS distance: within 2500 bp
/// it is a `Promoter`, within 10 kb `Proximal_anno`, both keeping the peak's
/// own gene. Farther peaks become `Plac_anno` through each overlapped anchor
/// that is itself non-TSS while its partner anchor is TSS; those rows take
/// the partner's gene and the interaction's q-value. With `fallback`, peaks
/// left without any row are kept as `Distal_no_Interaction`.
pub fn classify(
    peaks: &[AnnoRecord],
    ovl1: &[Overlap],
    ovl2: &[Overlap],
    unified: &IndexMap<usize, Unified>,
    fallback: bool,
) -> ClassifyResult {
    let map1 = by_peak(ovl1);
    let map2 = by_peak(ovl2);

    let mut union: IndexSet<AnnotatedPeak> = IndexSet::new();
    for peak in peaks {
        let d = peak.distance_to_tss.abs();
        if d <= TSS_DISTANCE {
            union.insert(own_record(peak, PeakAnnotation::Promoter));
        } else if d <= PROXIMAL_DISTANCE {
            union.insert(own_record(peak, PeakAnnotation::ProximalAnno));
        } else {
            for (side, map) in [(1u8, &map1), (2u8, &map2)] {
                let partner = 3 - side;
                let Some(ids) = map.get(peak.key.as_str()) else {
                    continue;
                };
                for id in ids {
                    let Some(u) = unified.get(id) else {
                        continue;
                    };
                    // The peak's anchor must loop to a promoter anchor.
                    if u.tss(side) || !u.tss(partner) {
                        continue;
                    }
                    let Some(pa) = u.anno(partner) else {
                        continue;
                    };
                    union.insert(AnnotatedPeak {
                        peak_id: peak.key.clone(),
                        chr: peak.chr.clone(),
                        start: peak.start,
                        end: peak.end,
                        entrez: pa.entrez.clone(),
                        refseq: pa.refseq.clone(),
                        ensembl: pa.ensembl.clone(),
                        gene: pa.gene.clone(),
                        annotation: PeakAnnotation::PlacAnno,
                        q_raw: Some(u.interaction.q_raw.clone()),
                    });
                }
            }
        }
    }

    let genes: Vec<String> = union
        .iter()
        .map(|r| r.gene.as_str())
        .filter(|g| !is_na(g))
        .unique()
        .map(|g| g.to_string())
        .collect();

    let mut rows: Vec<AnnotatedPeak> = union.into_iter().collect();

    if fallback {
        let annotated: IndexSet<&str> = rows.iter().map(|r| r.peak_id.as_str()).collect();
        let missing: Vec<&AnnoRecord> = peaks
            .iter()
            .filter(|p| !annotated.contains(p.key.as_str()))
            .collect();
        for peak in missing {
            rows.push(AnnotatedPeak {
                peak_id: peak.key.clone(),
                chr: peak.chr.clone(),
                start: peak.start,
                end: peak.end,
                entrez: NA.to_string(),
                refseq: NA.to_string(),
                ensembl: NA.to_string(),
                gene: NA.to_string(),
                annotation: PeakAnnotation::DistalNoInteraction,
                q_raw: None,
            });
        }
    }

    ClassifyResult { rows, genes }
}

pub const ANNOTATED_HEADER: &str =
    "PeakID\tChr\tStart\tEnd\tEntrez_ID\tNearest_Refseq\tNearest_Ensembl\tGene_Name\tAnnotation\tQ-value";

fn na_or(value: &str) -> String {
    if is_na(value) {
        NA.to_string()
    } else {
        value.to_string()
    }
}

/// Formats one row for output. Start is decremented by 1 to turn the
/// annotator's 1-based inclusive start into a BED-style start.
pub fn format_row(p: &AnnotatedPeak) -> Vec<String> {
    vec![
        p.peak_id.clone(),
        p.chr.clone(),
        p.start.saturating_sub(1).to_string(),
        p.end.to_string(),
        na_or(&p.entrez),
        na_or(&p.refseq),
        na_or(&p.ensembl),
        na_or(&p.gene),
        p.annotation.as_str().to_string(),
        p.q_raw.clone().unwrap_or_else(|| NA.to_string()),
    ]
}

/// Per peak, keeps the row with the smallest q-value; NA sorts last, ties go
/// to the first occurrence. Output keeps first-seen peak order.
pub fn resolve_q_value(rows: &[AnnotatedPeak]) -> Vec<AnnotatedPeak> {
    let mut best: IndexMap<&str, &AnnotatedPeak> = IndexMap::new();
    for row in rows {
        match best.get(row.peak_id.as_str()) {
            None => {
                best.insert(row.peak_id.as_str(), row);
            }
            Some(cur) => {
                let better = match (row.q(), cur.q()) {
                    (Some(a), Some(b)) => a < b,
                    (Some(_), None) => true,
                    _ => false,
                };
                if better {
                    best.insert(row.peak_id.as_str(), row);
                }
            }
        }
    }
    best.values().map(|r| (*r).clone()).collect()
}

/// Applies the resolution mode and formats the final table rows.
pub fn resolve(rows: &[AnnotatedPeak], mode: MultiMode) -> Vec<Vec<String>> {
    match mode {
        MultiMode::Keep => rows.iter().map(format_row).collect(),
        MultiMode::QValue => resolve_q_value(rows).iter().map(format_row).collect(),
        MultiMode::Concentrate => {
            let mut groups: IndexMap<&str, Vec<Vec<String>>> = IndexMap::new();
            for row in rows {
                groups
                    .entry(row.peak_id.as_str())
                    .or_default()
                    .push(format_row(row));
            }
            groups
                .values()
                .map(|formatted| {
                    (0..10)
                        .map(|c| {
                            formatted
                                .iter()
                                .map(|r| r[c].as_str())
                                .unique()
                                .join(", ")
                        })
                        .collect()
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::anno::merge_annotations;
    use crate::libs::interaction::read_interactions;

    fn anno(key: &str, chr: &str, start: u64, end: u64, d: i64, gene: &str) -> AnnoRecord {
        AnnoRecord {
            key: key.to_string(),
            chr: chr.to_string(),
            start,
            end,
            strand: "+".to_string(),
            annotation: String::new(),
            distance_to_tss: d,
            entrez: format!("{}-entrez", gene),
            refseq: format!("{}-refseq", gene),
            ensembl: format!("{}-ensembl", gene),
            gene: gene.to_string(),
        }
    }

    fn unified_fixture() -> IndexMap<usize, Unified> {
        // i1: anchor1 non-TSS, anchor2 TSS (GeneA, q 0.01)
        // i2: anchor1 TSS (GeneP2, q 0.04), anchor2 non-TSS
        let ints = read_interactions(
            "chr1\tstart1\tend1\tchr2\tstart2\tend2\tcontact_count\tp_value\tq_value\n\
             chr1\t100\t200\tchr1\t5000\t5100\t10\t0.001\t0.01\n\
             chr1\t300\t400\tchr1\t8000\t8100\t8\t0.002\t0.04\n"
                .as_bytes(),
        )
        .unwrap();
        let anno1 = vec![
            anno("1", "chr1", 101, 200, -50000, "GeneD1"),
            anno("2", "chr1", 301, 400, 0, "GeneP2"),
        ];
        let anno2 = vec![
            anno("1", "chr1", 5001, 5100, 100, "GeneA"),
            anno("2", "chr1", 8001, 8100, -40000, "GeneZ"),
        ];
        merge_annotations(ints, anno1, anno2)
            .into_iter()
            .map(|u| (u.interaction.id, u))
            .collect()
    }

    #[test]
    fn distance_thresholds() {
        let unified = unified_fixture();
        let peaks = vec![
            anno("p1", "chr1", 141, 160, 2000, "GeneProm"),
            anno("p2", "chr1", 900, 950, 5000, "GeneProx"),
            anno("p3", "chr1", 141, 160, 2500, "GeneEdge"),
            anno("p4", "chr1", 141, 160, -10000, "GeneEdge2"),
        ];
        let result = classify(&peaks, &[], &[], &unified, false);

        let tags: Vec<PeakAnnotation> = result.rows.iter().map(|r| r.annotation).collect();
        assert_eq!(
            tags,
            vec![
                PeakAnnotation::Promoter,
                PeakAnnotation::ProximalAnno,
                PeakAnnotation::Promoter,
                PeakAnnotation::ProximalAnno,
            ]
        );
        // Proximity rows carry the peak's own gene and no q-value.
        assert_eq!(result.rows[0].gene, "GeneProm");
        assert!(result.rows[0].q_raw.is_none());
    }

    #[test]
    fn promoter_wins_over_interaction_overlap() {
        let unified = unified_fixture();
        let peaks = vec![anno("p1", "chr1", 141, 160, 2000, "GeneProm")];
        let ovl1 = vec![Overlap {
            peak_id: "p1".to_string(),
            interaction_id: 1,
        }];
        let result = classify(&peaks, &ovl1, &[], &unified, false);
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0].annotation, PeakAnnotation::Promoter);
    }

    #[test]
    fn plac_rows_take_partner_gene_and_q() {
        let unified = unified_fixture();
        let peaks = vec![anno("p3", "chr1", 141, 160, 50000, "GeneFar")];
        // Anchor-1 overlap of i1 qualifies (own 0, partner 1); anchor-2
        // overlap of i2 qualifies the other way around.
        let ovl1 = vec![Overlap {
            peak_id: "p3".to_string(),
            interaction_id: 1,
        }];
        let ovl2 = vec![Overlap {
            peak_id: "p3".to_string(),
            interaction_id: 2,
        }];
        let result = classify(&peaks, &ovl1, &ovl2, &unified, false);

        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[0].annotation, PeakAnnotation::PlacAnno);
        assert_eq!(result.rows[0].gene, "GeneA");
        assert_eq!(result.rows[0].q_raw.as_deref(), Some("0.01"));
        assert_eq!(result.rows[1].gene, "GeneP2");
        assert_eq!(result.rows[1].q_raw.as_deref(), Some("0.04"));
        assert_eq!(result.genes, vec!["GeneA", "GeneP2"]);
    }

    #[test]
    fn tss_anchor_peak_does_not_qualify() {
        let unified = unified_fixture();
        let peaks = vec![anno("p5", "chr1", 310, 320, 50000, "GeneFar")];
        // Peak sits on the TSS anchor of i2: not a distal annotation.
        let ovl1 = vec![Overlap {
            peak_id: "p5".to_string(),
            interaction_id: 2,
        }];
        let result = classify(&peaks, &ovl1, &[], &unified, false);
        assert!(result.rows.is_empty());

        let with_fallback = classify(&peaks, &ovl1, &[], &unified, true);
        assert_eq!(with_fallback.rows.len(), 1);
        assert_eq!(
            with_fallback.rows[0].annotation,
            PeakAnnotation::DistalNoInteraction
        );
        assert_eq!(with_fallback.rows[0].gene, NA);
        assert!(with_fallback.genes.is_empty());
    }

    fn plac_row(peak: &str, gene: &str, q: &str) -> AnnotatedPeak {
        AnnotatedPeak {
            peak_id: peak.to_string(),
            chr: "chr1".to_string(),
            start: 141,
            end: 160,
            entrez: NA.to_string(),
            refseq: NA.to_string(),
            ensembl: NA.to_string(),
            gene: gene.to_string(),
            annotation: PeakAnnotation::PlacAnno,
            q_raw: Some(q.to_string()),
        }
    }

    #[test]
    fn q_value_mode_keeps_smallest() {
        let rows = vec![plac_row("p1", "GeneB", "0.04"), plac_row("p1", "GeneA", "0.01")];
        let resolved = resolve(&rows, MultiMode::QValue);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0][7], "GeneA");
        assert_eq!(resolved[0][9], "0.01");
    }

    #[test]
    fn q_value_ties_keep_first_occurrence() {
        let rows = vec![plac_row("p1", "GeneA", "0.01"), plac_row("p1", "GeneB", "0.01")];
        let resolved = resolve(&rows, MultiMode::QValue);
        assert_eq!(resolved[0][7], "GeneA");
    }

    #[test]
    fn concentrate_joins_unique_values() {
        let rows = vec![plac_row("p1", "GeneA", "0.01"), plac_row("p1", "GeneB", "0.04")];
        let resolved = resolve(&rows, MultiMode::Concentrate);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0][7], "GeneA, GeneB");
        assert_eq!(resolved[0][9], "0.01, 0.04");
        assert_eq!(resolved[0][8], "Plac_anno");
    }

    #[test]
    fn output_start_is_bed_style() {
        let row = plac_row("p1", "GeneA", "0.01");
        let formatted = format_row(&row);
        assert_eq!(formatted[2], "140");
        assert_eq!(formatted[3], "160");
    }
}
