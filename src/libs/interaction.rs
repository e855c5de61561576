use anyhow::{bail, Context};
use std::io::{BufRead, Write};

/// One endpoint interval of a chromatin interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub chr: String,
    pub start: u64,
    pub end: u64,
}

impl Anchor {
    /// The coordinate string used as a node/region identifier.
    ///
    /// ```
    /// # use placr::libs::interaction::Anchor;
    /// let anchor = Anchor {
    ///     chr: "chr1".to_string(),
    ///     start: 100,
    ///     end: 200,
    /// };
    /// assert_eq!(anchor.coord_id(), "chr1:100-200");
    /// ```
    pub fn coord_id(&self) -> String {
        format!("{}:{}-{}", self.chr, self.start, self.end)
    }
}

/// One chromatin loop call with its ingest-time ID.
///
/// `id` is assigned once from the 1-based row position and is the sole join
/// key for every later stage. `contact_count` and `p_value` pass through
/// verbatim; the q-value is parsed eagerly but its raw text is kept so output
/// reproduces the input formatting.
#[derive(Debug, Clone)]
pub struct Interaction {
    pub id: usize,
    pub anchor1: Anchor,
    pub anchor2: Anchor,
    pub contact_count: String,
    pub p_value: String,
    pub q_raw: String,
    pub q_value: f64,
}

impl Interaction {
    pub fn anchor(&self, side: u8) -> &Anchor {
        if side == 1 {
            &self.anchor1
        } else {
            &self.anchor2
        }
    }
}

fn parse_anchor(fields: &[&str], row: usize) -> anyhow::Result<Anchor> {
    Ok(Anchor {
        chr: fields[0].to_string(),
        start: fields[1]
            .parse()
            .with_context(|| format!("row {}: bad start {:?}", row, fields[1]))?,
        end: fields[2]
            .parse()
            .with_context(|| format!("row {}: bad end {:?}", row, fields[2]))?,
    })
}

fn parse_row(fields: &[&str], row: usize, id: usize) -> anyhow::Result<Interaction> {
    let q_raw = fields[8].to_string();
    let q_value: f64 = q_raw
        .parse()
        .with_context(|| format!("row {}: bad q_value {:?}", row, q_raw))?;

    Ok(Interaction {
        id,
        anchor1: parse_anchor(&fields[0..3], row)?,
        anchor2: parse_anchor(&fields[3..6], row)?,
        contact_count: fields[6].to_string(),
        p_value: fields[7].to_string(),
        q_raw,
        q_value,
    })
}

/// Reads a 9-column 2D-bed table (header required) and assigns dense 1-based
/// interaction IDs in row order.
///
/// ```
/// # use placr::libs::interaction::read_interactions;
/// let data = "chr1\tstart1\tend1\tchr2\tstart2\tend2\tcontact_count\tp_value\tq_value\n\
///     chr1\t100\t200\tchr1\t5000\t5100\t10\t0.001\t0.01\n";
/// let ints = read_interactions(data.as_bytes()).unwrap();
/// assert_eq!(ints.len(), 1);
/// assert_eq!(ints[0].id, 1);
/// assert_eq!(ints[0].anchor2.coord_id(), "chr1:5000-5100");
/// ```
pub fn read_interactions<R: BufRead>(reader: R) -> anyhow::Result<Vec<Interaction>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => bail!("interaction table is empty, expected a header row"),
    };
    let n_cols = header.split('\t').count();
    if n_cols < 9 {
        bail!("interaction header has {} columns, expected 9", n_cols);
    }

    let mut ints = vec![];
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            bail!("interaction row {}: {} columns, expected 9", i + 1, fields.len());
        }
        let id = ints.len() + 1;
        ints.push(parse_row(&fields, i + 1, id)?);
    }

    Ok(ints)
}

/// Reads an indexed interaction table (10 columns, `interaction_id` last).
/// IDs are taken from the table, never recomputed.
pub fn read_indexed<R: BufRead>(reader: R) -> anyhow::Result<Vec<Interaction>> {
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => line?,
        None => bail!("indexed interaction table is empty, expected a header row"),
    };
    let n_cols = header.split('\t').count();
    if n_cols < 10 {
        bail!("indexed interaction header has {} columns, expected 10", n_cols);
    }

    let mut ints = vec![];
    for (i, line) in lines.enumerate() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 10 {
            bail!("indexed row {}: {} columns, expected 10", i + 1, fields.len());
        }
        let id: usize = fields[9]
            .parse()
            .with_context(|| format!("row {}: bad interaction_id {:?}", i + 1, fields[9]))?;
        ints.push(parse_row(&fields[0..9], i + 1, id)?);
    }

    Ok(ints)
}

pub const INDEXED_HEADER: &str =
    "chr1\tstart1\tend1\tchr2\tstart2\tend2\tcontact_count\tp_value\tq_value\tinteraction_id";

pub const ANCHOR_HEADER: &str = "Chr\tStart\tEnd\tInteraction_ID";

pub fn write_indexed<W: Write>(writer: &mut W, ints: &[Interaction]) -> anyhow::Result<()> {
    writeln!(writer, "{}", INDEXED_HEADER)?;
    for i in ints {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            i.anchor1.chr,
            i.anchor1.start,
            i.anchor1.end,
            i.anchor2.chr,
            i.anchor2.start,
            i.anchor2.end,
            i.contact_count,
            i.p_value,
            i.q_raw,
            i.id,
        )?;
    }
    Ok(())
}

/// Writes the single-anchor interval table for one side (1 or 2).
pub fn write_anchor_table<W: Write>(
    writer: &mut W,
    ints: &[Interaction],
    side: u8,
) -> anyhow::Result<()> {
    writeln!(writer, "{}", ANCHOR_HEADER)?;
    for i in ints {
        let anchor = i.anchor(side);
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            anchor.chr, anchor.start, anchor.end, i.id
        )?;
    }
    Ok(())
}
