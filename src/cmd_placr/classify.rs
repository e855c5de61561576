use anyhow::{bail, Context};
use clap::*;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use rayon::prelude::*;
use regex::Regex;
use std::io::Write;

use placr::libs::anno::{self, Unified};
use placr::libs::classify::{self, MultiMode};

lazy_static! {
    static ref SPEC_RE: Regex = Regex::new(r"^([^,]+),([^,]+),([^,]+),([^,]+)$").unwrap();
}

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("classify")
        .about("Annotate one or more factor peak sets against the loops")
        .after_help(
            r###"
Each positional argument describes one factor peak set as

    NAME,ANNO,OVERLAP1,OVERLAP2

where ANNO is the annotator output for the peaks themselves, and OVERLAP1/2
are the 8-column intersections of the peaks with the anchor-1 and anchor-2
tables. Factors are classified independently (and in parallel); outputs are
written per factor.

Classification by the peak's own nearest-TSS distance d:

    |d| <= 2500          Promoter       (own gene, no q-value)
    2500 < |d| <= 10000  Proximal_anno  (own gene, no q-value)
    otherwise            Plac_anno      through each overlapped anchor whose
                                        own TSS flag is 0 while the partner
                                        anchor's is 1; takes the partner
                                        gene and the interaction's q-value

--fallback keeps otherwise-unannotated peaks as Distal_no_Interaction;
without it they are dropped. --mode resolves peaks with several rows:
keep every row, keep the smallest q-value, or concentrate all columns into
comma-joined unique values.

Output Start is the annotator start minus 1 (BED-style). Per factor:

* <prefix>.<NAME>.annotated.tsv
* <prefix>.<NAME>.genes.tsv - unique gene symbols, one per line, no header

Examples:
1. placr classify --unified out/placr.unified.tsv \
       FA,FA.anno.tsv,FA.ovl1.tsv,FA.ovl2.tsv -o out

2. placr classify --unified out/placr.unified.tsv --mode q-value --fallback \
       FA,FA.anno.tsv,FA.ovl1.tsv,FA.ovl2.tsv \
       FB,FB.anno.tsv,FB.ovl1.tsv,FB.ovl2.tsv -o out

"###,
        )
        .arg(
            Arg::new("specs")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Factor peak sets, each as NAME,ANNO,OVERLAP1,OVERLAP2"),
        )
        .arg(
            Arg::new("unified")
                .long("unified")
                .num_args(1)
                .required(true)
                .help("Unified interaction-annotation table from `placr merge`"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .num_args(1)
                .default_value("keep")
                .value_parser(["keep", "q-value", "concentrate"])
                .help("Multiple-annotation resolution mode"),
        )
        .arg(
            Arg::new("fallback")
                .long("fallback")
                .action(ArgAction::SetTrue)
                .help("Keep unannotated distal peaks as Distal_no_Interaction"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('o')
                .num_args(1)
                .default_value(".")
                .help("Output directory"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .num_args(1)
                .default_value("placr")
                .help("Output name stem"),
        )
}

struct FactorSpec {
    name: String,
    anno: String,
    ovl1: String,
    ovl2: String,
}

fn parse_spec(spec: &str) -> anyhow::Result<FactorSpec> {
    let Some(caps) = SPEC_RE.captures(spec) else {
        bail!("classify: bad factor spec {:?}, expected NAME,ANNO,OVERLAP1,OVERLAP2", spec);
    };
    Ok(FactorSpec {
        name: caps[1].to_string(),
        anno: caps[2].to_string(),
        ovl1: caps[3].to_string(),
        ovl2: caps[4].to_string(),
    })
}

fn run_factor(
    spec: &FactorSpec,
    unified: &IndexMap<usize, Unified>,
    fallback: bool,
    mode: MultiMode,
) -> anyhow::Result<(Vec<Vec<String>>, Vec<String>)> {
    let peaks = anno::read_anno(intspan::reader(&spec.anno))
        .with_context(|| format!("classify {}: reading {}", spec.name, spec.anno))?;
    let ovl1 = classify::read_overlaps(intspan::reader(&spec.ovl1))
        .with_context(|| format!("classify {}: reading {}", spec.name, spec.ovl1))?;
    let ovl2 = classify::read_overlaps(intspan::reader(&spec.ovl2))
        .with_context(|| format!("classify {}: reading {}", spec.name, spec.ovl2))?;

    let result = classify::classify(&peaks, &ovl1, &ovl2, unified, fallback);
    Ok((classify::resolve(&result.rows, mode), result.genes))
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let specs = args
        .get_many::<String>("specs")
        .unwrap()
        .map(|s| parse_spec(s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let unified_file = args.get_one::<String>("unified").unwrap();
    let mode = MultiMode::from_str(args.get_one::<String>("mode").unwrap())?;
    let fallback = args.get_flag("fallback");
    let outdir = args.get_one::<String>("outdir").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();

    std::fs::create_dir_all(outdir)?;

    //----------------------------
    // Operating
    //----------------------------
    let unified: IndexMap<usize, Unified> = anno::read_unified(intspan::reader(unified_file))
        .with_context(|| format!("classify: reading {}", unified_file))?
        .into_iter()
        .map(|u| (u.interaction.id, u))
        .collect();

    let results: Vec<(Vec<Vec<String>>, Vec<String>)> = specs
        .par_iter()
        .map(|spec| run_factor(spec, &unified, fallback, mode))
        .collect::<anyhow::Result<Vec<_>>>()?;

    //----------------------------
    // Output
    //----------------------------
    for (spec, (rows, genes)) in specs.iter().zip(results) {
        let mut writer = intspan::writer(&format!(
            "{}/{}.{}.annotated.tsv",
            outdir, prefix, spec.name
        ));
        writeln!(writer, "{}", classify::ANNOTATED_HEADER)?;
        for row in &rows {
            writeln!(writer, "{}", row.join("\t"))?;
        }

        let mut writer =
            intspan::writer(&format!("{}/{}.{}.genes.tsv", outdir, prefix, spec.name));
        for gene in &genes {
            writeln!(writer, "{}", gene)?;
        }
    }

    Ok(())
}
