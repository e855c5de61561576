use anyhow::Context;
use clap::*;

use placr::libs::graph::{self, EdgeType};
use placr::libs::upset;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("upset")
        .about("Membership matrices and category cross-tabs from the edges")
        .after_help(
            r###"
Consumes the combined edge tables written by `placr graph`: --edges is the
all view, --gene-edges (optional) the gene-restricted view. For each view
and each category (Promoter regions from Factor-Promoter edges, Distal
regions from Factor-Distal edges) this writes

* <prefix>.<view>.<category>.membership.tsv - Region + one True/False
  column per factor, duplicate regions collapsed with OR
* <prefix>.<view>.<category>.upset.tsv      - one row per observed factor
  combination with its Count

plus <prefix>.<view>.crosstab.tsv: for every Distal-Promoter edge of the
view, the co-occurrence count of the promoter anchor's category label
(`Promoter_True_False...`, `Promoter_NoBinding` when unbound) against the
distal anchor's label.

The factor column order is fixed once: --factors if given, otherwise the
sorted unique factor names observed in the supplied edge tables.

Examples:
1. placr upset --edges out/placr.edges.all.tsv -o out

2. placr upset --edges out/placr.edges.all.tsv \
       --gene-edges out/placr.edges.gene.tsv --factors FA,FB -o out

"###,
        )
        .arg(
            Arg::new("edges")
                .long("edges")
                .num_args(1)
                .required(true)
                .help("All-view edge table from `placr graph`"),
        )
        .arg(
            Arg::new("gene-edges")
                .long("gene-edges")
                .num_args(1)
                .help("Gene-view edge table from `placr graph`"),
        )
        .arg(
            Arg::new("factors")
                .long("factors")
                .num_args(1)
                .help("Comma-separated factor column order"),
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

fn write_aggregates(
    outdir: &str,
    prefix: &str,
    view: &str,
    edges: &[graph::Edge],
    factors: &[String],
) -> anyhow::Result<()> {
    let promoter = upset::membership(edges, EdgeType::FactorPromoter, factors);
    let distal = upset::membership(edges, EdgeType::FactorDistal, factors);

    for (category, m) in [("promoter", &promoter), ("distal", &distal)] {
        let mut writer = intspan::writer(&format!(
            "{}/{}.{}.{}.membership.tsv",
            outdir, prefix, view, category
        ));
        upset::write_membership(&mut writer, m)?;

        let mut writer = intspan::writer(&format!(
            "{}/{}.{}.{}.upset.tsv",
            outdir, prefix, view, category
        ));
        upset::write_combination_counts(&mut writer, m)?;
    }

    let counts = upset::crosstab(edges, &promoter, &distal);
    let mut writer = intspan::writer(&format!("{}/{}.{}.crosstab.tsv", outdir, prefix, view));
    upset::write_crosstab(&mut writer, &counts)?;

    Ok(())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let edges_file = args.get_one::<String>("edges").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();

    std::fs::create_dir_all(outdir)?;

    //----------------------------
    // Operating
    //----------------------------
    let edges = graph::read_edges(intspan::reader(edges_file))
        .with_context(|| format!("upset: reading {}", edges_file))?;

    let gene_edges = match args.get_one::<String>("gene-edges") {
        Some(file) => Some(
            graph::read_edges(intspan::reader(file))
                .with_context(|| format!("upset: reading {}", file))?,
        ),
        None => None,
    };

    let factors: Vec<String> = match args.get_one::<String>("factors") {
        Some(list) => list.split(',').map(|s| s.trim().to_string()).collect(),
        None => {
            let mut sets: Vec<&[graph::Edge]> = vec![&edges];
            if let Some(g) = &gene_edges {
                sets.push(g);
            }
            upset::default_factors(&sets)
        }
    };

    //----------------------------
    // Output
    //----------------------------
    write_aggregates(outdir, prefix, "all", &edges, &factors)?;
    if let Some(g) = &gene_edges {
        write_aggregates(outdir, prefix, "gene", g, &factors)?;
    }

    Ok(())
}
