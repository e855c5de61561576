use anyhow::Context;
use clap::*;
use indexmap::IndexSet;
use std::io::BufRead;

use placr::libs::{anno, graph};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("graph")
        .about("Build Factor/Distal/Promoter/Gene edge and node tables")
        .after_help(
            r###"
OVERLAP1 and OVERLAP2 are the genome-wide intersections of every factor's
peaks (concatenated, factor name in column 4) with the anchor-1 and anchor-2
tables. Together with the unified table this derives the typed edges:

    Factor-Distal      factor at a non-TSS anchor looping to a TSS anchor
    Factor-Promoter    factor at a TSS anchor
    Distal-Promoter    loops with exactly one TSS anchor, scored by q-value
    Promoter-Promoter  loops with two TSS anchors, scored by -log10(q)
    Promoter-Gene      TSS anchor paired with its resident gene

Duplicate (Source, Target, Edge_type) keys keep their first occurrence.
Three views are written: `all`, `factor` (non-factor edges must touch a
factor-bound anchor), and - when --genes is given - `gene` (seeded from the
listed gene symbols and propagated backward through the loops). Node tables
type every endpoint with the priority Factor > Distal > Promoter > Gene.

Output files under --outdir:

* <prefix>.edges.{all,factor,gene}.tsv - Source/Target/Edge_score/Edge_type
* <prefix>.nodes.{all,factor,gene}.tsv - Node/Node_type
* <prefix>.edges.<type>.tsv            - the all view split by edge type

Examples:
1. placr graph all.ovl1.tsv all.ovl2.tsv --unified out/placr.unified.tsv -o out

2. placr graph all.ovl1.tsv all.ovl2.tsv --unified out/placr.unified.tsv \
       --genes out/placr.FA.genes.tsv -o out

"###,
        )
        .arg(
            Arg::new("overlap1")
                .required(true)
                .index(1)
                .help("Genome-wide peak×anchor-1 intersection table"),
        )
        .arg(
            Arg::new("overlap2")
                .required(true)
                .index(2)
                .help("Genome-wide peak×anchor-2 intersection table"),
        )
        .arg(
            Arg::new("unified")
                .long("unified")
                .num_args(1)
                .required(true)
                .help("Unified interaction-annotation table from `placr merge`"),
        )
        .arg(
            Arg::new("genes")
                .long("genes")
                .num_args(1)
                .help("Gene symbol list (one per line, no header) enabling the gene view"),
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

fn read_gene_list(input: &str) -> anyhow::Result<IndexSet<String>> {
    let mut genes = IndexSet::new();
    for line in intspan::reader(input).lines() {
        let line = line?;
        let symbol = line.trim();
        if !symbol.is_empty() {
            genes.insert(symbol.to_string());
        }
    }
    Ok(genes)
}

fn write_view(
    outdir: &str,
    prefix: &str,
    view: &str,
    edges: &[graph::Edge],
) -> anyhow::Result<()> {
    let mut writer = intspan::writer(&format!("{}/{}.edges.{}.tsv", outdir, prefix, view));
    graph::write_edges(&mut writer, edges)?;

    let mut writer = intspan::writer(&format!("{}/{}.nodes.{}.tsv", outdir, prefix, view));
    graph::write_nodes(&mut writer, &graph::nodes(edges))?;

    Ok(())
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let overlap1 = args.get_one::<String>("overlap1").unwrap();
    let overlap2 = args.get_one::<String>("overlap2").unwrap();
    let unified_file = args.get_one::<String>("unified").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();

    std::fs::create_dir_all(outdir)?;

    //----------------------------
    // Operating
    //----------------------------
    let unified = anno::read_unified(intspan::reader(unified_file))
        .with_context(|| format!("graph: reading {}", unified_file))?;
    let ovl1 = graph::read_factor_overlaps(intspan::reader(overlap1))
        .with_context(|| format!("graph: reading {}", overlap1))?;
    let ovl2 = graph::read_factor_overlaps(intspan::reader(overlap2))
        .with_context(|| format!("graph: reading {}", overlap2))?;

    let edges = graph::build_edges(&unified, &ovl1, &ovl2);

    //----------------------------
    // Output
    //----------------------------
    write_view(outdir, prefix, "all", &edges)?;
    write_view(outdir, prefix, "factor", &graph::factor_view(&edges))?;

    if let Some(genes_file) = args.get_one::<String>("genes") {
        let genes = read_gene_list(genes_file)
            .with_context(|| format!("graph: reading {}", genes_file))?;
        write_view(outdir, prefix, "gene", &graph::gene_view(&edges, &genes))?;
    }

    for etype in graph::EdgeType::ALL {
        let slice: Vec<graph::Edge> = edges
            .iter()
            .filter(|e| e.etype == etype)
            .cloned()
            .collect();
        let mut writer =
            intspan::writer(&format!("{}/{}.edges.{}.tsv", outdir, prefix, etype.slug()));
        graph::write_edges(&mut writer, &slice)?;
    }

    Ok(())
}
