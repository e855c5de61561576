use anyhow::Context;
use clap::*;

use placr::libs::{anno, interaction};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("merge")
        .about("Join per-anchor gene annotations into one unified table")
        .after_help(
            r###"
Takes the indexed interaction table from `placr index` and the annotator
output for each anchor side (HOMER annotatePeaks.pl on the anchor tables,
with `Interaction_ID` as the region name). The annotator tables must carry
the columns

    Chr, Start, End, Distance to TSS, Entrez ID,
    Nearest Refseq, Nearest Ensembl, Gene Name

located by header name; `Strand` and `Annotation` are carried when present.

Both sides align 1:1 on `interaction_id`, so the output has exactly one row
per interaction. An ID missing from an annotator table becomes an NA side
with TSS flag 0 (left-join, not an error). `TSS_1`/`TSS_2` are 1 when the
anchor sits within 2500 bp of a TSS.

Writes <prefix>.unified.tsv (32 columns) under --outdir.

Examples:
1. placr merge out/placr.interactions.tsv anchor1.anno.tsv anchor2.anno.tsv -o out

"###,
        )
        .arg(
            Arg::new("indexed")
                .required(true)
                .index(1)
                .help("Indexed interaction table from `placr index`"),
        )
        .arg(
            Arg::new("anno1")
                .required(true)
                .index(2)
                .help("Annotator output for anchor 1"),
        )
        .arg(
            Arg::new("anno2")
                .required(true)
                .index(3)
                .help("Annotator output for anchor 2"),
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

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let indexed = args.get_one::<String>("indexed").unwrap();
    let anno1 = args.get_one::<String>("anno1").unwrap();
    let anno2 = args.get_one::<String>("anno2").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();

    std::fs::create_dir_all(outdir)?;

    //----------------------------
    // Operating
    //----------------------------
    let ints = interaction::read_indexed(intspan::reader(indexed))
        .with_context(|| format!("merge: reading {}", indexed))?;
    let records1 = anno::read_anno(intspan::reader(anno1))
        .with_context(|| format!("merge: reading {}", anno1))?;
    let records2 = anno::read_anno(intspan::reader(anno2))
        .with_context(|| format!("merge: reading {}", anno2))?;

    let unified = anno::merge_annotations(ints, records1, records2);

    //----------------------------
    // Output
    //----------------------------
    let mut writer = intspan::writer(&format!("{}/{}.unified.tsv", outdir, prefix));
    anno::write_unified(&mut writer, &unified)?;

    Ok(())
}
