use anyhow::Context;
use clap::*;

use placr::libs::interaction;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("index")
        .about("Assign interaction IDs to a 2D-bed and split the anchors")
        .after_help(
            r###"
The input is a tab-separated 2D-bed with a header row and nine columns:

    chr1 start1 end1 chr2 start2 end2 contact_count p_value q_value

Every data row receives `interaction_id` = its 1-based position; the IDs are
assigned exactly once here and every later stage joins on them. Input files
can be gzipped; 'stdin' reads from standard input.

Output files under --outdir:

* <prefix>.interactions.tsv - the nine input columns plus `interaction_id`
* <prefix>.anchor1.tsv      - Chr/Start/End/Interaction_ID of anchor 1
* <prefix>.anchor2.tsv      - the same for anchor 2

The anchor tables are what the external annotator and intersection tools
should be run against, with `Interaction_ID` as the region name.

Examples:
1. placr index tests/anno/interactions.tsv -o out

2. placr index interactions.tsv.gz -o out --prefix brain

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input 2D-bed file (or stdin)"),
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
    let infile = args.get_one::<String>("infile").unwrap();
    let outdir = args.get_one::<String>("outdir").unwrap();
    let prefix = args.get_one::<String>("prefix").unwrap();

    std::fs::create_dir_all(outdir)?;

    //----------------------------
    // Operating
    //----------------------------
    let reader = intspan::reader(infile);
    let ints = interaction::read_interactions(reader)
        .with_context(|| format!("index: reading {}", infile))?;

    //----------------------------
    // Output
    //----------------------------
    let mut writer = intspan::writer(&format!("{}/{}.interactions.tsv", outdir, prefix));
    interaction::write_indexed(&mut writer, &ints)?;

    for side in [1u8, 2u8] {
        let mut writer = intspan::writer(&format!("{}/{}.anchor{}.tsv", outdir, prefix, side));
        interaction::write_anchor_table(&mut writer, &ints, side)?;
    }

    Ok(())
}
