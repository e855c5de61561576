extern crate clap;
use clap::*;

mod cmd_placr;

fn main() -> anyhow::Result<()> {
    let app = Command::new("placr")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`placr` - annotate PLAC-seq/HiChIP interactions with genes and factor peaks")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_placr::index::make_subcommand())
        .subcommand(cmd_placr::merge::make_subcommand())
        .subcommand(cmd_placr::classify::make_subcommand())
        .subcommand(cmd_placr::graph::make_subcommand())
        .subcommand(cmd_placr::upset::make_subcommand())
        .after_help(
            r###"Pipeline stages:

* index    - Assign interaction IDs to a 2D-bed and split the anchors
* merge    - Join per-anchor gene annotations into one unified table
* classify - Annotate one or more factor peak sets against the loops
* graph    - Build Factor/Distal/Promoter/Gene edge and node tables
* upset    - Membership matrices and category cross-tabs from the edges

Interval intersection (bedtools) and nearest-gene annotation (HOMER
annotatePeaks.pl) run outside of `placr`; each stage consumes their
tab-separated outputs and writes new tables, keyed throughout by the
`interaction_id` assigned in `index`.

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("index", sub_matches)) => cmd_placr::index::execute(sub_matches),
        Some(("merge", sub_matches)) => cmd_placr::merge::execute(sub_matches),
        Some(("classify", sub_matches)) => cmd_placr::classify::execute(sub_matches),
        Some(("graph", sub_matches)) => cmd_placr::graph::execute(sub_matches),
        Some(("upset", sub_matches)) => cmd_placr::upset::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
