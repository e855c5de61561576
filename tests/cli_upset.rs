use assert_cmd::Command;
use std::path::{Path, PathBuf};

fn input(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/anno");
    path.push(filename);
    path
}

fn run_upset(outdir: &Path) {
    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("index")
        .arg(input("interactions.tsv"))
        .arg("-o")
        .arg(outdir)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("merge")
        .arg(outdir.join("placr.interactions.tsv"))
        .arg(input("anchor1.anno.tsv"))
        .arg(input("anchor2.anno.tsv"))
        .arg("-o")
        .arg(outdir)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("graph")
        .arg(input("all.ovl1.tsv"))
        .arg(input("all.ovl2.tsv"))
        .arg("--unified")
        .arg(outdir.join("placr.unified.tsv"))
        .arg("--genes")
        .arg(input("genes.tsv"))
        .arg("-o")
        .arg(outdir)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("upset")
        .arg("--edges")
        .arg(outdir.join("placr.edges.all.tsv"))
        .arg("--gene-edges")
        .arg(outdir.join("placr.edges.gene.tsv"))
        .arg("-o")
        .arg(outdir)
        .assert()
        .success();
}

#[test]
fn membership_matrices_use_sorted_factor_columns() {
    let dir = tempfile::tempdir().unwrap();
    run_upset(dir.path());

    let text =
        std::fs::read_to_string(dir.path().join("placr.all.promoter.membership.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Region\tFA\tFB");
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "chr1:5000-5100\tTrue\tFalse");
    assert_eq!(lines[2], "chr1:300-400\tFalse\tTrue");
    assert_eq!(lines[3], "chr1:9000-9100\tFalse\tTrue");

    let text =
        std::fs::read_to_string(dir.path().join("placr.all.distal.membership.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "chr1:100-200\tTrue\tFalse");
}

#[test]
fn combination_counts_group_by_full_pattern() {
    let dir = tempfile::tempdir().unwrap();
    run_upset(dir.path());

    let text = std::fs::read_to_string(dir.path().join("placr.all.promoter.upset.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "FA\tFB\tCount");
    assert_eq!(lines[1], "True\tFalse\t1");
    assert_eq!(lines[2], "False\tTrue\t2");

    let text = std::fs::read_to_string(dir.path().join("placr.all.distal.upset.tsv")).unwrap();
    assert!(text.contains("True\tFalse\t1"));
}

#[test]
fn crosstab_pairs_loop_categories() {
    let dir = tempfile::tempdir().unwrap();
    run_upset(dir.path());

    let text = std::fs::read_to_string(dir.path().join("placr.all.crosstab.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Promoter_category\tDistal_category\tCount");
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[1], "Promoter_True_False\tDistal_True_False\t1");
    assert_eq!(lines[2], "Promoter_False_True\tDistal_NoBinding\t1");
    assert_eq!(lines[3], "Promoter_NoBinding\tDistal_NoBinding\t1");
}

#[test]
fn gene_view_aggregates_are_restricted() {
    let dir = tempfile::tempdir().unwrap();
    run_upset(dir.path());

    let text =
        std::fs::read_to_string(dir.path().join("placr.gene.promoter.membership.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(text.contains("chr1:5000-5100\tTrue\tFalse"));
    assert!(text.contains("chr1:9000-9100\tFalse\tTrue"));
    assert!(!text.contains("chr1:300-400"));

    let text = std::fs::read_to_string(dir.path().join("placr.gene.crosstab.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "Promoter_True_False\tDistal_True_False\t1");
}

#[test]
fn explicit_factor_order_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    run_upset(dir.path());

    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("upset")
        .arg("--edges")
        .arg(dir.path().join("placr.edges.all.tsv"))
        .arg("--factors")
        .arg("FB,FA")
        .arg("-o")
        .arg(dir.path())
        .arg("--prefix")
        .arg("swapped")
        .assert()
        .success();

    let text =
        std::fs::read_to_string(dir.path().join("swapped.all.promoter.membership.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Region\tFB\tFA");
    assert_eq!(lines[1], "chr1:5000-5100\tFalse\tTrue");
}
