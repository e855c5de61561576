use assert_cmd::Command;
use std::path::{Path, PathBuf};

fn input(filename: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/anno");
    path.push(filename);
    path
}

fn run_pipeline(outdir: &Path) -> PathBuf {
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

    outdir.join("placr.unified.tsv")
}

fn fa_spec() -> String {
    format!(
        "FA,{},{},{}",
        input("FA.anno.tsv").display(),
        input("FA.ovl1.tsv").display(),
        input("FA.ovl2.tsv").display()
    )
}

fn run_classify(outdir: &Path, unified: &Path, extra: &[&str]) {
    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("classify")
        .arg("--unified")
        .arg(unified)
        .arg("-o")
        .arg(outdir)
        .args(extra)
        .arg(fa_spec())
        .assert()
        .success();
}

#[test]
fn keep_mode_retains_every_rule_match() {
    let dir = tempfile::tempdir().unwrap();
    let unified = run_pipeline(dir.path());
    run_classify(dir.path(), &unified, &["--fallback"]);

    let text = std::fs::read_to_string(dir.path().join("placr.FA.annotated.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        "PeakID\tChr\tStart\tEnd\tEntrez_ID\tNearest_Refseq\tNearest_Ensembl\tGene_Name\tAnnotation\tQ-value"
    );

    // Promoter and proximal peaks keep their own gene; Start is BED-style.
    assert_eq!(lines[1], "p1\tchr1\t5040\t5060\t333\tNM_A\tENSG_A\tGeneA\tPromoter\tNA");
    assert_eq!(
        lines[2],
        "p2\tchr1\t900\t950\t1010\tNM_PX\tENSG_PX\tGeneProx\tProximal_anno\tNA"
    );

    // The distal peak maps through both qualifying loops, partner gene and
    // interaction q-value each time.
    assert_eq!(lines[3], "p3\tchr1\t140\t160\t333\tNM_A\tENSG_A\tGeneA\tPlac_anno\t0.01");
    assert_eq!(lines[4], "p3\tchr1\t140\t160\t999\tNM_E\tENSG_E\tGeneE\tPlac_anno\t0.005");

    // --fallback keeps the orphan peak with NA annotations.
    assert_eq!(
        lines[5],
        "p4\tchr1\t30140\t30160\tNA\tNA\tNA\tNA\tDistal_no_Interaction\tNA"
    );

    let genes = std::fs::read_to_string(dir.path().join("placr.FA.genes.tsv")).unwrap();
    assert_eq!(genes, "GeneA\nGeneProx\nGeneE\n");
}

#[test]
fn without_fallback_orphan_peaks_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let unified = run_pipeline(dir.path());
    run_classify(dir.path(), &unified, &[]);

    let text = std::fs::read_to_string(dir.path().join("placr.FA.annotated.tsv")).unwrap();
    assert_eq!(text.lines().count(), 5);
    assert!(!text.contains("Distal_no_Interaction"));
    assert!(!text.contains("p4"));
}

#[test]
fn q_value_mode_keeps_the_smallest_q_per_peak() {
    let dir = tempfile::tempdir().unwrap();
    let unified = run_pipeline(dir.path());
    run_classify(dir.path(), &unified, &["--mode", "q-value"]);

    let text = std::fs::read_to_string(dir.path().join("placr.FA.annotated.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[3], "p3\tchr1\t140\t160\t999\tNM_E\tENSG_E\tGeneE\tPlac_anno\t0.005");
    assert!(!text.contains("0.01"));

    // The gene list is computed before resolution, so GeneA stays.
    let genes = std::fs::read_to_string(dir.path().join("placr.FA.genes.tsv")).unwrap();
    assert_eq!(genes, "GeneA\nGeneProx\nGeneE\n");
}

#[test]
fn concentrate_mode_joins_unique_values() {
    let dir = tempfile::tempdir().unwrap();
    let unified = run_pipeline(dir.path());
    run_classify(dir.path(), &unified, &["--mode", "concentrate"]);

    let text = std::fs::read_to_string(dir.path().join("placr.FA.annotated.tsv")).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[3],
        "p3\tchr1\t140\t160\t333, 999\tNM_A, NM_E\tENSG_A, ENSG_E\tGeneA, GeneE\tPlac_anno\t0.01, 0.005"
    );
}

#[test]
fn factors_are_processed_independently() {
    let dir = tempfile::tempdir().unwrap();
    let unified = run_pipeline(dir.path());

    // The same peak set under two names: identical outputs per factor.
    let spec_b = format!(
        "FB,{},{},{}",
        input("FA.anno.tsv").display(),
        input("FA.ovl1.tsv").display(),
        input("FA.ovl2.tsv").display()
    );
    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("classify")
        .arg("--unified")
        .arg(&unified)
        .arg("-o")
        .arg(dir.path())
        .arg(fa_spec())
        .arg(&spec_b)
        .assert()
        .success();

    let fa = std::fs::read_to_string(dir.path().join("placr.FA.annotated.tsv")).unwrap();
    let fb = std::fs::read_to_string(dir.path().join("placr.FB.annotated.tsv")).unwrap();
    assert_eq!(fa, fb);
}

#[test]
fn bad_factor_spec_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let unified = run_pipeline(dir.path());

    let mut cmd = Command::cargo_bin("placr").unwrap();
    cmd.arg("classify")
        .arg("--unified")
        .arg(&unified)
        .arg("-o")
        .arg(dir.path())
        .arg("FA,only-two-fields")
        .assert()
        .failure()
        .stderr(predicates::str::contains("factor spec"));
}
