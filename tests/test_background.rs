use common::{check_against_expected_text_file, read_text_file, run_edited};

mod common;

#[test]
fn test_background_help() {
    let _out = run_edited(&["background", "--help"]).unwrap();
}

#[test]
fn test_background_table() {
    let temp_file = std::env::temp_dir().join("test_background_table.tsv");
    let args = [
        "background",
        "--test",
        "tests/resources/rep1.pileup",
        "--suppress-progress",
        "-o",
        temp_file.to_str().unwrap(),
    ];
    run_edited(&args).unwrap();
    check_against_expected_text_file(
        temp_file.to_str().unwrap(),
        "tests/resources/expected_background.tsv",
    );
}

#[test]
fn test_background_uses_shared_positions_only() {
    let dir = tempfile::tempdir().unwrap();
    let out_fp = dir.path().join("shared.tsv");
    run_edited(&[
        "background",
        "--test",
        "tests/resources/rep1.pileup",
        "tests/resources/rep2.pileup",
        "--suppress-progress",
        "-o",
        out_fp.to_str().unwrap(),
    ])
    .unwrap();
    let text = read_text_file(out_fp);
    let rows = text.lines().skip(1).collect::<Vec<&str>>();
    assert_eq!(rows.len(), 4);
    // only chr3 is in both files, 19 clean positions plus the edited one,
    // each seen twice
    let a_row = rows[0].split('\t').collect::<Vec<&str>>();
    assert_eq!(a_row[0], "A");
    assert_eq!(a_row[5], (19 * 20 * 2 + 40).to_string());
    assert!(rows[1].starts_with("C\t.\t"));
}

#[test]
fn test_background_sample_cap() {
    let dir = tempfile::tempdir().unwrap();
    let out_fp = dir.path().join("capped.tsv");
    run_edited(&[
        "background",
        "--test",
        "tests/resources/rep1.pileup",
        "--background-sample",
        "10",
        "--quiet",
        "-o",
        out_fp.to_str().unwrap(),
    ])
    .unwrap();
    let text = read_text_file(out_fp);
    let a_row = text.lines().nth(1).unwrap().split('\t').collect::<Vec<&str>>();
    assert_eq!(a_row[1], "0.999950");
    assert_eq!(a_row[5], "200");
    assert!(run_edited(&[
        "background",
        "--test",
        "tests/resources/rep1.pileup",
        "--background-sample",
        "0",
    ])
    .is_err());
}
