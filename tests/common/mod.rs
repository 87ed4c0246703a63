use anyhow::{anyhow, Result as AnyhowResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::process::Output;

pub fn run_edited(args: &[&str]) -> AnyhowResult<Output> {
    let exe = Path::new(env!("CARGO_BIN_EXE_edited"));
    assert!(exe.exists());

    let output = std::process::Command::new(exe)
        .args(args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?
        .wait_with_output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(anyhow!(
            "failed to run {:?}, {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}

pub fn read_text_file<P: AsRef<Path>>(fp: P) -> String {
    let mut fh = File::open(fp).unwrap();
    let mut buff = String::new();
    fh.read_to_string(&mut buff).unwrap();
    buff
}

pub fn check_against_expected_text_file(output_fp: &str, expected_fp: &str) {
    let test = read_text_file(output_fp);
    // this file was hand-checked for correctness.
    let expected = read_text_file(expected_fp);

    similar_asserts::assert_eq!(test, expected);
}
