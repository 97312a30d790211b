use assert_cmd::Command;

#[test]
fn command_convert() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cnpa")?;
    let output = cmd.arg("convert").arg("tests/cnp/cgh_calls.csv").output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 9);
    assert!(stdout.starts_with("ID\tchrom\tloc.start\tloc.end\tnum.mark\tseg.mean\tstate\tfill\n"));

    // three N bins of T1 collapse into one chr01 segment
    assert!(stdout.contains("T1\tchr01\t1\t200001\t\t\tN\t\n"));
    assert!(stdout.contains("T1\tchr01\t300001\t300001\t\t\tL\t\n"));

    // the missing chr02 bin extends the upstream A segment
    assert!(stdout.contains("T1\tchr02\t1\t200001\t\t\tA\tmodified\n"));
    assert!(stdout.contains("T1\tchr02\t300001\t300001\t\t\tD\t\n"));

    // T2 starts N, then three G bins
    assert!(stdout.contains("T2\tchr01\t1\t1\t\t\tN\t\n"));
    assert!(stdout.contains("T2\tchr01\t100001\t300001\t\t\tG\t\n"));

    Ok(())
}

#[test]
fn command_convert_no_resolve() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("cnpa")?;
    let output = cmd
        .arg("convert")
        .arg("tests/cnp/cgh_calls.csv")
        .arg("--no-resolve")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout.lines().count(), 9);

    // the gap before the last chr02 bin stays open
    assert!(stdout.contains("T1\tchr02\t1\t100001\t\t\tA\t\n"));
    assert!(!stdout.contains("modified"));

    Ok(())
}

#[test]
fn command_convert_drops_off_order() -> anyhow::Result<()> {
    // CGHcall codes the sex chromosomes as 23 and 24
    let temp = tempfile::TempDir::new()?;
    let input = temp.path().join("calls.csv");
    std::fs::write(
        &input,
        ",T1,T2\n\
         1:1-100000,0,0\n\
         1:100001-200000,0,0\n\
         23:1-100000,1,1\n",
    )?;

    let mut cmd = Command::cargo_bin("cnpa")?;
    let output = cmd.arg("convert").arg(&input).output()?;
    assert!(output.status.success());

    // one chr23 row per sample
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Warning: dropped 2 rows"));
    let stdout = String::from_utf8(output.stdout)?;
    assert!(!stdout.contains("chr23"));
    assert!(stdout.contains("T1\tchr01\t1\t100001\t\t\tN\t\n"));

    // same drop when gap filling is off
    let mut cmd = Command::cargo_bin("cnpa")?;
    let output = cmd
        .arg("convert")
        .arg(&input)
        .arg("--no-resolve")
        .output()?;
    assert!(output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("dropped 2 rows"));
    assert!(!String::from_utf8(output.stdout)?.contains("chr23"));

    Ok(())
}

#[test]
fn command_convert_roundtrip_align() -> anyhow::Result<()> {
    // converted tables feed the aligner in whole-chromosome mode
    let temp = tempfile::TempDir::new()?;
    let segments = temp.path().join("segments.tsv");
    let outdir = temp.path().join("results");

    let mut cmd = Command::cargo_bin("cnpa")?;
    cmd.arg("convert")
        .arg("tests/cnp/cgh_calls.csv")
        .arg("-o")
        .arg(&segments)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("cnpa")?;
    cmd.arg("align")
        .arg(&segments)
        .arg("--matrix")
        .arg("tests/cnp/matrix.json")
        .arg("--whole")
        .arg("--outdir")
        .arg(&outdir)
        .assert()
        .success();

    let json = std::fs::read_to_string(outdir.join("T1_T2_alignment.json"))?;
    let records: serde_json::Value = serde_json::from_str(&json)?;

    // four bins per chromosome after filling
    assert_eq!(records["chr01"]["seq1"], "NNNL");
    assert_eq!(records["chr01"]["seq2"], "NGGG");
    assert_eq!(records["chr02"]["seq1"], "AAAD");
    assert_eq!(records["chr02"]["seq2"], "NNNN");

    Ok(())
}
