use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

const ITEMS: &str = r#"<list><i n="10"/><i n="2"/><i n="1"/></list>"#;

fn xsort() -> Result<Command, Box<dyn std::error::Error>> {
    Ok(Command::cargo_bin("xsort")?)
}

#[test]
fn test_writes_default_output_next_to_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("items.xml");
    fs::write(&input, ITEMS)?;

    xsort()?
        .arg(&input)
        .arg(".")
        .arg("n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Output sorted file as"));

    let sorted = fs::read_to_string(dir.path().join("items_sorted.xml"))?;
    assert_eq!(sorted, r#"<list><i n="1"/><i n="10"/><i n="2"/></list>"#);
    assert_eq!(fs::read_to_string(&input)?, ITEMS);
    Ok(())
}

#[test]
fn test_decimal_descending_to_explicit_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("items.xml");
    let output = dir.path().join("out.xml");
    fs::write(&input, ITEMS)?;

    xsort()?
        .arg(&input)
        .args([".", "n", "--decimal", "--descending", "-o"])
        .arg(&output)
        .assert()
        .success();

    let sorted = fs::read_to_string(&output)?;
    assert_eq!(sorted, r#"<list><i n="10"/><i n="2"/><i n="1"/></list>"#);
    Ok(())
}

#[test]
fn test_text_keys_with_bom_input() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("events.xml");
    let mut bytes = b"\xEF\xBB\xBF".to_vec();
    bytes.extend_from_slice(
        b"<events><e><when>2021-01-01</when></e><e><when>03/15/2020</when></e></events>",
    );
    fs::write(&input, bytes)?;

    xsort()?
        .arg(&input)
        .args([".", "when", "--text", "--as-datetime"])
        .assert()
        .success();

    let sorted = fs::read_to_string(dir.path().join("events_sorted.xml"))?;
    assert_eq!(
        sorted,
        "<events><e><when>03/15/2020</when></e><e><when>2021-01-01</when></e></events>"
    );
    Ok(())
}

#[test]
fn test_conversion_failure_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("bad.xml");
    fs::write(&input, r#"<list><i n="1"/><i n="one"/></list>"#)?;

    xsort()?
        .arg(&input)
        .args([".", "n", "--decimal"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("one"));

    assert!(!dir.path().join("bad_sorted.xml").exists());
    Ok(())
}

#[test]
fn test_malformed_xml_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("broken.xml");
    fs::write(&input, "<list><i></list>")?;

    xsort()?
        .arg(&input)
        .args([".", "n"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("mismatched tag"));
    Ok(())
}

#[test]
fn test_missing_input_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    xsort()?
        .arg(dir.path().join("nope.xml"))
        .args([".", "n"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read input file"));
    Ok(())
}

#[test]
fn test_datetime_and_decimal_are_exclusive() -> Result<(), Box<dyn std::error::Error>> {
    xsort()?
        .args(["in.xml", ".", "n", "--datetime", "--decimal"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
    Ok(())
}

#[test]
fn test_verbose_lists_namespace_bindings() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("ns.xml");
    fs::write(
        &input,
        r#"<r xmlns:p="urn:p"><p:list><i k="2"/><i k="1"/></p:list></r>"#,
    )?;

    xsort()?
        .env_remove("RUST_LOG")
        .arg(&input)
        .args(["./p:list", "k", "-v"])
        .assert()
        .success()
        .stderr(predicate::str::contains("urn:p"));

    let sorted = fs::read_to_string(dir.path().join("ns_sorted.xml"))?;
    assert_eq!(
        sorted,
        r#"<r xmlns:p="urn:p"><p:list><i k="1"/><i k="2"/></p:list></r>"#
    );
    Ok(())
}
