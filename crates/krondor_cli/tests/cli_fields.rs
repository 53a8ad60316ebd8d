use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use krondor_core::fixture::{self, ModelSpec, SaveBuilder};
use serde_json::Value;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_krondor-se"))
        .args(args)
        .output()
        .expect("failed to run krondor-se CLI")
}

fn temp_output_path(prefix: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}.{ext}", std::process::id(), nanos))
}

/// Write a synthetic save and its layout file, returning both paths.
fn write_save(prefix: &str, builder: SaveBuilder) -> (String, String) {
    let fixture = builder.build();
    let save_path = temp_output_path(prefix, "gam");
    let layout_path = temp_output_path(prefix, "toml");
    fs::write(&save_path, &fixture.bytes).expect("save should be writable");
    let layout = toml::to_string(&fixture.layout).expect("layout should serialize");
    fs::write(&layout_path, layout).expect("layout should be writable");
    (
        save_path.to_string_lossy().to_string(),
        layout_path.to_string_lossy().to_string(),
    )
}

#[test]
fn cli_prints_single_name_field() {
    let (save, layout) = write_save("krondor_se_name", SaveBuilder::new());
    let output = run_cli(&["--layout", &layout, "--name", &save]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "name=Fixture Save");
}

#[test]
fn cli_prints_multiple_requested_fields_in_fixed_order() {
    let (save, layout) = write_save("krondor_se_fields", SaveBuilder::new().chapter(3));
    let output = run_cli(&[
        "--layout", &layout, "--gold", "--party", "--chapter", &save,
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["chapter=3", "gold=123s 4r", "party=Locklear,Gorath,Owyn"]
    );
}

#[test]
fn cli_json_fields_are_a_single_object() {
    let (save, layout) = write_save("krondor_se_json", SaveBuilder::new());
    let output = run_cli(&[
        "--layout",
        &layout,
        "--json",
        "--containers",
        "--zone",
        "5",
        &save,
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    let zones = json["containers"].as_array().expect("containers array");
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0]["zone"], 5);
    assert_eq!(zones[0]["containers"][0]["type"], "Bag");
}

#[test]
fn cli_without_field_flags_prints_the_party_sheet() {
    let (save, layout) = write_save("krondor_se_sheet", SaveBuilder::new());
    let output = run_cli(&["--layout", &layout, &save]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Save: Fixture Save"));
    assert!(stdout.contains(" ::: Locklear :::"));
    assert!(stdout.contains(" ::: Keys :::"));
    assert!(!stdout.contains("containers :::"));
}

#[test]
fn cli_full_json_has_every_section() {
    let (save, layout) = write_save("krondor_se_full_json", SaveBuilder::new());
    let output = run_cli(&["--layout", &layout, "--json", &save]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: Value = serde_json::from_str(&stdout).expect("stdout should be valid JSON");
    assert_eq!(json["name"], "Fixture Save");
    assert_eq!(json["containers"].as_array().map(Vec::len), Some(12));
    assert_eq!(json["shops"][0]["hotspot"], "12B");
}

#[test]
fn cli_reports_decode_failure_with_exit_code_one() {
    let (save, layout) = write_save(
        "krondor_se_bad_zone",
        SaveBuilder::new().location(13, (0, 0)),
    );
    let output = run_cli(&["--layout", &layout, "--name", &save]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error parsing save file"));
    assert!(stderr.contains("zone 13 is not supported"));
}

#[test]
fn cli_rejects_zone_outside_the_world() {
    let (save, layout) = write_save("krondor_se_zone_arg", SaveBuilder::new());
    let output = run_cli(&["--layout", &layout, "--zone", "13", &save]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_missing_file_exits_with_one() {
    let missing = temp_output_path("krondor_se_missing", "gam");
    let missing = missing.to_string_lossy().to_string();
    let output = run_cli(&["--name", &missing]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn cli_lists_models_of_a_table() {
    let path = temp_output_path("krondor_se_tbl", "tbl");
    let bytes = fixture::model_table_bytes(&[
        ModelSpec::pooled("tree"),
        ModelSpec::sprite("bush", 4),
    ]);
    fs::write(&path, bytes).expect("table should be writable");
    let path = path.to_string_lossy().to_string();

    let output = run_cli(&["--tbl", &path]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("tree"));
    assert!(lines[1].contains("sprite=4"));

    let output = run_cli(&["--tbl", "--json", &path]);
    assert!(output.status.success());
    let json: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(json[1]["name"], "bush");
}

#[test]
fn cli_tbl_without_dat_section_fails() {
    let path = temp_output_path("krondor_se_bad_tbl", "tbl");
    fs::write(&path, fixture::tagged_chunk(b"MAP:", &[0, 0, 0, 0, 0, 0]))
        .expect("table should be writable");
    let path = path.to_string_lossy().to_string();

    let output = run_cli(&["--tbl", &path]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("missing section DAT:"));
}
