use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use krondor_core::fixture::SaveBuilder;
use krondor_core::{GameData, ObjectCatalog, SaveLayout};
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

struct WrittenSave {
    save: String,
    layout_file: String,
    layout: SaveLayout,
    bytes: Vec<u8>,
}

fn write_save(prefix: &str, builder: SaveBuilder) -> WrittenSave {
    let fixture = builder.build();
    let save_path = temp_output_path(prefix, "gam");
    let layout_path = temp_output_path(prefix, "toml");
    fs::write(&save_path, &fixture.bytes).expect("save should be writable");
    let text = toml::to_string(&fixture.layout).expect("layout should serialize");
    fs::write(&layout_path, text).expect("layout should be writable");
    WrittenSave {
        save: save_path.to_string_lossy().to_string(),
        layout_file: layout_path.to_string_lossy().to_string(),
        layout: fixture.layout,
        bytes: fixture.bytes,
    }
}

#[test]
fn cli_reads_flags_in_decimal_and_hex() {
    let written = write_save(
        "krondor_se_flag_read",
        SaveBuilder::new().flag(0x20, true).flag(0xdac5, true),
    );
    let output = run_cli(&[
        "--layout",
        &written.layout_file,
        "--flag",
        "32",
        "--flag",
        "0xdac5",
        "--flag",
        "0x21",
        &written.save,
    ]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(
        lines,
        vec!["flag[0x20]=1", "flag[0xdac5]=1", "flag[0x21]=0"]
    );
}

#[test]
fn cli_flags_join_json_output() {
    let written = write_save("krondor_se_flag_json", SaveBuilder::new().flag(0x30, true));
    let output = run_cli(&[
        "--layout",
        &written.layout_file,
        "--json",
        "--name",
        "--flag",
        "0x30",
        &written.save,
    ]);
    assert!(output.status.success());

    let json: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON");
    assert_eq!(json["name"], "Fixture Save");
    assert_eq!(json["flags"]["0x30"], 1);
}

#[test]
fn cli_set_and_clear_flags_write_edited_save() {
    let written = write_save("krondor_se_flag_edit", SaveBuilder::new().flag(0x40, true));
    let out_path = temp_output_path("krondor_se_flag_edit_out", "gam");
    let out = out_path.to_string_lossy().to_string();

    let output = run_cli(&[
        "--layout",
        &written.layout_file,
        "--set-flag",
        "0x41",
        "--set-flag",
        "0xdac0",
        "--clear-flag",
        "0x40",
        "--output",
        &out,
        &written.save,
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Wrote edited save to"));

    let edited = fs::read(&out_path).expect("edited save should exist");
    assert_eq!(edited.len(), written.bytes.len());
    let game = GameData::from_bytes(edited, written.layout, &ObjectCatalog::anonymous())
        .expect("edited save should load");
    assert!(game.read_event_bool(0x41).expect("flag"));
    assert!(game.read_event_bool(0xdac0).expect("flag"));
    assert!(!game.read_event_bool(0x40).expect("flag"));
    assert_eq!(game.name(), "Fixture Save");
}

#[test]
fn cli_edits_require_output() {
    let written = write_save("krondor_se_edit_no_output", SaveBuilder::new());
    let output = run_cli(&[
        "--layout",
        &written.layout_file,
        "--set-flag",
        "0x41",
        &written.save,
    ]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("require --output"));
}

#[test]
fn cli_output_requires_an_edit() {
    let written = write_save("krondor_se_output_no_edit", SaveBuilder::new());
    let out = temp_output_path("krondor_se_output_no_edit_out", "gam");
    let out = out.to_string_lossy().to_string();
    let output = run_cli(&[
        "--layout",
        &written.layout_file,
        "--output",
        &out,
        &written.save,
    ]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn cli_rejects_malformed_event_pointer() {
    let written = write_save("krondor_se_bad_ptr", SaveBuilder::new());
    let output = run_cli(&[
        "--layout",
        &written.layout_file,
        "--flag",
        "0x1ffff",
        &written.save,
    ]);
    assert_eq!(output.status.code(), Some(2));
}
