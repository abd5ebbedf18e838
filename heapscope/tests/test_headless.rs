use std::path::Path;
use std::process::{Command, Output};

use heapscope::domain::IdSize;
use heapscope::graph::HeapValue;
use heapscope::hprof::HprofWriter;
use heapscope_common::BasicType;
use tempfile::TempDir;

fn write_dump(dir: &TempDir) -> std::path::PathBuf {
    let mut writer = HprofWriter::new(IdSize::Eight);
    let object = writer.class("java.lang.Object", None, &[]);
    let string = writer.string_class(object);
    let leak = writer.class(
        "com.example.Leak",
        Some(object),
        &[("name", BasicType::Object), ("next", BasicType::Object)],
    );
    let foo = writer.java_string(string, "foo");
    writer.instance(leak, &[HeapValue::Reference(Some(foo)), HeapValue::Reference(None)]);

    let path = dir.path().join("leak.hprof");
    writer.write_to(&path).unwrap();
    path
}

fn heapscope(dump: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_heapscope"))
        .arg(dump)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to run heapscope")
}

#[test]
fn test_search_and_select_prints_each_listing() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir);

    let output = heapscope(&dump, &["--quiet", "--search", "Leak", "--select", "0", "--select", "0"]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("1 class matching [Leak]\n  [0] com.example.Leak\n"));
    assert!(stdout.contains("1 instance of class com.example.Leak"));
    assert!(stdout.contains("  [0] com.example.Leak.name=\"foo\""));
    assert!(stdout.contains("  [1] com.example.Leak.next=null"));
}

#[test]
fn test_json_lines() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir);

    let output = heapscope(&dump, &["--search", "", "--select", "1", "--json"]);
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let views: Vec<serde_json::Value> =
        stdout.lines().map(|line| serde_json::from_str(line).expect("Invalid JSON")).collect();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0]["title"], "2 classes matching []");
    assert_eq!(views[0]["rows"][0], "java.lang.String");
    assert_eq!(views[1]["depth"], 2);
    assert_eq!(views[1]["title"], "1 instance of class com.example.Leak");
}

#[test]
fn test_unselectable_row_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let dump = write_dump(&dir);

    // row 1 of the field list is a null reference
    let output =
        heapscope(&dump, &["-q", "-s", "Leak", "--select", "0", "--select", "0", "--select", "1"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Cannot select row 1"), "stderr: {stderr}");
}

#[test]
fn test_unreadable_dump_fails() {
    let dir = TempDir::new().unwrap();
    let garbage = dir.path().join("garbage.hprof");
    std::fs::write(&garbage, b"not a heap dump at all").unwrap();

    let output = heapscope(&garbage, &["--search", "Leak"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open heap dump"));
}
