//! Integration tests for scanning a project tree

use nullfix_core::config::NullfixConfig;
use nullfix_core::{render_text, scan, Issue, ResolvedConfig};
use std::fs;
use std::path::{Path, PathBuf};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap()
        .to_string_lossy()
        .replace('\\', "/")
}

fn coordinates(root: &Path, issues: &[Issue]) -> Vec<(String, usize, usize, usize, u32)> {
    issues
        .iter()
        .map(|i| {
            (
                relative(root, &i.file),
                i.function_index,
                i.param_index,
                i.type_start,
                i.line,
            )
        })
        .collect()
}

fn excluding_vendor() -> ResolvedConfig {
    NullfixConfig {
        exclude: vec!["vendor".to_string()],
        ..Default::default()
    }
    .resolve()
    .unwrap()
}

#[test]
fn test_scan_project_finds_expected_candidates() {
    let root = fixture_path("project");
    let report = scan(&root, &excluding_vendor()).unwrap();

    assert_eq!(report.files_scanned, 3, "User.php, Mailer.php and clean.php");
    assert!(report.skipped.is_empty());
    assert_eq!(
        coordinates(&root, &report.issues),
        vec![
            ("src/Model/User.php".to_string(), 0, 2, 2, 15),
            ("src/Model/User.php".to_string(), 1, 0, 0, 19),
            ("src/Model/User.php".to_string(), 2, 2, 0, 24),
            ("src/Service/Mailer.php".to_string(), 0, 0, 0, 7),
            ("src/Service/Mailer.php".to_string(), 1, 0, 0, 9),
            ("src/Service/Mailer.php".to_string(), 2, 0, 0, 12),
            ("src/Service/Mailer.php".to_string(), 3, 0, 0, 17),
            ("src/Service/Mailer.php".to_string(), 3, 2, 0, 17),
        ]
    );

    let types: Vec<&str> = report.issues.iter().map(|i| i.type_name.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "Address",
            "string",
            "\\DateTimeInterface",
            "Message",
            "Envelope",
            "array",
            "int",
            "Logger"
        ]
    );
}

#[test]
fn test_scan_without_excludes_includes_vendor_but_not_node_modules() {
    let root = fixture_path("project");
    let report = scan(&root, &ResolvedConfig::defaults().unwrap()).unwrap();

    let files: Vec<String> = report
        .issues
        .iter()
        .map(|i| relative(&root, &i.file))
        .collect();
    assert!(files.contains(&"vendor/acme/Legacy.php".to_string()));
    assert!(!files.iter().any(|f| f.contains("node_modules")));
    assert_eq!(report.issues.len(), 9);
}

#[test]
fn test_clean_file_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    fs::copy(
        fixture_path("project/src/clean.php"),
        dir.path().join("clean.php"),
    )
    .unwrap();

    let report = scan(dir.path(), &ResolvedConfig::defaults().unwrap()).unwrap();
    assert_eq!(report.files_scanned, 1);
    assert!(report.issues.is_empty());
    assert_eq!(
        render_text(&report.issues),
        "No implicit-nullable typed parameters found.\n"
    );
}

#[test]
fn test_empty_directory_reports_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let report = scan(dir.path(), &ResolvedConfig::defaults().unwrap()).unwrap();
    assert_eq!(report.files_scanned, 0);
    assert!(report.issues.is_empty());
}

#[test]
fn test_invalid_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    assert!(scan(&missing, &ResolvedConfig::defaults().unwrap()).is_err());

    let file = fixture_path("project/src/clean.php");
    assert!(scan(&file, &ResolvedConfig::defaults().unwrap()).is_err());
}

#[test]
fn test_non_utf8_file_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("bad.php"), [0x3c, 0x3f, 0xff, 0xfe]).unwrap();
    fs::write(
        dir.path().join("good.php"),
        "<?php function f(Foo $a = null) {}",
    )
    .unwrap();

    let report = scan(dir.path(), &ResolvedConfig::defaults().unwrap()).unwrap();
    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].path, dir.path().join("bad.php"));
    assert_eq!(report.issues.len(), 1);
}

#[test]
fn test_scan_is_deterministic() {
    let root = fixture_path("project");
    let config = excluding_vendor();
    let first = scan(&root, &config).unwrap();
    let second = scan(&root, &config).unwrap();
    assert_eq!(first.issues, second.issues);
    assert_eq!(render_text(&first.issues), render_text(&second.issues));
}

#[test]
fn test_extension_filter() {
    let root = fixture_path("project");
    let config = NullfixConfig {
        extensions: vec!["txt".to_string()],
        ..Default::default()
    }
    .resolve()
    .unwrap();

    // notes.txt has no open tag, so nothing in it is code
    let report = scan(&root, &config).unwrap();
    assert_eq!(report.files_scanned, 1);
    assert!(report.issues.is_empty());
}
