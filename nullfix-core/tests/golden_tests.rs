//! Golden file tests - apply fixes to a copy of the fixture project and
//! compare against the expected rewritten sources

use nullfix_core::config::DEFAULT_SUFFIX;
use nullfix_core::patch::{apply_change, backup_path, prepare, preview};
use nullfix_core::{restore, scan, ApplyOutcome, ResolvedConfig, RewriteStyle};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

const REWRITTEN: &[&str] = &[
    "src/Model/User.php",
    "src/Service/Mailer.php",
    "vendor/acme/Legacy.php",
];

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn golden_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("golden")
        .join(name)
}

fn read_golden(name: &str) -> String {
    let path = golden_path(name);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read golden file {}: {}", path.display(), e))
}

/// Copy the fixture project into a fresh temporary directory
fn copy_project() -> TempDir {
    let source = fixture_path("project");
    let dir = tempfile::tempdir().unwrap();
    for entry in WalkDir::new(&source).sort_by_file_name() {
        let entry = entry.unwrap();
        let target = dir.path().join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    dir
}

/// Snapshot of every file under `root` keyed by relative path
fn snapshot(root: &Path) -> Vec<(String, Vec<u8>)> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            (rel, fs::read(e.path()).unwrap())
        })
        .collect()
}

fn config(style: RewriteStyle) -> ResolvedConfig {
    let mut config = ResolvedConfig::defaults().unwrap();
    config.style = style;
    config
}

/// Scan and apply every change; returns the number of files written
fn apply_all(root: &Path, config: &ResolvedConfig) -> usize {
    let report = scan(root, config).unwrap();
    let prepared = prepare(&report.plan(), config.style);
    assert!(prepared.failures.is_empty());
    for change in &prepared.changes {
        let outcome = apply_change(change, &config.suffix);
        assert!(
            matches!(outcome, ApplyOutcome::Applied { .. }),
            "apply failed: {:?}",
            outcome
        );
    }
    prepared.changes.len()
}

fn check_golden(style: RewriteStyle) {
    let project = copy_project();
    let config = config(style);
    assert_eq!(apply_all(project.path(), &config), REWRITTEN.len());

    for rel in REWRITTEN {
        let actual = fs::read_to_string(project.path().join(rel)).unwrap();
        let expected = read_golden(&format!("{}/{}", style.as_str(), rel));
        assert_eq!(actual, expected, "golden mismatch for {}", rel);

        let backup = backup_path(&project.path().join(rel), DEFAULT_SUFFIX);
        assert_eq!(
            fs::read_to_string(backup).unwrap(),
            fs::read_to_string(fixture_path(&format!("project/{}", rel))).unwrap()
        );
    }

    // clean.php had nothing to fix and must not be backed up
    assert!(!backup_path(&project.path().join("src/clean.php"), DEFAULT_SUFFIX).exists());
}

#[test]
fn test_golden_mark() {
    check_golden(RewriteStyle::Mark);
}

#[test]
fn test_golden_union() {
    check_golden(RewriteStyle::Union);
}

#[test]
fn test_rescan_after_apply_is_clean() {
    for style in [RewriteStyle::Mark, RewriteStyle::Union] {
        let project = copy_project();
        let config = config(style);
        apply_all(project.path(), &config);

        let report = scan(project.path(), &config).unwrap();
        assert!(
            report.issues.is_empty(),
            "{} style left issues: {:?}",
            style.as_str(),
            report.issues
        );
        let prepared = prepare(&report.plan(), style);
        assert!(prepared.changes.is_empty());
    }
}

#[test]
fn test_apply_then_restore_is_byte_identical() {
    let project = copy_project();
    let before = snapshot(project.path());

    apply_all(project.path(), &config(RewriteStyle::Union));
    assert_ne!(snapshot(project.path()), before);

    let outcomes = restore(project.path(), DEFAULT_SUFFIX).unwrap();
    assert_eq!(outcomes.len(), REWRITTEN.len());
    assert!(outcomes.iter().all(|o| o.is_ok()));
    assert_eq!(snapshot(project.path()), before);
}

#[test]
fn test_reapply_over_existing_backup_then_restore() {
    let project = copy_project();
    let user = project.path().join("src/Model/User.php");
    let original = fs::read_to_string(&user).unwrap();
    let backup = backup_path(&user, DEFAULT_SUFFIX);
    fs::write(&backup, "left over from an earlier run").unwrap();

    apply_all(project.path(), &config(RewriteStyle::Mark));
    assert_eq!(fs::read_to_string(&backup).unwrap(), original);

    restore(project.path(), DEFAULT_SUFFIX).unwrap();
    assert_eq!(fs::read_to_string(&user).unwrap(), original);
    assert!(!backup.exists());
}

#[test]
fn test_dry_run_does_not_touch_files() {
    let project = copy_project();
    let before = snapshot(project.path());

    let config = config(RewriteStyle::Mark);
    let report = scan(project.path(), &config).unwrap();
    let prepared = prepare(&report.plan(), config.style);
    let previews: Vec<String> = prepared.changes.iter().map(preview).collect();

    assert_eq!(previews.len(), REWRITTEN.len());
    assert!(previews[0].contains("-  15:         private Address $address = null,\n"));
    assert!(previews[0].contains("+  15:         private ?Address $address = null,\n"));
    assert!(previews.iter().all(|p| p.ends_with("---- end preview ----\n")));
    assert_eq!(snapshot(project.path()), before);
}

#[test]
fn test_attribute_parameters_never_change() {
    for style in [RewriteStyle::Mark, RewriteStyle::Union] {
        let project = copy_project();
        apply_all(project.path(), &config(style));

        let user = fs::read_to_string(project.path().join("src/Model/User.php")).unwrap();
        assert!(user.contains("#[\\SensitiveParameter] Secret $secret = null"));
        let clean = fs::read_to_string(project.path().join("src/clean.php")).unwrap();
        assert!(clean.contains("#[Attr] Foo $d = null"));
    }
}
