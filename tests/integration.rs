use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn harvest_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("harvest");
    path
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/harvest.sqlite"

[server]
bind = "127.0.0.1:7341"

[sources.saved]
kind = "file"
description = "Saved listing snapshot"
base_url = "https://tools.example.com"
path = "{}"

[sources.saved.selectors]
card = ".card"
name = ".title"
description = ".desc"
link = "a.title"
category = ".category"
tags = ".tag"
pricing = ".price"
favorite_count = ".likes"

[sources.missing]
kind = "file"
base_url = "https://tools.example.com"
path = "{}/nowhere.html"

[sources.missing.selectors]
card = ".card"
name = ".title"
description = ".desc"
link = "a.title"
"#,
        root.display(),
        fixture("listing.html").display(),
        root.display()
    );

    let config_path = config_dir.join("harvest.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_harvest(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = harvest_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run harvest binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// First column of the first data row of `harvest list`.
fn first_listed_id(list_stdout: &str) -> String {
    list_stdout
        .lines()
        .nth(1)
        .and_then(|line| line.split_whitespace().next())
        .expect("list printed no rows")
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_harvest(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/harvest.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_harvest(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_harvest(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_sources() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_harvest(&config_path, &["sources"]);
    assert!(success, "sources failed: {}", stderr);
    assert!(stdout.contains("futuretools"));
    assert!(stdout.contains("saved"));
    assert!(stdout.contains("file"));
    assert!(stdout.contains("browser"));
}

#[test]
fn test_crawl_file_source() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_harvest(&config_path, &["crawl", "saved"]);
    assert!(success, "crawl failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("parsed:   3"), "stdout={}", stdout);
    assert!(stdout.contains("saved:    3"));
    assert!(stdout.contains("updated:  0"));
    assert!(stdout.contains("errors:   0"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_crawl_idempotent_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();

    run_harvest(&config_path, &["crawl", "saved"]);
    let (stdout, stderr, success) = run_harvest(&config_path, &["crawl", "saved"]);
    assert!(success, "second crawl failed: {}", stderr);
    assert!(stdout.contains("saved:    0"), "stdout={}", stdout);
    assert!(stdout.contains("updated:  3"));

    let (stdout, _, _) = run_harvest(&config_path, &["stats"]);
    assert!(stdout.contains("Tools:       3"), "stdout={}", stdout);
}

#[test]
fn test_crawl_normalizes_pricing_and_category() {
    let (_tmp, config_path) = setup_test_env();
    run_harvest(&config_path, &["crawl", "saved"]);

    let (stdout, _, success) = run_harvest(&config_path, &["list", "--pricing", "freemium"]);
    assert!(success);
    assert!(stdout.contains("Beta Video"));
    assert!(stdout.contains("of 1"));

    let (stdout, _, _) = run_harvest(&config_path, &["list", "--category", "Other"]);
    assert!(stdout.contains("Gamma Chat"));
    assert!(stdout.contains("Paid"));
}

#[test]
fn test_crawl_dry_run() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_harvest(&config_path, &["crawl", "saved", "--dry-run"]);
    assert!(success, "dry run failed: {}", stderr);
    assert!(stdout.contains("dry-run"));
    assert!(stdout.contains("tools found: 3"));
    assert!(stdout.contains("1. Alpha Writer (Writing) - Free"));

    let (stdout, _, _) = run_harvest(&config_path, &["list"]);
    assert!(stdout.contains("No tools."), "dry run wrote to the database");
}

#[test]
fn test_crawl_with_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_harvest(&config_path, &["crawl", "saved", "--limit", "2"]);
    assert!(success);
    assert!(stdout.contains("parsed:   2"), "stdout={}", stdout);
    assert!(stdout.contains("saved:    2"));
}

#[test]
fn test_unknown_source() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_harvest(&config_path, &["crawl", "producthunt"]);
    assert!(!success, "unknown source should fail");
    assert!(stderr.contains("Unknown source: 'producthunt'"), "stderr={}", stderr);
    assert!(stderr.contains("futuretools"));
}

#[test]
fn test_crawl_missing_snapshot_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_harvest(&config_path, &["crawl", "missing"]);
    assert!(!success);
    assert!(stderr.contains("Failed to load"), "stderr={}", stderr);
}

#[test]
fn test_demo_twice_updates() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_harvest(&config_path, &["demo"]);
    assert!(success, "demo failed: {}", stderr);
    assert!(stdout.contains("saved:    5"), "stdout={}", stdout);

    let (stdout, _, _) = run_harvest(&config_path, &["demo"]);
    assert!(stdout.contains("saved:    0"));
    assert!(stdout.contains("updated:  5"));
    assert!(stdout.contains("Tools:       5"));
}

#[test]
fn test_demo_dry_run() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_harvest(&config_path, &["demo", "--dry-run"]);
    assert!(success);
    assert!(stdout.contains("tools found: 5"));
    assert!(stdout.contains("ChatGPT"));

    let (stdout, _, _) = run_harvest(&config_path, &["stats"]);
    assert!(stdout.contains("Tools:       0"));
}

#[test]
fn test_list_and_get() {
    let (_tmp, config_path) = setup_test_env();
    run_harvest(&config_path, &["demo"]);

    let (stdout, _, success) = run_harvest(&config_path, &["list", "--tag", "marketing"]);
    assert!(success);
    assert!(stdout.contains("Copy.ai"));
    assert!(stdout.contains("of 1"));

    let id = first_listed_id(&stdout);
    let (stdout, stderr, success) = run_harvest(&config_path, &["get", &id]);
    assert!(success, "get failed: {}", stderr);
    assert!(stdout.contains("Copy.ai"));
    assert!(stdout.contains("https://copy.ai"));
    assert!(stdout.contains("Writing"));
}

#[test]
fn test_list_rejects_bad_limit() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_harvest(&config_path, &["list", "--limit", "500"]);
    assert!(!success);
    assert!(stderr.contains("limit"));
}

#[test]
fn test_get_missing_tool() {
    let (_tmp, config_path) = setup_test_env();
    run_harvest(&config_path, &["init"]);

    let (_, stderr, success) = run_harvest(&config_path, &["get", "nonexistent-id"]);
    assert!(!success, "missing tool should fail");
    assert!(stderr.contains("not found"));
}

#[test]
fn test_clear_requires_confirmation() {
    let (_tmp, config_path) = setup_test_env();
    run_harvest(&config_path, &["demo"]);

    let (stdout, _, success) = run_harvest(&config_path, &["clear"]);
    assert!(success);
    assert!(stdout.contains("--yes"));
    let (stdout, _, _) = run_harvest(&config_path, &["stats"]);
    assert!(stdout.contains("Tools:       5"));

    let (stdout, _, success) = run_harvest(&config_path, &["clear", "--yes"]);
    assert!(success);
    assert!(stdout.contains("Deleted 5 tools and 4 categories."));
    let (stdout, _, _) = run_harvest(&config_path, &["stats"]);
    assert!(stdout.contains("Tools:       0"));
}

#[test]
fn test_invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[db]\npath = \"x.sqlite\"\n\n[browser]\nnavigation_timeout_secs = 0\n",
    )
    .unwrap();

    let (_, stderr, success) = run_harvest(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("navigation_timeout_secs"));
}
