use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn tix_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tix");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let topics_dir = root.join("topics");
    fs::create_dir_all(topics_dir.join("storage")).unwrap();
    fs::write(
        topics_dir.join("mutex-vs-semaphore.json"),
        r#"{
  "id": "mutex-vs-semaphore",
  "title": "Mutex vs Semaphore",
  "summary": "Two synchronization primitives with different ownership rules.",
  "codeExamples": [
    { "title": "Guarding a counter", "language": "go", "code": "mu.Lock()" }
  ],
  "category": "concurrency",
  "tags": ["concurrency"]
}"#,
    )
    .unwrap();
    fs::write(
        topics_dir.join("storage/indexes.json"),
        r#"[
  {
    "id": "hash-index",
    "title": "Hash Index",
    "summary": "Point lookups backed by a hash table.",
    "category": "storage",
    "tags": ["storage"]
  },
  {
    "id": "b-trees",
    "title": "B-Trees",
    "summary": "Balanced trees for range scans on disk.",
    "codeExamples": [
      { "title": "Node layout", "language": "rust", "code": "struct Node;" }
    ],
    "category": "storage",
    "tags": ["storage", "trees"]
  }
]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[source]
root = "{}/topics"
include_globs = ["**/*.json"]
exclude_globs = []
follow_symlinks = false

[query]
default_page_size = 10
max_page_size = 50

[logging]
filter = "warn"
"#,
        root.display()
    );

    let config_path = config_dir.join("tix.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_tix(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = tix_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run tix binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn search_json(config_path: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["search"];
    full.extend_from_slice(args);
    full.push("--json");
    let (stdout, stderr, success) = run_tix(config_path, &full);
    assert!(success, "search failed: stdout={}, stderr={}", stdout, stderr);
    serde_json::from_str(&stdout).unwrap()
}

fn hit_ids(page: &serde_json::Value) -> Vec<String> {
    page["hits"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn test_check_valid_corpus() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_tix(&config_path, &["check"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("3 records: 3 valid, 0 invalid"), "got: {}", stdout);
}

#[test]
fn test_check_reports_violations() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("topics/broken.json"),
        r#"{ "id": "Broken_Id", "title": "Broken" }"#,
    )
    .unwrap();

    let (stdout, _, success) = run_tix(&config_path, &["check"]);
    assert!(!success, "check should fail on an invalid record");
    assert!(stdout.contains("INVALID broken.json"), "got: {}", stdout);
    assert!(stdout.contains("[id_pattern] id:"), "got: {}", stdout);
}

#[test]
fn test_search_by_title() {
    let (_tmp, config_path) = setup_test_env();

    let page = search_json(&config_path, &["mutex"]);
    assert_eq!(hit_ids(&page), vec!["mutex-vs-semaphore"]);
    assert_eq!(page["total"], 1);
}

#[test]
fn test_search_facet_only() {
    let (_tmp, config_path) = setup_test_env();

    let page = search_json(&config_path, &["", "--facet", "tags=storage"]);
    assert_eq!(hit_ids(&page), vec!["b-trees", "hash-index"]);

    let page = search_json(&config_path, &["", "--facet", "language=go"]);
    assert_eq!(hit_ids(&page), vec!["mutex-vs-semaphore"]);

    let page = search_json(
        &config_path,
        &["", "--facet", "language=go", "--facet", "language=rust"],
    );
    assert_eq!(page["total"], 2);
}

#[test]
fn test_search_pagination_and_counts() {
    let (_tmp, config_path) = setup_test_env();

    let first = search_json(&config_path, &["", "--page-size", "2", "--counts", "category"]);
    let second = search_json(&config_path, &["", "--page-size", "2", "--page", "1"]);
    assert_eq!(first["total"], 3);
    assert_eq!(hit_ids(&first), vec!["b-trees", "hash-index"]);
    assert_eq!(hit_ids(&second), vec!["mutex-vs-semaphore"]);

    let counts = first["facet_counts"]["category"].as_array().unwrap();
    assert_eq!(counts[0]["value"], "storage");
    assert_eq!(counts[0]["count"], 2);
}

#[test]
fn test_search_invalid_pagination() {
    let (_tmp, config_path) = setup_test_env();

    for args in [
        vec!["search", "mutex", "--page", "-1"],
        vec!["search", "mutex", "--page-size", "0"],
        vec!["search", "mutex", "--page-size", "51"],
    ] {
        let (_, stderr, success) = run_tix(&config_path, &args);
        assert!(!success, "{:?} should fail", args);
        assert!(stderr.contains("invalid query"), "got: {}", stderr);
    }
}

#[test]
fn test_search_human_output() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_tix(&config_path, &["search", "hash", "--explain"]);
    assert!(success);
    assert!(stdout.contains("Hash Index"));
    assert!(stdout.contains("id: hash-index"));
    assert!(stdout.contains("matched: 1/1 terms in title"));
}

#[test]
fn test_get_topic() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_tix(&config_path, &["get", "b-trees", "--json"]);
    assert!(success);
    let topic: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(topic["title"], "B-Trees");
    assert_eq!(topic["tags"], serde_json::json!(["storage", "trees"]));
}

#[test]
fn test_get_missing_topic() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_tix(&config_path, &["get", "nope"]);
    assert!(!success);
    assert!(stderr.contains("not found"), "got: {}", stderr);
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_tix(&config_path, &["stats", "--json"]);
    assert!(success);
    let stats: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(stats["topics"], 3);
    assert_eq!(stats["generation"], 1);
    assert_eq!(stats["fingerprint"].as_str().unwrap().len(), 64);
}

#[test]
fn test_stats_deterministic_fingerprint() {
    let (_tmp, config_path) = setup_test_env();

    let (a, _, _) = run_tix(&config_path, &["stats", "--json"]);
    let (b, _, _) = run_tix(&config_path, &["stats", "--json"]);
    let a: serde_json::Value = serde_json::from_str(&a).unwrap();
    let b: serde_json::Value = serde_json::from_str(&b).unwrap();
    assert_eq!(a["fingerprint"], b["fingerprint"]);
}

#[test]
fn test_invalid_record_blocks_search() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("topics/bad-url.json"),
        r#"{ "id": "bad-url", "title": "Bad", "resources": [{ "title": "x", "url": "::nope" }] }"#,
    )
    .unwrap();

    let (_, stderr, success) = run_tix(&config_path, &["search", "mutex"]);
    assert!(!success);
    assert!(stderr.contains("bad-url.json"), "got: {}", stderr);
    assert!(stderr.contains("failed validation"), "got: {}", stderr);
}

#[test]
fn test_missing_config() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_tix(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
