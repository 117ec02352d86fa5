//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("gosi")
}

#[test]
fn test_cli_help() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--site"))
        .stdout(predicate::str::contains("--list"));
}

#[test]
fn test_cli_requires_site() {
    cmd().assert().failure().stderr(predicate::str::contains("--site"));
}

#[test]
fn test_cli_rejects_invalid_date() {
    cmd()
        .args([
            "--site",
            "test-city",
            "--base",
            "https://city.example.go.kr",
            "--list",
            "https://city.example.go.kr/list.do?page={page}",
            "--date",
            "31-12-2024",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --date"));
}

#[test]
fn test_cli_rejects_template_without_page() {
    cmd()
        .args([
            "--site",
            "test-city",
            "--base",
            "https://city.example.go.kr",
            "--list",
            "https://city.example.go.kr/list.do",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("site adapter"));
}

#[test]
fn test_cli_rejects_bad_download_call_pattern() {
    cmd()
        .args([
            "--site",
            "test-city",
            "--base",
            "https://city.example.go.kr",
            "--list",
            "https://city.example.go.kr/list.do?page={page}",
            "--download-call",
            "([unclosed",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("download-call"));
}

#[test]
fn test_cli_unreachable_renderer_ends_with_summary() {
    let tmp = TempDir::new().unwrap();

    // Every page fetch fails against the closed port; the error budget ends
    // the run cleanly and the summary is still printed.
    cmd()
        .args([
            "--site",
            "test-city",
            "--base",
            "https://city.example.go.kr",
            "--list",
            "https://city.example.go.kr/list.do?page={page}",
            "--renderer",
            "http://127.0.0.1:9",
            "--error-budget",
            "1",
            "--output",
            tmp.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("Harvest Summary"))
        .stderr(predicate::str::contains("error budget exhausted"));
}
