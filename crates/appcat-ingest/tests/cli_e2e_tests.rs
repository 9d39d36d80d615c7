//! End-to-end tests for the appcat-ingest binary
//!
//! These tests validate:
//! - Import and guess workflows against a mock catalog
//! - Dry-run output
//! - Checkpoint resumption
//! - SQL generation
//! - Fatal error reporting and exit codes
//! - Interrupt handling while input is still being read

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use std::fs;
use tempfile::TempDir;
use wiremock::{
    matchers::{body_partial_json, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

/// Binary invocation isolated from the caller's environment and `.env`
fn appcat(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("appcat-ingest").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("APPCAT_API_URL")
        .env_remove("APPCAT_LOOKUP_RESOURCE")
        .env_remove("APPCAT_DEFAULT_USER")
        .env_remove("APPCAT_CONCURRENCY")
        .env_remove("APPCAT_MIN_INTERVAL_MS")
        .env_remove("APPCAT_MAX_RETRIES")
        .env("APPCAT_RETRY_BASE_MS", "10")
        .env_remove("LOG_OUTPUT")
        .arg("--quiet");
    cmd
}

#[tokio::test]
async fn test_import_lines_submits_each_identifier() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_partial_json(json!({"comment": {"user": "importer"}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("links.txt"),
        "https://appgallery.huawei.com/app/detail?id=com.example.one\n\n\"com.example.two\"\nnot an id\n",
    )
    .unwrap();

    appcat(&dir)
        .args(["import-lines", "links.txt", "--user", "importer", "--api-url"])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("Run completed"))
        .stdout(predicate::str::contains("Submitted:  2"))
        .stdout(predicate::str::contains("Skipped:    1"));
}

#[tokio::test]
async fn test_import_lines_reads_stdin() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_partial_json(json!({"pkg_name": "com.piped"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    appcat(&dir)
        .args(["import-lines", "--api-url"])
        .arg(server.uri())
        .write_stdin("com.piped\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Submitted:  1"));
}

#[tokio::test]
async fn test_import_csv_dry_run_prints_records() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("apps.csv"),
        "名称,访问链接,上架时间,备注\n\
         游戏,https://appgallery.huawei.com/app/detail?id=com.example.game,2025/03/10,群友 张三 提供\n",
    )
    .unwrap();

    appcat(&dir)
        .args(["import-csv", "apps.csv", "--dry-run", "--api-url"])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("would submit"))
        .stdout(predicate::str::contains(r#""pkg_name":"com.example.game""#))
        .stdout(predicate::str::contains(r#""listed_at":"2025-03-10 12:00:00+0800""#))
        .stdout(predicate::str::contains(r#""user":"群友 张三""#));
}

#[test]
fn test_import_csv_missing_link_column_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("apps.csv"), "name,link\nfoo,https://x/?id=com.foo\n").unwrap();

    appcat(&dir)
        .args(["import-csv", "apps.csv", "--api-url", "http://127.0.0.1:9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("访问链接"))
        .stderr(predicate::str::contains("--link-column"));
}

#[test]
fn test_missing_input_file_is_fatal() {
    let dir = TempDir::new().unwrap();
    appcat(&dir)
        .args(["import-lines", "nowhere.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("nowhere.txt"));
}

#[test]
fn test_invalid_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("ids.txt"), "com.example\n").unwrap();
    appcat(&dir)
        .args(["import-lines", "ids.txt", "--concurrency", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Configuration error"));
}

#[tokio::test]
async fn test_guess_submits_hits_and_writes_checkpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/apps/pkg_name/C1000007"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/apps/pkg_name/C\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_partial_json(json!({"pkg_name": "C1000007"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    appcat(&dir)
        .args([
            "guess", "--prefix", "C1", "--start", "0", "--end", "10", "--width", "6", "--checkpoint",
            "sweep.json", "--api-url",
        ])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("C1000007"))
        .stdout(predicate::str::contains("Found:      1"))
        .stdout(predicate::str::contains("Not found:  9"));

    let checkpoint: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("sweep.json")).unwrap()).unwrap();
    assert_eq!(checkpoint["next_offset"], 10);
    assert_eq!(checkpoint["pattern"]["prefix"], "C1");
    assert_eq!(checkpoint["pattern"]["width"], 6);
}

#[tokio::test]
async fn test_guess_resumes_from_checkpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/apps/pkg_name/com\.appbyme\.app\d+\.hm$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("sweep.json"),
        json!({
            "pattern": {"prefix": "com.appbyme.app", "suffix": ".hm", "width": 0},
            "next_offset": 7373,
            "updated_at": "2025-03-10T04:00:00Z"
        })
        .to_string(),
    )
    .unwrap();

    appcat(&dir)
        .args([
            "guess", "--prefix", "com.appbyme.app", "--suffix", ".hm", "--start", "7370", "--end", "7375",
            "--checkpoint", "sweep.json", "--api-url",
        ])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("Processed:  2"));
}

#[test]
fn test_guess_rejects_unusable_prefix() {
    let dir = TempDir::new().unwrap();
    appcat(&dir)
        .args(["guess", "--prefix", "com/app", "--start", "0", "--end", "5"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--prefix"));
}

#[tokio::test]
async fn test_guess_near_probes_neighbours() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/apps/pkg_name/C\d+$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .expect(7)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("known.txt"), "C100\nC102\nD5\nnodigits\n").unwrap();

    appcat(&dir)
        .args(["guess-near", "known.txt", "--radius", "2", "--prefix-filter", "C", "--api-url"])
        .arg(server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("Not found:  7"));
}

#[test]
fn test_sql_writes_and_echoes_statements() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("what.csv"), "download_count,data\n120345,2025-08-23 10:00:00\n").unwrap();

    appcat(&dir)
        .args(["sql", "what.csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INSERT INTO app_metrics"))
        .stdout(predicate::str::contains("'2025-08-23 10:00:00'"));

    let sql = fs::read_to_string(dir.path().join("gen.sql")).unwrap();
    assert!(sql.contains("    120345,\n"));
}

#[test]
fn test_sql_unknown_placeholder_is_fatal() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("what.csv"), "download_count\n1\n").unwrap();

    appcat(&dir)
        .args(["sql", "what.csv"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("data"));
    assert!(!dir.path().join("gen.sql").exists());
}

#[cfg(unix)]
#[test]
fn test_watch_once_runs_command() {
    let dir = TempDir::new().unwrap();
    appcat(&dir)
        .args(["watch", "--once", "--command", "echo ran > marker.txt", "--timeout-secs", "30"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Stopped after 1 run(s)."));

    assert!(dir.path().join("marker.txt").exists());
}

#[test]
fn test_invalid_log_level_warns_and_continues() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("what.csv"), "download_count,data\n1,2025-08-23\n").unwrap();

    appcat(&dir)
        .env("LOG_LEVEL", "loudest")
        .args(["sql", "what.csv"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Warning:"))
        .stderr(predicate::str::contains("loudest"));
}

#[cfg(unix)]
#[test]
fn test_interrupt_while_stdin_is_open_exits_promptly() {
    use std::process::{Command as StdCommand, Stdio};
    use std::time::{Duration, Instant};

    let dir = TempDir::new().unwrap();
    let mut child = StdCommand::new(assert_cmd::cargo::cargo_bin("appcat-ingest"))
        .current_dir(dir.path())
        .env_remove("LOG_OUTPUT")
        .args(["--quiet", "import-lines", "--api-url", "http://127.0.0.1:9"])
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    // Held open so the reader stays blocked
    let stdin = child.stdin.take().unwrap();

    std::thread::sleep(Duration::from_millis(700));
    let sent = StdCommand::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(sent.success());

    let deadline = Instant::now() + Duration::from_secs(5);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break Some(status);
        }
        if Instant::now() >= deadline {
            break None;
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    drop(stdin);

    let Some(status) = status else {
        child.kill().unwrap();
        panic!("appcat-ingest still running 5s after SIGINT");
    };
    assert_eq!(status.code(), Some(130));
}
