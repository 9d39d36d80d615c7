//! Catalog client and pipeline tests against a mock catalog service
//!
//! These tests cover:
//! - Lookup response classification
//! - Submission request shape and failure handling
//! - Driver behaviour end to end (resolve, de-duplication, dry run, retries)

use appcat_ingest::api::{CatalogClient, Resolver, Submitter};
use appcat_ingest::config::IngestConfig;
use appcat_ingest::extract::{CsvColumns, Extractor};
use appcat_ingest::model::{
    CandidateIdentifier, Comment, ExtractionSource, LookupResult, SubmissionRecord, SubmitOutcome,
};
use appcat_ingest::pipeline::{Driver, DriverOptions, Mode, RunState};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::{
    matchers::{body_json, body_partial_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

fn config_for(server: &MockServer) -> IngestConfig {
    IngestConfig {
        api_url: server.uri(),
        timeout_secs: 1,
        retry_base_ms: 10,
        ..Default::default()
    }
}

fn id(raw: &str) -> CandidateIdentifier {
    CandidateIdentifier::new(raw).unwrap()
}

async fn mount_lookup(server: &MockServer, identifier: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(format!("/api/apps/pkg_name/{identifier}")))
        .respond_with(response)
        .mount(server)
        .await;
}

fn driver_for(server: &MockServer, mode: Mode, dry_run: bool) -> Driver {
    let config = config_for(server);
    let client = Arc::new(CatalogClient::new(&config).unwrap());
    Driver::new(
        Extractor::new(CsvColumns::default()).unwrap(),
        client.clone(),
        client,
        DriverOptions::from_config(&config, mode).dry_run(dry_run),
    )
}

fn lines(items: &[&str]) -> Vec<(u64, ExtractionSource)> {
    items
        .iter()
        .enumerate()
        .map(|(i, s)| (i as u64, ExtractionSource::Line(s.to_string())))
        .collect()
}

#[tokio::test]
async fn test_lookup_success_is_found() {
    let server = MockServer::start().await;
    mount_lookup(
        &server,
        "com.example.app",
        ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"name": "Example"}})),
    )
    .await;

    let client = CatalogClient::new(&config_for(&server)).unwrap();
    match client.resolve(&id("com.example.app")).await {
        LookupResult::Found(body) => assert_eq!(body["data"]["name"], "Example"),
        other => panic!("expected Found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_lookup_unsuccessful_body_is_not_found() {
    let server = MockServer::start().await;
    mount_lookup(&server, "com.missing", ResponseTemplate::new(200).set_body_json(json!({"success": false}))).await;
    mount_lookup(&server, "com.gone", ResponseTemplate::new(404).set_body_json(json!({"success": false}))).await;

    let client = CatalogClient::new(&config_for(&server)).unwrap();
    assert_eq!(client.resolve(&id("com.missing")).await, LookupResult::NotFound);
    assert_eq!(client.resolve(&id("com.gone")).await, LookupResult::NotFound);
}

#[tokio::test]
async fn test_lookup_failures_are_transient() {
    let server = MockServer::start().await;
    mount_lookup(&server, "p.unavailable", ResponseTemplate::new(503)).await;
    mount_lookup(&server, "p.throttled", ResponseTemplate::new(429)).await;
    mount_lookup(&server, "p.html", ResponseTemplate::new(200).set_body_string("<html>oops</html>")).await;
    mount_lookup(&server, "p.shapeless", ResponseTemplate::new(200).set_body_json(json!({"data": []}))).await;
    mount_lookup(
        &server,
        "p.slow",
        ResponseTemplate::new(200)
            .set_body_json(json!({"success": true}))
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let client = CatalogClient::new(&config_for(&server)).unwrap();
    for candidate in ["p.unavailable", "p.throttled", "p.html", "p.shapeless", "p.slow"] {
        let result = client.resolve(&id(candidate)).await;
        assert!(result.is_transient(), "{candidate}: expected transient, got {result:?}");
    }
}

#[tokio::test]
async fn test_submit_sends_record() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_json(json!({
            "pkg_name": "com.example.game",
            "listed_at": "2025-03-10 12:00:00+0800",
            "comment": {"user": "群友 张三", "note": "群友 张三 提供"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = CatalogClient::new(&config_for(&server)).unwrap();
    let record = SubmissionRecord {
        pkg_name: "com.example.game".to_string(),
        listed_at: Some("2025-03-10 12:00:00+0800".to_string()),
        comment: Comment {
            user: "群友 张三".to_string(),
            note: Some("群友 张三 提供".to_string()),
        },
    };
    assert_eq!(client.submit(&record).await, SubmitOutcome::Ok);
}

#[tokio::test]
async fn test_submit_rejection_is_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let client = CatalogClient::new(&config_for(&server)).unwrap();
    let record = SubmissionRecord {
        pkg_name: "com.example.game".to_string(),
        listed_at: None,
        comment: Comment {
            user: "appcat-ingest".to_string(),
            note: None,
        },
    };
    assert!(matches!(client.submit(&record).await, SubmitOutcome::Failed(_)));
}

#[tokio::test]
async fn test_guessing_submits_only_found_identifiers() {
    let server = MockServer::start().await;
    mount_lookup(&server, "com.hit", ResponseTemplate::new(200).set_body_json(json!({"success": true}))).await;
    mount_lookup(&server, "com.miss", ResponseTemplate::new(200).set_body_json(json!({"success": false}))).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_partial_json(json!({"pkg_name": "com.hit"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = driver_for(&server, Mode::Resolve, false)
        .run(lines(&["com.hit", "com.miss"]), 0)
        .await;

    assert_eq!(report.state, RunState::Completed);
    assert_eq!(report.tally.found, 1);
    assert_eq!(report.tally.not_found, 1);
    assert_eq!(report.tally.submitted, 1);
}

#[tokio::test]
async fn test_transient_lookup_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/apps/pkg_name/com.flaky"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    mount_lookup(&server, "com.flaky", ResponseTemplate::new(200).set_body_json(json!({"success": true}))).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = driver_for(&server, Mode::Resolve, false).run(lines(&["com.flaky"]), 0).await;

    assert_eq!(report.tally.found, 1);
    assert_eq!(report.tally.unresolved, 0);
    assert_eq!(report.tally.submitted, 1);
}

#[tokio::test]
async fn test_exhausted_retries_count_as_unresolved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/apps/pkg_name/com.down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let report = driver_for(&server, Mode::Resolve, false).run(lines(&["com.down"]), 0).await;

    assert_eq!(report.tally.unresolved, 1);
    assert_eq!(report.tally.unresolved_ids, vec!["com.down"]);
    assert_eq!(report.state, RunState::Completed);
}

#[tokio::test]
async fn test_duplicates_are_submitted_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_partial_json(json!({"pkg_name": "com.same"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let report = driver_for(&server, Mode::Direct, false)
        .run(
            lines(&[
                "https://appgallery.huawei.com/app/detail?id=com.same",
                "com.same",
                "\"com.same\"",
            ]),
            0,
        )
        .await;

    assert_eq!(report.tally.submitted, 1);
    assert_eq!(report.tally.skipped, 2);
}

#[tokio::test]
async fn test_dry_run_never_hits_submit() {
    let server = MockServer::start().await;
    mount_lookup(&server, "com.hit", ResponseTemplate::new(200).set_body_json(json!({"success": true}))).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let report = driver_for(&server, Mode::Resolve, true).run(lines(&["com.hit"]), 0).await;

    assert_eq!(report.tally.found, 1);
    assert_eq!(report.planned.len(), 1);
    assert_eq!(report.planned[0].pkg_name, "com.hit");
}

#[tokio::test]
async fn test_csv_rows_become_attributed_submissions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_json(json!({
            "pkg_name": "com.example.game",
            "listed_at": "2025-03-10 12:00:00+0800",
            "comment": {"user": "酷友 小明", "note": "酷友 小明f09c50** 提供"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_json(json!({
            "pkg_name": "com.example.tool",
            "comment": {"user": "appcat-ingest"}
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let row = |link: &str, date: &str, note: &str| {
        ExtractionSource::Row(HashMap::from([
            ("访问链接".to_string(), link.to_string()),
            ("上架时间".to_string(), date.to_string()),
            ("备注".to_string(), note.to_string()),
        ]))
    };
    let items = vec![
        (0, row("https://appgallery.huawei.com/app/detail?id=com.example.game", "2025/03/10", "酷友 小明f09c50** 提供")),
        (1, row("https://appgallery.huawei.com/app/detail?id=com.example.tool", "", "")),
        (2, row("https://appgallery.huawei.com/app/detail", "2025/03/11", "")),
    ];

    let report = driver_for(&server, Mode::Direct, false).run(items, 0).await;

    assert_eq!(report.tally.submitted, 2);
    assert_eq!(report.tally.skipped, 1);
    assert_eq!(report.tally.failed, 0);
}

#[tokio::test]
async fn test_failed_submissions_are_listed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_partial_json(json!({"pkg_name": "com.bad"})))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let report = driver_for(&server, Mode::Direct, false)
        .run(lines(&["com.good", "com.bad", "com.also.good"]), 0)
        .await;

    assert_eq!(report.tally.submitted, 2);
    assert_eq!(report.tally.failed, 1);
    assert_eq!(report.tally.failed_ids, vec!["com.bad"]);
    assert_eq!(report.resume_offset, 3);
}
