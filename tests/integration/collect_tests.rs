//! End-to-end collection tests against a mock HTTP server

use std::collections::BTreeMap;
use vitrin::config::{
    Config, DiscoveryMode, ExtractConfig, ExtractStep, FieldRule, HttpMethod, IdentityConfig,
    OutputConfig, PaginationKind, PaginationRule, PayloadFormat, SourceConfig,
};
use vitrin::engine::collect;
use vitrin::output::{CsvSink, ResultSink};
use vitrin::SessionReport;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a JSON API configuration pointing at the mock server
///
/// The pagination rule follows the discovery mode: a `total` field for
/// known-total sources, a `more` flag for sentinel sources.
fn create_json_config(
    base_url: &str,
    discovery: DiscoveryMode,
    page_size: u32,
    concurrency: u32,
) -> Config {
    let pagination = match discovery {
        DiscoveryMode::KnownTotal => json_rule(PaginationKind::TotalField, "total"),
        DiscoveryMode::Sentinel => json_rule(PaginationKind::MoreMarker, "more"),
    };

    Config {
        source: SourceConfig {
            name: "test-source".to_string(),
            endpoint: format!("{}/api/items?page={{page}}&size={{limit}}", base_url),
            method: HttpMethod::Get,
            body: None,
            page_size,
            concurrency,
            discovery,
            max_pages: 200,
            request_timeout: 5,
            headers: BTreeMap::new(),
        },
        extract: ExtractConfig {
            format: PayloadFormat::Json,
            record_selector: None,
            records_path: Some("items".to_string()),
            fragment_path: None,
            fields: vec![json_field("id", "id"), json_field("title", "title")],
            pagination,
        },
        identity: IdentityConfig {
            key_fields: vec!["id".to_string()],
        },
        output: OutputConfig {
            path: "./out.csv".to_string(),
            columns: vec!["id".to_string(), "title".to_string()],
        },
    }
}

fn json_field(name: &str, field_path: &str) -> FieldRule {
    FieldRule {
        name: name.to_string(),
        steps: vec![ExtractStep {
            selector: None,
            attr: None,
            path: Some(field_path.to_string()),
            pattern: None,
        }],
    }
}

fn json_rule(kind: PaginationKind, signal_path: &str) -> PaginationRule {
    PaginationRule {
        rule: kind,
        selector: None,
        attr: None,
        path: Some(signal_path.to_string()),
        pattern: None,
    }
}

/// Renders the record array of a page, with ids like `p2-r1`
fn json_items(page: u32, count: u32) -> String {
    (1..=count)
        .map(|n| {
            format!(
                r#"{{"id": "p{}-r{}", "title": "Record {} of page {}"}}"#,
                page, n, n, page
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn total_page(page: u32, count: u32, total: u64) -> String {
    format!(r#"{{"total": {}, "items": [{}]}}"#, total, json_items(page, count))
}

fn marker_page(page: u32, count: u32, more: bool) -> String {
    format!(r#"{{"more": {}, "items": [{}]}}"#, more, json_items(page, count))
}

/// Mounts one JSON page response for `?page=N`
async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn record_ids(report: &SessionReport) -> Vec<String> {
    report
        .records
        .iter()
        .filter_map(|record| record.get("id"))
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_known_total_fetches_exact_remainder() {
    let mock_server = MockServer::start().await;

    // 45 records at 20 per page: pages 2 and 3 cover the remainder
    mount_page(&mock_server, 1, total_page(1, 20, 45)).await;
    mount_page(&mock_server, 2, total_page(2, 20, 45)).await;
    mount_page(&mock_server, 3, total_page(3, 5, 45)).await;

    // Page 4 lies past the advertised total
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string(total_page(4, 20, 45)))
        .expect(0) // Should never be called
        .mount(&mock_server)
        .await;

    let config = create_json_config(&mock_server.uri(), DiscoveryMode::KnownTotal, 20, 4);
    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.records.len(), 45);
    assert_eq!(report.pages_requested, 3);
    assert_eq!(report.pages_failed, 0);
    assert_eq!(report.duplicates_removed, 0);
    assert!(!report.capped);

    // Records arrive in page order
    let ids = record_ids(&report);
    assert_eq!(ids[0], "p1-r1");
    assert_eq!(ids[20], "p2-r1");
    assert_eq!(ids[44], "p3-r5");
}

#[tokio::test]
async fn test_page_links_reveal_the_last_page() {
    let mock_server = MockServer::start().await;

    // Every page renders pager links 1..=4
    for page in 1..=4u32 {
        Mock::given(method("GET"))
            .and(path("/catalog"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(html_page(page, 2, 4)))
            .mount(&mock_server)
            .await;
    }

    // No page 5 exists in the pager
    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page(5, 2, 4)))
        .expect(0) // Should never be called
        .mount(&mock_server)
        .await;

    let config = create_html_config(&mock_server.uri(), 3);
    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.pages_requested, 4);
    assert_eq!(report.records.len(), 8);
    assert_eq!(
        report.records[7].get("url"),
        Some("/item/p4-2"),
        "last record should come from page 4"
    );
}

#[tokio::test]
async fn test_sentinel_keeps_nothing_past_the_end_signal() {
    let mock_server = MockServer::start().await;

    // Page 3 is the last page; 4 and 5 exist but lie past the end
    mount_page(&mock_server, 1, marker_page(1, 2, true)).await;
    mount_page(&mock_server, 2, marker_page(2, 2, true)).await;
    mount_page(&mock_server, 3, marker_page(3, 2, false)).await;
    mount_page(&mock_server, 4, marker_page(4, 2, true)).await;
    mount_page(&mock_server, 5, marker_page(5, 2, true)).await;

    // The probe stops after the batch that contained the end signal
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "6"))
        .respond_with(ResponseTemplate::new(200).set_body_string(marker_page(6, 2, true)))
        .expect(0) // Should never be called
        .mount(&mock_server)
        .await;

    let config = create_json_config(&mock_server.uri(), DiscoveryMode::Sentinel, 2, 4);
    let report = collect(config).await.expect("collect failed");

    // Pages 4 and 5 were requested inside the batch but contribute nothing
    assert_eq!(report.pages_requested, 5);
    assert_eq!(report.terminal_page, Some(3));
    assert!(!report.capped);
    assert_eq!(
        record_ids(&report),
        vec!["p1-r1", "p1-r2", "p2-r1", "p2-r2", "p3-r1", "p3-r2"]
    );
}

#[tokio::test]
async fn test_failed_page_does_not_abort_the_session() {
    let mock_server = MockServer::start().await;

    // 10 records at 2 per page: pages 2..=5 cover the remainder
    mount_page(&mock_server, 1, total_page(1, 2, 10)).await;
    mount_page(&mock_server, 2, total_page(2, 2, 10)).await;
    mount_page(&mock_server, 4, total_page(4, 2, 10)).await;
    mount_page(&mock_server, 5, total_page(5, 2, 10)).await;

    // Page 3 is broken on the server side
    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_json_config(&mock_server.uri(), DiscoveryMode::KnownTotal, 2, 4);
    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.pages_requested, 5);
    assert_eq!(report.pages_failed, 1);
    assert_eq!(report.records.len(), 8);

    let ids = record_ids(&report);
    assert!(
        ids.iter().all(|id| !id.starts_with("p3-")),
        "the failed page should contribute no records"
    );
    assert_eq!(ids[3], "p2-r2");
    assert_eq!(ids[4], "p4-r1");
}

#[tokio::test]
async fn test_page_ceiling_stops_an_endless_listing() {
    let mock_server = MockServer::start().await;

    // Every page claims more follows
    for page in 1..=6u32 {
        mount_page(&mock_server, page, marker_page(page, 1, true)).await;
    }

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_string(marker_page(7, 1, true)))
        .expect(0) // Should never be called with max-pages = 6
        .mount(&mock_server)
        .await;

    let mut config = create_json_config(&mock_server.uri(), DiscoveryMode::Sentinel, 1, 2);
    config.source.max_pages = 6;

    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.pages_requested, 6);
    assert_eq!(report.records.len(), 6);
    assert!(report.capped);
    assert_eq!(report.terminal_page, None);
}

#[tokio::test]
async fn test_record_order_does_not_depend_on_concurrency() {
    let mock_server = MockServer::start().await;

    // End signal on page 3; pages beyond exist so a wide batch can reach them
    mount_page(&mock_server, 1, marker_page(1, 2, true)).await;
    mount_page(&mock_server, 2, marker_page(2, 2, true)).await;
    mount_page(&mock_server, 3, marker_page(3, 2, false)).await;
    mount_page(&mock_server, 4, marker_page(4, 2, true)).await;
    mount_page(&mock_server, 5, marker_page(5, 2, true)).await;
    mount_page(&mock_server, 6, marker_page(6, 2, true)).await;

    let serial_config = create_json_config(&mock_server.uri(), DiscoveryMode::Sentinel, 2, 1);
    let wide_config = create_json_config(&mock_server.uri(), DiscoveryMode::Sentinel, 2, 5);

    let serial = collect(serial_config).await.expect("serial collect failed");
    let wide = collect(wide_config).await.expect("wide collect failed");

    // A wider batch probes further but never changes the outcome
    assert_eq!(serial.terminal_page, Some(3));
    assert_eq!(wide.terminal_page, Some(3));
    assert_eq!(record_ids(&serial), record_ids(&wide));
}

#[tokio::test]
async fn test_unreadable_total_degrades_to_first_page_only() {
    let mock_server = MockServer::start().await;

    // The payload carries no "total" field the rule could read
    mount_page(&mock_server, 1, marker_page(1, 2, true)).await;

    Mock::given(method("GET"))
        .and(path("/api/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(marker_page(2, 2, true)))
        .expect(0) // Should never be called
        .mount(&mock_server)
        .await;

    let config = create_json_config(&mock_server.uri(), DiscoveryMode::KnownTotal, 2, 4);
    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.pages_requested, 1);
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.pages_failed, 0);
    assert!(!report.capped);
}

#[tokio::test]
async fn test_post_body_carries_the_page_placeholders() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("page=1&size=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(total_page(1, 2, 4)))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("page=2&size=2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(total_page(2, 2, 4)))
        .mount(&mock_server)
        .await;

    let mut config = create_json_config(&mock_server.uri(), DiscoveryMode::KnownTotal, 2, 2);
    config.source.endpoint = format!("{}/search", mock_server.uri());
    config.source.method = HttpMethod::Post;
    config.source.body = Some("page={page}&size={limit}".to_string());

    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.pages_requested, 2);
    assert_eq!(report.records.len(), 4);
}

#[tokio::test]
async fn test_duplicates_collapse_to_the_first_occurrence() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 1, total_page(1, 2, 4)).await;

    // Page 2 repeats p1-r1 under a different title
    let repeat = r#"{"total": 4, "items": [
        {"id": "p1-r1", "title": "Repeat"},
        {"id": "p2-r2", "title": "Fresh"}
    ]}"#;
    mount_page(&mock_server, 2, repeat.to_string()).await;

    let config = create_json_config(&mock_server.uri(), DiscoveryMode::KnownTotal, 2, 2);
    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.records_seen, 4);
    assert_eq!(report.duplicates_removed, 1);
    assert_eq!(record_ids(&report), vec!["p1-r1", "p1-r2", "p2-r2"]);
    assert_eq!(
        report.records[0].get("title"),
        Some("Record 1 of page 1"),
        "the earlier page's version should win"
    );
}

#[tokio::test]
async fn test_envelope_payload_extracts_from_embedded_fragment() {
    let mock_server = MockServer::start().await;

    let fragment = concat!(
        r#"<div class="card"><a href="/item/1">First</a></div>"#,
        r#"<div class="card"><a href="/item/2">Second</a></div>"#,
    );
    let envelope = serde_json::json!({ "html": fragment, "more": false }).to_string();

    mount_page(&mock_server, 1, envelope).await;

    let mut config = create_html_config(&mock_server.uri(), 2);
    config.source.endpoint = format!("{}/api/items?page={{page}}", mock_server.uri());
    config.source.discovery = DiscoveryMode::Sentinel;
    config.extract.format = PayloadFormat::JsonHtml;
    config.extract.fragment_path = Some("html".to_string());
    config.extract.pagination = json_rule(PaginationKind::MoreMarker, "more");

    let report = collect(config).await.expect("collect failed");

    assert_eq!(report.pages_requested, 1);
    assert_eq!(report.terminal_page, Some(1));
    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].get("title"), Some("First"));
    assert_eq!(report.records[1].get("url"), Some("/item/2"));
}

#[tokio::test]
async fn test_collected_records_write_as_csv() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, 1, total_page(1, 2, 3)).await;
    mount_page(&mock_server, 2, total_page(2, 1, 3)).await;

    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let csv_path = temp_dir.path().join("records.csv");

    let mut config = create_json_config(&mock_server.uri(), DiscoveryMode::KnownTotal, 2, 2);
    config.output.path = csv_path.to_string_lossy().into_owned();

    let sink = CsvSink::from_config(&config.output);
    let report = collect(config).await.expect("collect failed");
    sink.write(&report.records).expect("write csv");

    let written = std::fs::read_to_string(&csv_path).expect("read csv");
    assert_eq!(
        written,
        "id,title\r\n\
         p1-r1,Record 1 of page 1\r\n\
         p1-r2,Record 2 of page 1\r\n\
         p2-r1,Record 1 of page 2\r\n"
    );
}

/// Creates an HTML catalog configuration pointing at the mock server
fn create_html_config(base_url: &str, concurrency: u32) -> Config {
    Config {
        source: SourceConfig {
            name: "test-shop".to_string(),
            endpoint: format!("{}/catalog?page={{page}}", base_url),
            method: HttpMethod::Get,
            body: None,
            page_size: 2,
            concurrency,
            discovery: DiscoveryMode::KnownTotal,
            max_pages: 200,
            request_timeout: 5,
            headers: BTreeMap::new(),
        },
        extract: ExtractConfig {
            format: PayloadFormat::Html,
            record_selector: Some("div.card".to_string()),
            records_path: None,
            fragment_path: None,
            fields: vec![
                FieldRule {
                    name: "title".to_string(),
                    steps: vec![ExtractStep {
                        selector: Some("a".to_string()),
                        attr: None,
                        path: None,
                        pattern: None,
                    }],
                },
                FieldRule {
                    name: "url".to_string(),
                    steps: vec![ExtractStep {
                        selector: Some("a".to_string()),
                        attr: Some("href".to_string()),
                        path: None,
                        pattern: None,
                    }],
                },
            ],
            pagination: PaginationRule {
                rule: PaginationKind::PageLinks,
                selector: Some("ul.pager a".to_string()),
                attr: None,
                path: None,
                pattern: Some(r"page=(\d+)".to_string()),
            },
        },
        identity: IdentityConfig {
            key_fields: vec!["url".to_string()],
        },
        output: OutputConfig {
            path: "./out.csv".to_string(),
            columns: vec!["title".to_string(), "url".to_string()],
        },
    }
}

/// Renders one HTML catalog page with cards and a pager up to `last`
fn html_page(page: u32, count: u32, last: u32) -> String {
    let cards: String = (1..=count)
        .map(|n| {
            format!(
                r#"<div class="card"><a href="/item/p{}-{}">Item {} of page {}</a></div>"#,
                page, n, n, page
            )
        })
        .collect();
    let pager: String = (1..=last)
        .map(|n| format!(r#"<li><a href="?page={}">{}</a></li>"#, n, n))
        .collect();

    format!(
        r#"<html><body>{}<ul class="pager">{}</ul></body></html>"#,
        cards, pager
    )
}
