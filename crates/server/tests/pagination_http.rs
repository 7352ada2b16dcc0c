//! End-to-end pagination over HTTP: cursor chaining, clamping, and the
//! 400-class cursor error contract.

mod common;

use common::{app, config, get};
use axum::http::StatusCode;
use serde_json::Value;
use tokenfit_server::InMemorySource;
use tokenfit_test_utils::sample_booking;

fn bookings_source(n: u64) -> InMemorySource {
    InMemorySource {
        bookings: (0..n)
            .map(|i| {
                let mut booking = sample_booking(i);
                if i % 3 == 0 {
                    booking["status"] = Value::from("cancelled");
                }
                booking
            })
            .collect(),
        ..InMemorySource::default()
    }
}

/// Budgets high enough that pagination tests never trigger summarization.
fn wide_open() -> tokenfit_server::ShapeConfig {
    config(500_000, 1_000_000)
}

#[tokio::test]
async fn cursor_chain_walks_the_dataset_in_order() {
    /*
    GIVEN 237 bookings and limit 50
    WHEN pages are followed cursor by cursor over HTTP
    THEN sizes are 50,50,50,50,37 and every id is visited exactly once
    */
    let (_state, app) = app(bookings_source(237), wide_open());

    let mut sizes = Vec::new();
    let mut ids = Vec::new();
    let mut uri = "/bookings?limit=50".to_string();

    loop {
        let (status, body) = get(&app, &uri).await;
        assert_eq!(status, StatusCode::OK);

        let items = body["items"].as_array().expect("items");
        sizes.push(items.len());
        ids.extend(items.iter().map(|b| b["id"].as_u64().expect("id")));

        let has_more = body["meta"]["has_more"].as_bool().expect("has_more");
        match body.get("next_cursor").and_then(Value::as_str) {
            Some(cursor) => {
                assert!(has_more, "cursor present implies has_more");
                uri = format!("/bookings?limit=50&cursor={cursor}");
            }
            None => {
                assert!(!has_more, "absent cursor implies final page");
                break;
            }
        }
    }

    assert_eq!(sizes, vec![50, 50, 50, 50, 37]);
    assert_eq!(ids, (0..237).collect::<Vec<u64>>());
}

#[tokio::test]
async fn malformed_cursor_is_a_400_with_reason() {
    let (_state, app) = app(bookings_source(10), wide_open());
    let (status, body) = get(&app, "/bookings?cursor=garbage").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "malformed cursor");
}

#[tokio::test]
async fn tampered_cursor_is_rejected_as_invalid_signature() {
    let (_state, app) = app(bookings_source(10), wide_open());
    let (_, body) = get(&app, "/bookings?limit=4").await;
    let cursor = body["next_cursor"].as_str().expect("cursor").to_string();

    // Flip a character in the signature half.
    let dot = cursor.find('.').expect("two-part cursor");
    let mut tampered: Vec<char> = cursor.chars().collect();
    tampered[dot + 1] = if tampered[dot + 1] == 'A' { 'B' } else { 'A' };
    let tampered: String = tampered.into_iter().collect();

    let (status, body) = get(&app, &format!("/bookings?limit=4&cursor={tampered}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "invalid cursor signature");
}

#[tokio::test]
async fn cursor_from_other_filter_set_is_rejected() {
    let (_state, app) = app(bookings_source(30), wide_open());

    let (_, body) = get(&app, "/bookings?limit=3&status=cancelled").await;
    let cursor = body["next_cursor"].as_str().expect("cursor").to_string();

    let (status, body) =
        get(&app, &format!("/bookings?limit=3&status=confirmed&cursor={cursor}")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "cursor filter mismatch");

    // The same cursor resumes fine under its own filter.
    let (status, body) =
        get(&app, &format!("/bookings?limit=3&status=cancelled&cursor={cursor}")).await;
    assert_eq!(status, StatusCode::OK);
    for item in body["items"].as_array().expect("items") {
        assert_eq!(item["status"], "cancelled");
    }
}

#[tokio::test]
async fn limit_is_clamped_to_configured_bounds() {
    let (_state, app) = app(bookings_source(150), wide_open());

    // Default max_page_size is 100.
    let (_, body) = get(&app, "/bookings?limit=500").await;
    assert_eq!(body["meta"]["page_size"], 100);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(100));

    let (_, body) = get(&app, "/bookings?limit=0").await;
    assert_eq!(body["meta"]["page_size"], 1);
    assert_eq!(body["items"].as_array().map(Vec::len), Some(1));

    // No limit supplied: default_page_size applies.
    let (_, body) = get(&app, "/bookings").await;
    assert_eq!(body["meta"]["page_size"], 50);
}

#[tokio::test]
async fn cursor_telemetry_shows_up_in_metrics() {
    let (_state, app) = app(bookings_source(120), wide_open());

    let (_, body) = get(&app, "/bookings?limit=50").await;
    let cursor = body["next_cursor"].as_str().expect("cursor").to_string();
    let (_, _) = get(&app, &format!("/bookings?limit=50&cursor={cursor}")).await;

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["cursors"]["issued_total"].as_u64().expect("issued") >= 2);
    assert_eq!(body["shaping"]["pagination_adoption_rate"], 0.5);
}
