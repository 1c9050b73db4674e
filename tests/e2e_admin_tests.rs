//! End-to-end tests for the admin survey configuration endpoints
//!
//! Tests access control, validation and that updates steer round generation.

mod common;

use ab_survey_server::stream_tokens;
use common::{TestClient, TestServer, TestServerOptions};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn admin_server() -> TestServer {
    TestServer::spawn_with(TestServerOptions {
        with_admin: true,
        ..Default::default()
    })
    .await
}

// =============================================================================
// Access control
// =============================================================================

#[tokio::test]
async fn test_admin_routes_absent_without_api_key() {
    let server = TestServer::spawn().await;
    let client = TestClient::admin(server.base_url.clone());

    let response = client.get_survey_config().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_require_matching_key() {
    let server = admin_server().await;

    let anonymous = TestClient::new(server.base_url.clone());
    assert_eq!(
        anonymous.get_survey_config().await.status(),
        StatusCode::FORBIDDEN
    );

    let wrong_key = TestClient::with_admin_key(server.base_url.clone(), "guess");
    assert_eq!(
        wrong_key.get_survey_config().await.status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        wrong_key
            .put_survey_config("placebo", &json!({ "probability": 0.5 }))
            .await
            .status(),
        StatusCode::FORBIDDEN
    );

    let admin = TestClient::admin(server.base_url.clone());
    assert_eq!(admin.get_survey_config().await.status(), StatusCode::OK);
}

// =============================================================================
// Reading and validation
// =============================================================================

#[tokio::test]
async fn test_get_config_returns_defaults_and_options() {
    let server = admin_server().await;
    let client = TestClient::admin(server.base_url.clone());

    let body: Value = client.get_survey_config().await.json().await.unwrap();
    let config = &body["config"];
    assert_eq!(config["pairing_weights"]["same_song"], 0.7);
    assert_eq!(config["pairing_weights"]["different_song"], 0.2);
    assert_eq!(config["placebo_probability"], 0.1);
    assert_eq!(config["segment_duration_ms"], 12_000);
    assert_eq!(config["transition_weights"]["gapless"], 1.0);
    assert_eq!(config["mode_weights"]["tradeoff"], 1.0);
    assert_eq!(config["tradeoff_gap"]["min_gap"], 0.5);
    assert_eq!(config["tradeoff_gap"]["max_gap"], 2.5);
    assert_eq!(config["permutation_weights"], json!({}));

    let options = body["variantOptions"].as_array().unwrap();
    assert_eq!(options.len(), 4);
    let enabled = options
        .iter()
        .filter(|option| option["enabled"] == true)
        .count();
    assert_eq!(enabled, 3);
}

#[tokio::test]
async fn test_invalid_updates_are_rejected() {
    let server = admin_server().await;
    let client = TestClient::admin(server.base_url.clone());

    let invalid = [
        ("pairing", json!({ "same_song": 0.0, "different_song": 0.0 })),
        ("pairing", json!({ "same_song": -1.0, "different_song": 1.0 })),
        ("placebo", json!({ "probability": 1.5 })),
        ("permutation", json!({ "opus": 1.0 })),
        (
            "transition",
            json!({ "gapless": 0, "gap_continue": 0, "gap_restart": 0, "gap_pause_resume": 0 }),
        ),
        ("mode", json!({ "codec_compare": 1.0 })),
        (
            "tradeoff",
            json!({ "min_gap": 2.0, "max_gap": 1.0, "gap_points": [] }),
        ),
        ("segment", json!({ "duration_ms": 500 })),
        ("segment", json!({ "duration_ms": 500_000 })),
    ];
    for (section, body) in invalid {
        let response = client.put_survey_config(section, &body).await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "{} update {} accepted",
            section,
            body
        );
    }

    let response = client.put_survey_config("volume", &json!({})).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: Value = client.get_survey_config().await.json().await.unwrap();
    assert_eq!(body["config"]["placebo_probability"], 0.1);
    assert_eq!(body["config"]["segment_duration_ms"], 12_000);
}

// =============================================================================
// Updates steer rounds
// =============================================================================

#[tokio::test]
async fn test_segment_update_applies_to_next_round() {
    let server = admin_server().await;
    let admin = TestClient::admin(server.base_url.clone());
    let client = TestClient::new(server.base_url.clone());

    let response = admin
        .put_survey_config("segment", &json!({ "duration_ms": 20_000.4 }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["config"]["segment_duration_ms"], 20_000);

    let round = client.get_round_json().await;
    assert_eq!(round["segmentDurationMs"], 20_000);
}

#[tokio::test]
async fn test_pairing_update_applies_to_next_round() {
    let server = admin_server().await;
    let admin = TestClient::admin(server.base_url.clone());
    let client = TestClient::new(server.base_url.clone());

    let response = admin
        .put_survey_config(
            "pairing",
            &json!({ "same_song": 0.0, "different_song": 1.0 }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    for _ in 0..10 {
        let round = client.get_round_json().await;
        assert_ne!(round["labelA"]["title"], round["labelB"]["title"]);
        assert_eq!(round["transitionMode"], "gap_pause_resume");
    }
}

#[tokio::test]
async fn test_certain_placebo_serves_identical_sides() {
    let server = admin_server().await;
    let admin = TestClient::admin(server.base_url.clone());
    let client = TestClient::new(server.base_url.clone());

    for (section, body) in [
        (
            "pairing",
            json!({ "same_song": 1.0, "different_song": 0.0 }),
        ),
        ("placebo", json!({ "probability": 1.0 })),
    ] {
        let response = admin.put_survey_config(section, &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    for _ in 0..10 {
        let round = client.get_round_json().await;
        let resolve = |side: &str| {
            stream_tokens::resolve(&*server.store, round[side].as_str().unwrap())
                .unwrap()
                .unwrap()
        };
        assert_eq!(resolve("tokenA"), resolve("tokenB"));
        assert_ne!(round["tokenA"], round["tokenB"]);
    }
}

#[tokio::test]
async fn test_transition_update_applies_to_next_round() {
    let server = admin_server().await;
    let admin = TestClient::admin(server.base_url.clone());
    let client = TestClient::new(server.base_url.clone());

    for (section, body) in [
        (
            "pairing",
            json!({ "same_song": 1.0, "different_song": 0.0 }),
        ),
        (
            "transition",
            json!({ "gapless": 0.0, "gap_continue": 1.0, "gap_restart": 0.0, "gap_pause_resume": 0.0 }),
        ),
    ] {
        let response = admin.put_survey_config(section, &body).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    for _ in 0..10 {
        let round = client.get_round_json().await;
        assert_eq!(round["transitionMode"], "gap_continue");
    }
}
