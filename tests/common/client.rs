//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all survey-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
    /// Sent as a bearer token on admin requests when set
    admin_api_key: Option<String>,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self {
            client,
            base_url,
            admin_api_key: None,
        }
    }

    /// Creates a client that authenticates admin requests with `ADMIN_API_KEY`
    pub fn admin(base_url: String) -> Self {
        Self::with_admin_key(base_url, ADMIN_API_KEY)
    }

    pub fn with_admin_key(base_url: String, key: &str) -> Self {
        Self {
            admin_api_key: Some(key.to_string()),
            ..Self::new(base_url)
        }
    }

    // ========================================================================
    // Survey Endpoints
    // ========================================================================

    /// GET /v1/survey/device-options
    pub async fn get_device_options(&self) -> Response {
        self.client
            .get(format!("{}/v1/survey/device-options", self.base_url))
            .send()
            .await
            .expect("Get device options request failed")
    }

    /// POST /v1/survey/devices
    pub async fn register_device(&self, body: &Value) -> Response {
        self.client
            .post(format!("{}/v1/survey/devices", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Register device request failed")
    }

    /// GET /v1/survey/devices/{device_id}
    pub async fn get_device(&self, device_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/survey/devices/{}", self.base_url, device_id))
            .send()
            .await
            .expect("Get device request failed")
    }

    /// GET /v1/survey/round
    pub async fn get_round(
        &self,
        transition_modes: Option<&str>,
        pairing_types: Option<&str>,
    ) -> Response {
        let mut query = Vec::new();
        if let Some(modes) = transition_modes {
            query.push(("transition_modes", modes));
        }
        if let Some(types) = pairing_types {
            query.push(("pairing_types", types));
        }
        self.client
            .get(format!("{}/v1/survey/round", self.base_url))
            .query(&query)
            .send()
            .await
            .expect("Get round request failed")
    }

    /// Fetches a round and returns the `round` object, panicking if none is available
    pub async fn get_round_json(&self) -> Value {
        let response = self.get_round(None, None).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("Invalid round body");
        assert!(!body["round"].is_null(), "No round available: {}", body);
        body["round"].clone()
    }

    /// POST /v1/survey/answers
    pub async fn post_answer(&self, body: &Value) -> Response {
        self.client
            .post(format!("{}/v1/survey/answers", self.base_url))
            .json(body)
            .send()
            .await
            .expect("Post answer request failed")
    }

    /// POST /v1/survey/answers with a raw, possibly malformed, body
    pub async fn post_answer_raw(&self, body: &'static str) -> Response {
        self.client
            .post(format!("{}/v1/survey/answers", self.base_url))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Post answer request failed")
    }

    // ========================================================================
    // Admin Endpoints
    // ========================================================================

    fn with_admin_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.admin_api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// GET /v1/admin/survey-config
    pub async fn get_survey_config(&self) -> Response {
        self.with_admin_auth(
            self.client
                .get(format!("{}/v1/admin/survey-config", self.base_url)),
        )
        .send()
        .await
        .expect("Get survey config request failed")
    }

    /// PUT /v1/admin/survey-config/{section}
    pub async fn put_survey_config(&self, section: &str, body: &Value) -> Response {
        self.with_admin_auth(
            self.client
                .put(format!("{}/v1/admin/survey-config/{}", self.base_url, section))
                .json(body),
        )
        .send()
        .await
        .expect("Put survey config request failed")
    }
}
