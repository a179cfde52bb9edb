//! Scoring Request Client. The only code that talks to the local Resumelytics API.
//!
//! The response body is opaque: it is shown and cached verbatim, never interpreted.
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use tracing::{debug, warn};

use crate::errors::{AnalysisError, GENERIC_SCORING_FAILURE};

/// Body of `POST /score`.
/// `candidate_experience` is always present; absent experience is sent as `null`.
#[derive(Debug, Serialize)]
pub struct ScoreRequest<'a> {
    pub resume_text: &'a str,
    pub jd_text: &'a str,
    pub candidate_experience: Option<Number>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    ok: bool,
}

/// Parses the experience field the way the browser's `Number()` does for sane input.
/// Blank → `None`; non-numeric → `None`; whole numbers stay integers.
pub fn parse_experience(raw: &str) -> Option<Number> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let value = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            warn!("Ignoring non-numeric candidate experience '{raw}'");
            return None;
        }
    };
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}

#[derive(Clone)]
pub struct ScoringClient {
    client: Client,
    endpoint: Url,
}

impl ScoringClient {
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid scoring endpoint '{endpoint}'"))?;
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build().context("Failed to build HTTP client")?,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Shared HTTP client, reused for loading tab documents.
    pub fn http(&self) -> &Client {
        &self.client
    }

    /// Sends one scoring request. No retries.
    pub async fn score(&self, request: &ScoreRequest<'_>) -> Result<Value, AnalysisError> {
        debug!(
            "POST {} (resume {} chars, jd {} chars)",
            self.endpoint,
            request.resume_text.chars().count(),
            request.jd_text.chars().count()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed = serde_json::from_str::<Value>(&body).ok();

        if !status.is_success() {
            warn!("Scoring API returned {status}: {body}");
            return Err(AnalysisError::ScoringService(server_error_message(parsed.as_ref())));
        }

        parsed.ok_or_else(|| {
            warn!("Scoring API returned {status} with a non-JSON body");
            AnalysisError::ScoringService(GENERIC_SCORING_FAILURE.to_string())
        })
    }

    /// Probes `GET /health` on the scoring service's origin.
    pub async fn health(&self) -> Result<(), AnalysisError> {
        let url = self
            .endpoint
            .join("/health")
            .map_err(|e| AnalysisError::Network(e.to_string()))?;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisError::ScoringService(format!(
                "Health check returned {status}"
            )));
        }

        match response.json::<HealthResponse>().await {
            Ok(HealthResponse { ok: true }) => Ok(()),
            _ => Err(AnalysisError::ScoringService(
                "Health check did not report ok".to_string(),
            )),
        }
    }
}

/// Server-supplied `error` string when present and non-empty, else the generic message.
fn server_error_message(body: Option<&Value>) -> String {
    body.and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .filter(|msg| !msg.is_empty())
        .unwrap_or(GENERIC_SCORING_FAILURE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{unreachable_url, MockScoringService};
    use axum::http::StatusCode;
    use serde_json::json;

    fn request<'a>(experience: Option<Number>) -> ScoreRequest<'a> {
        ScoreRequest {
            resume_text: "I am a software engineer",
            jd_text: "Senior Go Engineer, 5 years",
            candidate_experience: experience,
        }
    }

    #[test]
    fn test_absent_experience_serializes_as_null() {
        let body = serde_json::to_value(request(parse_experience(""))).unwrap();
        assert_eq!(
            body,
            json!({
                "resume_text": "I am a software engineer",
                "jd_text": "Senior Go Engineer, 5 years",
                "candidate_experience": null
            })
        );
    }

    #[test]
    fn test_parse_experience() {
        assert_eq!(parse_experience(" 5 "), Some(Number::from(5)));
        assert_eq!(parse_experience("2.5"), Number::from_f64(2.5));
        assert_eq!(parse_experience("abc"), None);
        assert_eq!(parse_experience("   "), None);
        assert_eq!(parse_experience("inf"), None);
    }

    #[test]
    fn test_server_error_message_fallbacks() {
        assert_eq!(server_error_message(Some(&json!({"error": "bad input"}))), "bad input");
        assert_eq!(server_error_message(Some(&json!({"error": ""}))), "Scoring failed.");
        assert_eq!(server_error_message(Some(&json!({"error": 42}))), "Scoring failed.");
        assert_eq!(server_error_message(Some(&json!({"detail": "x"}))), "Scoring failed.");
        assert_eq!(server_error_message(None), "Scoring failed.");
    }

    #[tokio::test]
    async fn test_success_returns_body_verbatim() {
        let service = MockScoringService::start(StatusCode::OK, r#"{"score": 0.82}"#).await;
        let client = ScoringClient::new(&service.score_url(), None).unwrap();

        let result = client.score(&request(Some(Number::from(3)))).await.unwrap();
        assert_eq!(result, json!({"score": 0.82}));

        let sent = service.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0]["candidate_experience"], json!(3));
        assert_eq!(sent[0]["jd_text"], "Senior Go Engineer, 5 years");
    }

    #[tokio::test]
    async fn test_server_error_field_is_surfaced() {
        let service = MockScoringService::start(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"bad input"}"#,
        )
        .await;
        let client = ScoringClient::new(&service.score_url(), None).unwrap();

        let err = client.score(&request(None)).await.unwrap_err();
        assert_eq!(err, AnalysisError::ScoringService("bad input".to_string()));
    }

    #[tokio::test]
    async fn test_unparseable_error_body_falls_back() {
        let service =
            MockScoringService::start(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").await;
        let client = ScoringClient::new(&service.score_url(), None).unwrap();

        let err = client.score(&request(None)).await.unwrap_err();
        assert_eq!(err.user_message(), "Error: Scoring failed.");
    }

    #[tokio::test]
    async fn test_non_json_success_body_is_a_failure() {
        let service = MockScoringService::start(StatusCode::OK, "not json").await;
        let client = ScoringClient::new(&service.score_url(), None).unwrap();

        let err = client.score(&request(None)).await.unwrap_err();
        assert_eq!(err, AnalysisError::ScoringService("Scoring failed.".to_string()));
    }

    #[tokio::test]
    async fn test_error_status_with_success_shaped_body_still_fails() {
        let service = MockScoringService::start(StatusCode::BAD_REQUEST, r#"{"score": 1}"#).await;
        let client = ScoringClient::new(&service.score_url(), None).unwrap();

        let err = client.score(&request(None)).await.unwrap_err();
        assert_eq!(err.user_message(), "Error: Scoring failed.");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_network_error() {
        let client = ScoringClient::new(&unreachable_url().await, None).unwrap();
        let err = client.score(&request(None)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Network(_)));
    }

    #[tokio::test]
    async fn test_health_ok() {
        let service = MockScoringService::start(StatusCode::OK, "{}").await;
        let client = ScoringClient::new(&service.score_url(), None).unwrap();
        client.health().await.unwrap();
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(ScoringClient::new("not a url", None).is_err());
    }
}
