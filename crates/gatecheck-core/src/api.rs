//! HTTP client for the check-in backend.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{compact_text, normalize_text_option};

const API_HTTP_TIMEOUT_SECS: u64 = 10;

/// Errors from the backend HTTP client.
///
/// `Transport` and `InvalidPayload` are client-side failures; the recorder
/// treats them as "server unreachable" and falls back to the offline path.
/// `Api` carries a server-side rejection with its parsed message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid API configuration: {0}")]
    InvalidConfiguration(String),
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API error: {0}")]
    Api(String),
    #[error("Invalid response payload: {0}")]
    InvalidPayload(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Offline snapshot of an event and its tickets/swag inventory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub event: EventPayload,
    pub tickets: Vec<TicketPayload>,
    #[serde(default)]
    pub swag_items: Vec<SwagItemPayload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    pub id: i64,
    pub code: String,
    pub event_id: i64,
    #[serde(default)]
    pub attendee_name: String,
    #[serde(default)]
    pub attendee_email: String,
    #[serde(default)]
    pub ticket_type: String,
    #[serde(default)]
    pub is_checked_in: bool,
    #[serde(default)]
    pub checked_in_at: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwagItemPayload {
    pub id: i64,
    pub event_id: i64,
    pub name: String,
}

/// Structured outcome of an online ticket verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VerifyStatus {
    CheckedIn,
    AlreadyCheckedIn,
    NotFound,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub status: VerifyStatus,
    #[serde(default)]
    pub attendee_name: Option<String>,
    #[serde(default)]
    pub ticket_type: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub swag_items: Vec<SwagItemPayload>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body for replaying one offline check-in.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckinSyncRequest {
    pub ticket_code: String,
    pub checked_in_at: i64,
    pub notes: String,
}

/// Body for replaying one offline swag collection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SwagSyncRequest {
    pub ticket_code: String,
    pub swag_item_id: i64,
    pub collected_at: i64,
}

#[derive(Debug, Deserialize)]
struct CheckinSyncResponse {
    reference: String,
}

/// HTTP client for the check-in backend.
#[derive(Clone)]
pub struct CheckinApi {
    base_url: String,
    client: reqwest::Client,
}

impl CheckinApi {
    pub fn new(base_url: impl Into<String>) -> ApiResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        Ok(Self {
            base_url,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(API_HTTP_TIMEOUT_SECS))
                .build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the offline snapshot for an event.
    pub async fn fetch_snapshot(&self, org: &str, event: &str) -> ApiResult<SnapshotPayload> {
        let url = format!("{}/offline-data/{org}/{event}", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let response = check_status(response).await?;
        response
            .json::<SnapshotPayload>()
            .await
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))
    }

    /// Verify a ticket online.
    ///
    /// Any HTTP response with a parseable body is an outcome, whatever the
    /// status code; a response the client cannot interpret is an `Api`
    /// error.
    pub async fn verify_ticket(
        &self,
        org: &str,
        event: &str,
        code: &str,
    ) -> ApiResult<VerifyResponse> {
        let url = format!("{}/checkin/{org}/{event}/verify", self.base_url);
        let response = self.client.post(&url).form(&[("code", code)]).send().await?;

        let status = response.status();
        let body = response.text().await?;
        serde_json::from_str::<VerifyResponse>(&body)
            .map_err(|_| ApiError::Api(parse_api_error(status, &body)))
    }

    /// Collect a swag item online, keyed by the check-in's server reference.
    pub async fn collect_swag(&self, checkin_ref: &str, swag_item_id: i64) -> ApiResult<()> {
        let url = format!("{}/checkin/swag/{checkin_ref}/{swag_item_id}", self.base_url);
        let response = self.client.post(&url).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Replay one offline check-in; returns the server-issued reference.
    ///
    /// The endpoint is idempotent: replaying a check-in for a ticket that
    /// is already checked in returns the existing reference.
    pub async fn sync_checkin(&self, request: &CheckinSyncRequest) -> ApiResult<String> {
        let url = format!("{}/checkin/sync", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let response = check_status(response).await?;
        let payload = response
            .json::<CheckinSyncResponse>()
            .await
            .map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
        Ok(payload.reference)
    }

    /// Replay one offline swag collection.
    pub async fn sync_swag(&self, request: &SwagSyncRequest) -> ApiResult<()> {
        let url = format!("{}/checkin/swag/sync", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        check_status(response).await?;
        Ok(())
    }

    /// Liveness probe; any 2xx means the backend is reachable.
    pub async fn probe_health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.head(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Api(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> ApiResult<String> {
    let base_url = normalize_text_option(Some(raw)).ok_or_else(|| {
        ApiError::InvalidConfiguration("base URL must not be empty".to_string())
    })?;
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(ApiError::InvalidConfiguration(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}
