//! Access-control device API client
//!
//! Pages through the device's event search endpoint with HTTP Digest
//! authentication. A failed page or an expired deadline ends the fetch;
//! whatever was collected before that is still returned.

use chrono::FixedOffset;
use digest_auth::{AuthContext, WwwAuthenticateHeader};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::types::{
    AcsEventCond, AcsEventRecord, AcsEventRequest, AcsEventResponse, DeviceTarget, SEARCH_ID,
};
use attsync_common::TimeWindow;

/// Path and query of the event search endpoint (also the digest URI)
pub const ACS_EVENT_PATH: &str = "/ISAPI/AccessControl/AcsEvent?format=json";

/// Device client errors
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Device returned HTTP {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Deadline reached after {0} pages")]
    DeadlineExceeded(u64),
}

/// Result of paging through one search window
#[derive(Debug, Default)]
pub struct DeviceFetch {
    pub records: Vec<AcsEventRecord>,
    pub pages_fetched: u64,
    /// Last `totalMatches` reported by the device
    pub total_matches: u64,
    /// Set when a request failed and the loop stopped early
    pub error: Option<DeviceError>,
}

/// Client for one device
pub struct DeviceClient {
    http_client: reqwest::Client,
    target: DeviceTarget,
    page_size: u64,
    /// Digest challenge from the last 401, reused so the nonce count advances
    challenge: Option<WwwAuthenticateHeader>,
    deadline: Option<Instant>,
}

impl DeviceClient {
    pub fn new(
        target: DeviceTarget,
        page_size: u32,
        request_timeout: Duration,
    ) -> Result<Self, DeviceError> {
        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| DeviceError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            target,
            page_size: u64::from(page_size.max(1)),
            challenge: None,
            deadline: None,
        })
    }

    /// Stop paging at `deadline`, keeping the pages already fetched
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}{}", self.target.device_ip, ACS_EVENT_PATH)
    }

    pub fn target(&self) -> &DeviceTarget {
        &self.target
    }

    /// Fetch every event in the window, one page at a time
    pub async fn fetch_all_events(&mut self, window: &TimeWindow, offset: FixedOffset) -> DeviceFetch {
        let start_time = window.device_start(offset);
        let end_time = window.device_end(offset);
        let mut fetch = DeviceFetch::default();
        let mut position: u64 = 0;

        loop {
            let cond = AcsEventCond {
                search_id: SEARCH_ID.to_string(),
                search_result_position: position,
                max_results: self.page_size,
                major: self.target.major,
                minor: self.target.minor,
                start_time: start_time.clone(),
                end_time: end_time.clone(),
            };

            let result = match self.deadline {
                Some(deadline) if Instant::now() >= deadline => {
                    Err(DeviceError::DeadlineExceeded(fetch.pages_fetched))
                }
                Some(deadline) => tokio::time::timeout_at(deadline, self.search_page(cond))
                    .await
                    .unwrap_or(Err(DeviceError::DeadlineExceeded(fetch.pages_fetched))),
                None => self.search_page(cond).await,
            };

            let response = match result {
                Ok(response) => response,
                Err(e) => {
                    warn!(
                        device = %self.target.device_ip,
                        position,
                        error = %e,
                        "Event search failed, stopping fetch"
                    );
                    fetch.error = Some(e);
                    break;
                }
            };

            let Some(page) = response.acs_event else {
                debug!(device = %self.target.device_ip, position, "Response has no AcsEvent block");
                break;
            };

            fetch.pages_fetched += 1;
            fetch.total_matches = page.total_matches.unwrap_or(0);
            if let Some(records) = page.info_list {
                fetch.records.extend(records);
            }

            position += self.page_size;
            if position >= fetch.total_matches {
                break;
            }
        }

        info!(
            device = %self.target.device_ip,
            pages = fetch.pages_fetched,
            records = fetch.records.len(),
            total_matches = fetch.total_matches,
            "Fetched attendance events"
        );

        fetch
    }

    /// POST one page of the search
    ///
    /// Answers at most one digest challenge per call.
    pub async fn search_page(&mut self, cond: AcsEventCond) -> Result<AcsEventResponse, DeviceError> {
        let payload = serde_json::to_vec(&AcsEventRequest { cond })
            .map_err(|e| DeviceError::ParseError(e.to_string()))?;
        let url = self.endpoint();

        for attempt in 0..2 {
            let mut request = self
                .http_client
                .post(&url)
                .header(CONTENT_TYPE, "application/json")
                .body(payload.clone());

            if let Some(authorization) = self.authorization(&payload)? {
                request = request.header(AUTHORIZATION, authorization);
            }

            let response = request
                .send()
                .await
                .map_err(|e| DeviceError::NetworkError(e.to_string()))?;

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && attempt == 0 {
                let header = response
                    .headers()
                    .get(WWW_AUTHENTICATE)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        DeviceError::AuthError("401 without a WWW-Authenticate challenge".to_string())
                    })?;
                let challenge = digest_auth::parse(header)
                    .map_err(|e| DeviceError::AuthError(e.to_string()))?;
                debug!(device = %self.target.device_ip, "Received digest challenge");
                self.challenge = Some(challenge);
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                self.challenge = None;
                return Err(DeviceError::AuthError(format!(
                    "credentials for user '{}' rejected",
                    self.target.device_user
                )));
            }

            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                return Err(DeviceError::ApiError(status.as_u16(), error_text));
            }

            return response
                .json::<AcsEventResponse>()
                .await
                .map_err(|e| DeviceError::ParseError(e.to_string()));
        }

        Err(DeviceError::AuthError("digest challenge was not accepted".to_string()))
    }

    /// Authorization header for the cached challenge, if any
    fn authorization(&mut self, payload: &[u8]) -> Result<Option<String>, DeviceError> {
        let Some(challenge) = self.challenge.as_mut() else {
            return Ok(None);
        };

        let context = AuthContext::new_post(
            self.target.device_user.as_str(),
            self.target.device_user_password.as_str(),
            ACS_EVENT_PATH,
            Some(payload),
        );

        let answer = challenge
            .respond(&context)
            .map_err(|e| DeviceError::AuthError(e.to_string()))?;

        Ok(Some(answer.to_header_string()))
    }
}
