// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the managed service's control API.
//!
//! The reconciler touches the running service through exactly two
//! operations: offline validation of a candidate document, and a reload that
//! makes the persisted configuration live. Both are bounded by an explicit
//! timeout; there is no in-cycle retry, because the next scheduled tick
//! re-observes current state anyway.

use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde_json::json;
use tracing::debug;

use crate::constants::{CONTROL_CHECK_PATH, CONTROL_RELOAD_PATH, CONTROL_TIMEOUT_SECS};
use crate::errors::ControlError;

/// Build the API base URL from a configured endpoint.
///
/// Accepts `host:port` or a full `http(s)://` URL; trailing slashes are
/// stripped so paths concatenate cleanly.
#[must_use]
pub fn build_api_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", endpoint.trim_end_matches('/'))
    }
}

/// Client for the managed service's control interface.
#[derive(Debug, Clone)]
pub struct ServiceControl {
    http: HttpClient,
    base_url: String,
}

impl ServiceControl {
    /// Create a control client for the given endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(endpoint: &str) -> Result<Self, ControlError> {
        let base_url = build_api_url(endpoint);
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(CONTROL_TIMEOUT_SECS))
            .build()
            .map_err(|e| ControlError::Unreachable {
                endpoint: base_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { http, base_url })
    }

    /// The normalized base URL this client talks to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.base_url
    }

    /// Submit a candidate document to the service's syntax/semantic checker.
    ///
    /// # Errors
    ///
    /// [`ControlError::ValidationRejected`] when the checker refuses the
    /// document, [`ControlError::Unreachable`] on transport failure.
    pub async fn validate_config(&self, document: &str) -> Result<(), ControlError> {
        let url = format!("{}{CONTROL_CHECK_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "config": document }))
            .send()
            .await
            .map_err(|e| ControlError::Unreachable {
                endpoint: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                debug!("candidate configuration validated");
                Ok(())
            }
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                Err(ControlError::ValidationRejected {
                    endpoint: self.base_url.clone(),
                    diagnostic: body,
                })
            }
            other => Err(ControlError::UnexpectedResponse {
                endpoint: self.base_url.clone(),
                status: other.as_u16(),
                body,
            }),
        }
    }

    /// Signal the service to reload the persisted configuration.
    ///
    /// # Errors
    ///
    /// [`ControlError::ReloadRejected`] when the service refuses the reload,
    /// [`ControlError::Unreachable`] on transport failure or timeout.
    pub async fn reload(&self) -> Result<(), ControlError> {
        let url = format!("{}{CONTROL_RELOAD_PATH}", self.base_url);
        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| ControlError::Unreachable {
                endpoint: self.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::OK | StatusCode::NO_CONTENT => {
                debug!("service reloaded");
                Ok(())
            }
            other if other.is_client_error() || other.is_server_error() => {
                Err(ControlError::ReloadRejected {
                    endpoint: self.base_url.clone(),
                    diagnostic: format!("HTTP {}: {body}", other.as_u16()),
                })
            }
            other => Err(ControlError::UnexpectedResponse {
                endpoint: self.base_url.clone(),
                status: other.as_u16(),
                body,
            }),
        }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod control_tests;
