//! API Client — HTTP client for node → server communication
//!
//! Handles reading uploads, status reports and remote command polling.
//! Every request carries the static bearer token; 200/201 count as an
//! acknowledgment.

use crate::config::defaults::HTTP_TIMEOUT_SECS;
use crate::config::ApiConfig;
use crate::types::{RemoteCommand, StatusPayload};
use async_trait::async_trait;
use tracing::debug;

/// Uplink errors
#[derive(Debug, thiserror::Error)]
pub enum UplinkError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Server(reqwest::StatusCode),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Transport seam for reading delivery, so the coordinator can be exercised
/// against a mock without a network.
#[async_trait]
pub trait ReadingTransport: Send + Sync {
    /// Deliver one serialized reading. `Ok(())` means the server acknowledged
    /// it and the record may be retired.
    async fn send_reading(&self, record: &str) -> Result<(), UplinkError>;
}

/// HTTP client for the remote monitoring API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    readings_endpoint: String,
    status_endpoint: String,
    commands_endpoint: String,
    token: String,
}

impl ApiClient {
    /// Build a client from the API section of the node config.
    pub fn new(api: &ApiConfig) -> Result<Self, UplinkError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| UplinkError::ClientBuild(e.to_string()))?;

        Ok(Self {
            http,
            readings_endpoint: api.readings_endpoint.trim_end_matches('/').to_string(),
            status_endpoint: api.status_endpoint.trim_end_matches('/').to_string(),
            commands_endpoint: api.commands_endpoint.trim_end_matches('/').to_string(),
            token: api.token.clone(),
        })
    }

    /// Upload a status report.
    pub async fn post_status(&self, status: &StatusPayload) -> Result<(), UplinkError> {
        debug!(endpoint = %self.status_endpoint, "Posting status report");
        let resp = self
            .http
            .post(&self.status_endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .json(status)
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::OK | reqwest::StatusCode::CREATED => Ok(()),
            status => Err(UplinkError::Server(status)),
        }
    }

    /// Poll the remote command queue for this device.
    ///
    /// Normalization: 200 with an empty body or a literal `null` and 204 both
    /// mean "no commands" and yield an empty list; any other status is a
    /// transport failure.
    pub async fn poll_commands(&self, device_id: &str) -> Result<Vec<RemoteCommand>, UplinkError> {
        let url = format!("{}/{}", self.commands_endpoint, device_id);
        debug!(url = %url, "Polling remote commands");

        let resp = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        normalize_command_body(status, &body)
    }
}

#[async_trait]
impl ReadingTransport for ApiClient {
    async fn send_reading(&self, record: &str) -> Result<(), UplinkError> {
        debug!(endpoint = %self.readings_endpoint, bytes = record.len(), "Posting reading");
        let resp = self
            .http
            .post(&self.readings_endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            // The record is already serialized; it goes out verbatim.
            .body(record.to_string())
            .send()
            .await?;

        match resp.status() {
            reqwest::StatusCode::OK | reqwest::StatusCode::CREATED => Ok(()),
            status => Err(UplinkError::Server(status)),
        }
    }
}

/// Decode a command poll response body according to the API contract.
pub(crate) fn normalize_command_body(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<Vec<RemoteCommand>, UplinkError> {
    match status {
        reqwest::StatusCode::NO_CONTENT => Ok(Vec::new()),
        reqwest::StatusCode::OK => {
            let trimmed = body.trim();
            if trimmed.is_empty() || trimmed == "null" {
                return Ok(Vec::new());
            }
            let commands: Vec<RemoteCommand> = serde_json::from_str(trimmed)?;
            Ok(commands)
        }
        other => Err(UplinkError::Server(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_normalize_204_is_empty() {
        let cmds = normalize_command_body(StatusCode::NO_CONTENT, "").unwrap();
        assert!(cmds.is_empty());
    }

    #[test]
    fn test_normalize_200_empty_body_is_empty() {
        assert!(normalize_command_body(StatusCode::OK, "").unwrap().is_empty());
        assert!(normalize_command_body(StatusCode::OK, "  ").unwrap().is_empty());
    }

    #[test]
    fn test_normalize_200_literal_null_is_empty() {
        assert!(normalize_command_body(StatusCode::OK, "null")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_normalize_200_array_parses() {
        let body = r#"[{"comando":"silenciar_buzzer","duracao_ms":1000},{"comando":"reativar_buzzer"}]"#;
        let cmds = normalize_command_body(StatusCode::OK, body).unwrap();
        assert_eq!(cmds.len(), 2);
        assert_eq!(cmds[0].comando, "silenciar_buzzer");
        assert_eq!(cmds[0].duracao_ms, Some(1000));
        assert_eq!(cmds[1].comando, "reativar_buzzer");
    }

    #[test]
    fn test_normalize_other_status_is_error() {
        let err = normalize_command_body(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, Err(UplinkError::Server(s)) if s.as_u16() == 500));
    }

    #[test]
    fn test_normalize_malformed_body_is_error() {
        let err = normalize_command_body(StatusCode::OK, "{not json");
        assert!(matches!(err, Err(UplinkError::Serialization(_))));
    }
}
