//! Activation request exchange.
//!
//! One POST per attempt, no retries. The response is classified into a
//! credential link or an [`ActivationError`]; error bodies from the server
//! are passed through untouched since they are already user-facing text.

use crate::config::TransportTimeouts;
use crate::error::{ActivationError, ActivationResult};
use async_trait::async_trait;
use codegate_types::{CredentialLink, DeviceId};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::error::Error as _;
use tracing::{debug, warn};

/// Content type of the activation request body.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

const USER_AGENT: &str = concat!("codegate/", env!("CARGO_PKG_VERSION"));

/// Body of an activation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationRequest {
    pub auth_code: String,
    pub device_id: DeviceId,
}

impl ActivationRequest {
    /// Builds a request, trimming the code.
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::Validation`] if the code is blank.
    pub fn new(code: &str, device_id: DeviceId) -> ActivationResult<Self> {
        let auth_code = code.trim();
        if auth_code.is_empty() {
            return Err(ActivationError::Validation);
        }
        Ok(Self {
            auth_code: auth_code.to_string(),
            device_id,
        })
    }
}

/// Performs the network exchange of an activation request.
#[async_trait]
pub trait ActivationTransport: Send + Sync {
    /// Sends `request` to `endpoint` and returns the credential link.
    async fn exchange(
        &self,
        endpoint: &str,
        request: &ActivationRequest,
    ) -> ActivationResult<CredentialLink>;
}

/// [`ActivationTransport`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::Config`] if the HTTP client cannot be built
    /// (e.g. the TLS backend fails to initialise).
    pub fn new(timeouts: TransportTimeouts) -> ActivationResult<Self> {
        let client = Client::builder()
            .timeout(timeouts.call())
            .connect_timeout(timeouts.connect())
            .read_timeout(timeouts.read())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ActivationError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Uses a preconfigured client.
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ActivationTransport for HttpTransport {
    async fn exchange(
        &self,
        endpoint: &str,
        request: &ActivationRequest,
    ) -> ActivationResult<CredentialLink> {
        let body = serde_json::to_vec(request)?;

        debug!("Sending activation request to {}", endpoint);

        let response = self
            .client
            .post(endpoint)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| ActivationError::Transport(describe(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ActivationError::Transport(describe(&e)))?;
        if !status.is_success() {
            warn!("Activation rejected with HTTP {}", status.as_u16());
        }
        classify_response(status, &text)
    }
}

/// Maps a status and body to the exchange outcome.
///
/// # Errors
///
/// - [`ActivationError::Server`] for non-success statuses, carrying the body
///   verbatim or `HTTP <status>` when the body is blank.
/// - [`ActivationError::Protocol`] when a success body is not a credential link.
pub fn classify_response(status: StatusCode, body: &str) -> ActivationResult<CredentialLink> {
    if !status.is_success() {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status.as_u16())
        } else {
            body.to_string()
        };
        return Err(ActivationError::Server(message));
    }

    CredentialLink::parse(body).map_err(|_| ActivationError::Protocol)
}

/// Describes a reqwest error including its root cause, which carries the
/// useful part ("Connection refused", "dns error", ...).
fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        return "request timed out".to_string();
    }
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
