//! HTTP client for the coordinator API
//!
//! This module provides the two calls a worker makes against a coordinator:
//! registration (token issue) and job status reporting.

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::models::{JobOutcome, Node};

use super::session::CoordinatorSession;

/// Path appended to a node address to reach the converter API
pub const CONVERTER_API_PATH: &str = "/api/v1/converter";

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for the coordinator client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Timeout for a registration request
    pub register_timeout: Duration,

    /// Timeout for a status report
    pub report_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            register_timeout: Duration::from_secs(10),
            report_timeout: Duration::from_secs(5),
        }
    }
}

impl ClientConfig {
    /// Set registration timeout
    pub fn with_register_timeout(mut self, timeout: Duration) -> Self {
        self.register_timeout = timeout;
        self
    }

    /// Set report timeout
    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = timeout;
        self
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Registration response body
#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub token: String,
}

// ============================================================================
// Coordinator Client
// ============================================================================

/// Client for communicating with coordinator nodes
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    config: ClientConfig,
    http_client: Client,
}

impl CoordinatorClient {
    /// Create a new coordinator client
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http_client = Client::builder()
            .user_agent(concat!("converter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Request a token from a coordinator node.
    ///
    /// Single attempt: failover across nodes is the caller's concern.
    pub async fn register(&self, node: &Node) -> Result<RegisterResponse, ClientError> {
        let url = format!("http://{}{}/register", node.address(), CONVERTER_API_PATH);

        let response = self
            .http_client
            .get(&url)
            .timeout(self.config.register_timeout)
            .send()
            .await
            .map_err(|e| ClientError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: RegisterResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))?;

        if body.token.is_empty() {
            return Err(ClientError::InvalidResponse(
                "Missing token in registration response".to_string(),
            ));
        }

        Ok(body)
    }

    /// Send a job outcome to the active coordinator.
    ///
    /// Best-effort single attempt bounded by the report timeout.
    pub async fn report(
        &self,
        session: &CoordinatorSession,
        outcome: &JobOutcome,
    ) -> Result<(), ClientError> {
        let url = format!("{}/job", session.base_url());

        let response = self
            .http_client
            .post(&url)
            .header(AUTHORIZATION, session.authorization())
            .timeout(self.config.report_timeout)
            .json(outcome)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(self.config.report_timeout)
                } else {
                    ClientError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpError {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Client Errors
// ============================================================================

/// Client errors
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error ({status}): {message}")]
    HttpError { status: u16, message: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether the coordinator rejected our credentials
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::HttpError { status, .. }
                if *status == StatusCode::UNAUTHORIZED.as_u16()
                    || *status == StatusCode::FORBIDDEN.as_u16()
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
