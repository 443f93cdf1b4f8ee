//! Core data structures shared by the intake, the pipeline and the coordinator client

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Maximum accepted length of a job identifier
pub const MAX_JOB_ID_LEN: usize = 128;

// ============================================================================
// Job
// ============================================================================

/// A single conversion request received on the intake endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Identifier assigned by the submitter, also used to key temp files
    pub job_id: String,

    /// Location of the source media
    pub link: Url,
}

impl Job {
    /// Create a new job
    pub fn new(job_id: impl Into<String>, link: Url) -> Self {
        Self {
            job_id: job_id.into(),
            link,
        }
    }

    /// Check that the job can be safely executed.
    ///
    /// The job id ends up in a file name inside the work directory, so it must be a
    /// single plain path component.
    pub fn validate(&self) -> Result<(), JobValidationError> {
        validate_job_id(&self.job_id)?;

        match self.link.scheme() {
            "http" | "https" => Ok(()),
            other => Err(JobValidationError::UnsupportedScheme(other.to_string())),
        }
    }
}

fn validate_job_id(id: &str) -> Result<(), JobValidationError> {
    if id.is_empty() {
        return Err(JobValidationError::EmptyId);
    }

    if id.len() > MAX_JOB_ID_LEN {
        return Err(JobValidationError::IdTooLong(id.len()));
    }

    if id == "." || id == ".." {
        return Err(JobValidationError::InvalidId(id.to_string()));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.');
    if !id.chars().all(allowed) {
        return Err(JobValidationError::InvalidId(id.to_string()));
    }

    Ok(())
}

/// Reasons a job payload is rejected at intake
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobValidationError {
    #[error("job_id must not be empty")]
    EmptyId,

    #[error("job_id is {0} characters long (max {MAX_JOB_ID_LEN})")]
    IdTooLong(usize),

    #[error("job_id contains characters that are not allowed: {0}")]
    InvalidId(String),

    #[error("unsupported link scheme: {0}")]
    UnsupportedScheme(String),
}

// ============================================================================
// Node
// ============================================================================

/// A coordinator node address (`host:port`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Node {
    address: String,
}

impl Node {
    /// Parse a node from a `host:port` string
    pub fn parse(address: &str) -> Result<Self, NodeParseError> {
        let address = address.trim();

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| NodeParseError::MissingPort(address.to_string()))?;

        if host.is_empty() {
            return Err(NodeParseError::MissingHost(address.to_string()));
        }

        port.parse::<u16>()
            .map_err(|_| NodeParseError::InvalidPort(address.to_string()))?;

        Ok(Self {
            address: address.to_string(),
        })
    }

    /// The `host:port` string
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

impl FromStr for Node {
    type Err = NodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Node {
    type Error = NodeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Node> for String {
    fn from(node: Node) -> Self {
        node.address
    }
}

/// Errors parsing a node address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeParseError {
    #[error("node address '{0}' has no port")]
    MissingPort(String),

    #[error("node address '{0}' has no host")]
    MissingHost(String),

    #[error("node address '{0}' has an invalid port")]
    InvalidPort(String),
}

// ============================================================================
// Job Outcome
// ============================================================================

/// Terminal status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Done,
    Fail,
}

impl JobStatus {
    /// Status as sent to the coordinator
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Done => "done",
            Self::Fail => "fail",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status report body sent to the coordinator once a pipeline run ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
}

impl JobOutcome {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
        }
    }
}
