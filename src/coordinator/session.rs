//! Coordinator registration with failover
//!
//! Registration walks the node directory round-robin until one node issues a
//! token. A node that fails once is not retried; reaching an already failed
//! node again means every node was tried and the worker cannot serve jobs.

use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::metrics::Metrics;
use crate::models::Node;

use super::client::{CoordinatorClient, CONVERTER_API_PATH};
use super::directory::NodeDirectory;

/// Authenticated session with the active coordinator.
///
/// Built once at startup and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct CoordinatorSession {
    base_url: String,
    token: String,
}

impl CoordinatorSession {
    /// Build a session for a node that issued `token`
    pub fn new(node: &Node, token: impl Into<String>) -> Self {
        Self {
            base_url: format!("http://{}{}", node.address(), CONVERTER_API_PATH),
            token: token.into(),
        }
    }

    /// Base URL of the converter API on the active coordinator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value of the `Authorization` header for status reports
    pub fn authorization(&self) -> String {
        format!("BEARER {}", self.token)
    }

    /// Register against the first reachable node in `directory`
    pub async fn register(
        client: &CoordinatorClient,
        directory: &mut NodeDirectory,
        metrics: &Metrics,
    ) -> Result<Self, RegistrationError> {
        let mut failed: HashSet<Node> = HashSet::with_capacity(directory.len());
        let mut attempted: Vec<String> = Vec::with_capacity(directory.len());

        loop {
            let node = directory.next_node().clone();

            if failed.contains(&node) {
                tracing::error!(attempted = ?attempted, "All coordinator nodes are down");
                return Err(RegistrationError::AllNodesDown { attempted });
            }

            tracing::debug!(node = %node, "Registering with coordinator node");

            match client.register(&node).await {
                Ok(response) => {
                    metrics.record_registration_attempt(node.address(), true);
                    let session = Self::new(&node, response.token);
                    tracing::info!(
                        node = %node,
                        base_url = %session.base_url,
                        "Registered with coordinator"
                    );
                    return Ok(session);
                }
                Err(e) => {
                    metrics.record_registration_attempt(node.address(), false);
                    tracing::warn!(node = %node, error = %e, "Registration failed, trying next node");
                    attempted.push(node.address().to_string());
                    failed.insert(node);
                }
            }
        }
    }
}

impl fmt::Debug for CoordinatorSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatorSession")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish()
    }
}

/// Registration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Every node in the directory failed once
    #[error("all nodes down (tried: {})", .attempted.join(", "))]
    AllNodesDown { attempted: Vec<String> },

    /// Directory had no nodes to try
    #[error("no coordinator nodes configured")]
    EmptyDirectory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_node() {
        let node = Node::parse("10.1.1.1:7000").unwrap();
        let session = CoordinatorSession::new(&node, "T");

        assert_eq!(session.base_url(), "http://10.1.1.1:7000/api/v1/converter");
        assert_eq!(session.token(), "T");
        assert_eq!(session.authorization(), "BEARER T");
    }

    #[test]
    fn test_debug_masks_token() {
        let node = Node::parse("host:1").unwrap();
        let session = CoordinatorSession::new(&node, "secret-token");
        let debug = format!("{session:?}");

        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("http://host:1/api/v1/converter"));
    }

    #[test]
    fn test_all_nodes_down_message() {
        let err = RegistrationError::AllNodesDown {
            attempted: vec!["a:1".into(), "b:2".into()],
        };
        assert_eq!(err.to_string(), "all nodes down (tried: a:1, b:2)");
    }
}
