//! Round-robin directory of coordinator nodes
//!
//! The directory owns its cursor, so each registration attempt works on an
//! independent, deterministic cycle through the configured nodes.

use std::collections::HashSet;

use crate::models::Node;

use super::session::RegistrationError;

/// Ordered, cyclable list of coordinator nodes
#[derive(Debug, Clone)]
pub struct NodeDirectory {
    nodes: Vec<Node>,
    cursor: usize,
}

impl NodeDirectory {
    /// Create a directory positioned at the first node.
    ///
    /// Repeated addresses keep only their first position, so one cycle visits
    /// every distinct node exactly once.
    pub fn new(nodes: Vec<Node>) -> Result<Self, RegistrationError> {
        let mut seen = HashSet::with_capacity(nodes.len());
        let nodes: Vec<Node> = nodes
            .into_iter()
            .filter(|node| seen.insert(node.clone()))
            .collect();

        if nodes.is_empty() {
            return Err(RegistrationError::EmptyDirectory);
        }

        Ok(Self { nodes, cursor: 0 })
    }

    /// Return the node under the cursor and advance, wrapping after the last node
    pub fn next_node(&mut self) -> &Node {
        let index = self.cursor;
        self.cursor = (self.cursor + 1) % self.nodes.len();
        &self.nodes[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
