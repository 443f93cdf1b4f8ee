//! Coordinator discovery, registration and status reporting
//!
//! A worker registers once at startup against one of the configured
//! coordinator nodes and keeps the resulting session for its lifetime.
//!
//! # Protocol
//!
//! ```text
//!  worker                               coordinator node
//!    │  GET  /api/v1/converter/register      │
//!    │ ────────────────────────────────────▶ │
//!    │  {"token": "..."}                     │
//!    │ ◀──────────────────────────────────── │
//!    │                                       │
//!    │  POST /api/v1/converter/job           │
//!    │  Authorization: BEARER <token>        │
//!    │  {"job_id": "...", "status": "done"}  │
//!    │ ────────────────────────────────────▶ │
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use converter::coordinator::{ClientConfig, CoordinatorClient, CoordinatorSession, NodeDirectory};
//!
//! let client = CoordinatorClient::new(ClientConfig::default())?;
//! let mut directory = NodeDirectory::new(config.coordinator.nodes.clone())?;
//! let session = CoordinatorSession::register(&client, &mut directory, &metrics).await?;
//! ```

pub mod client;
pub mod directory;
pub mod session;

// Re-export main types
pub use client::{ClientConfig, ClientError, CoordinatorClient};
pub use directory::NodeDirectory;
pub use session::{CoordinatorSession, RegistrationError};
