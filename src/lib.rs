//! View Proof Service Library
//!
//! Counts asset views with per-viewer cooldown deduplication and issues
//! verifiable proofs that an asset reached a given view count.
//!
//! ## Modules
//!
//! - [`domain`] - Core domain types (assets, views, proofs, statistics)
//! - [`infra`] - Errors, store traits, PostgreSQL and in-memory stores, retry
//! - [`views`] - Cooldown-based view deduplication
//! - [`proofs`] - Proof generation, witness verification, reconciliation
//! - [`metrics`] - In-process counters and histograms
//! - [`api`] - REST API routes
//! - [`server`] - Configuration, wiring and HTTP server

pub mod api;
pub mod domain;
pub mod infra;
pub mod metrics;
pub mod migrations;
pub mod proofs;
pub mod server;
pub mod views;

// Re-export commonly used types
pub use domain::{AssetId, Fingerprint, ProofRecord, ProofResult, RecordViewOutcome};

pub use infra::{ProofStore, Result, ServiceError, ViewStore};
