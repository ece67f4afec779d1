//! Infrastructure layer for the view proof service
//!
//! Contains trait definitions and implementations for:
//! - View and proof storage (PostgreSQL, in-memory)
//! - External collaborators (ZK prover, proof verifier, view-count reader)
//! - Retry with backoff for transient database failures

mod error;
mod memory;
pub mod postgres;
mod retry;
mod traits;

pub use error::*;
pub use memory::MemoryStore;
pub use postgres::{PgProofStore, PgViewStore};
pub use retry::{is_retryable_db_error, Retry, RetryConfig, RetryResult};
pub use traits::*;
