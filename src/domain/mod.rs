//! Domain models for the view proof service
//!
//! Plain data types for assets, view events, persisted proofs, and proof
//! generation statistics. No I/O lives here.

mod asset;
mod proof;
mod stats;
mod types;
mod zk;

pub use asset::*;
pub use proof::*;
pub use stats::*;
pub use types::*;
pub use zk::*;
