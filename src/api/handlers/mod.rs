//! REST API handlers organized by domain.

pub mod health;
pub mod proofs;
pub mod views;

pub use health::*;
pub use proofs::*;
pub use views::*;
