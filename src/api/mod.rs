//! REST API layer for the view proof service.

mod error;
pub mod handlers;
mod rest;
pub mod types;

pub use error::*;
pub use rest::*;
