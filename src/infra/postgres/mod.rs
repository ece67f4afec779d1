//! PostgreSQL implementations of the view and proof stores

mod proof_store;
mod view_store;

pub use proof_store::*;
pub use view_store::*;
