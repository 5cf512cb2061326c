// API module
//
// HTTP handlers and DTOs. Route modules expose `routes(state)` which the
// server merges into one router.

pub mod common;
pub mod door;
pub mod stats;

pub use common::{ErrorResponse, ListResponse};
