//! Cross-crate integration tests.

pub mod flows;
pub mod http_api;
pub mod persistence;
