//! Application layer for the Composition Engine

pub mod service;

#[cfg(test)]
mod properties;

pub use service::CompositionService;
