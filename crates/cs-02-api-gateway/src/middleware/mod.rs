//! Middleware for the API Gateway.
//!
//! Layer order: Request → Trace → Timeout → CORS → BodyLimit → Handler

pub mod cors;

pub use cors::create_cors_layer;
