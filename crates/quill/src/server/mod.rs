//! REST API for the query engine
//!
//! Provides HTTP endpoints over a shared `QueryEngine`. Uses axum for routing
//! and schemars for OpenAPI documentation generation.

pub mod handlers;
pub mod middleware;
pub mod routing;
pub mod server;
pub mod types;

pub use routing::create_router;
pub use server::start_server;
