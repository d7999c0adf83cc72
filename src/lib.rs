pub mod config;
pub mod constants;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;

// Layered boundaries for application and infrastructure
pub mod app;
pub mod infra;
