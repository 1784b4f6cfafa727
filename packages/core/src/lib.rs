// Library root: exposes internal modules for integration tests in `tests/`.
// Production entry point remains `src/main.rs`.

pub mod api;
pub mod blink;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod services;
pub mod store;
pub mod validation;

// Startup plumbing used by the binary.
pub mod cli;
pub mod config;
pub mod logging;
