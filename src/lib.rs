// ABOUTME: Library root for kiln - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod artifact;
pub mod build;
pub mod config;
pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod platform;
pub mod request;
pub mod rollout;
pub mod types;
