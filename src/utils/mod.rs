//! Shared utilities: environment-backed configuration.

pub mod config;

pub use config::Config;
