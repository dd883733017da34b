//! # persona-cli
//!
//! Command-line interface for the Persona plugin bridge.
//!
//! ## Commands
//!
//! - `persona serve` — Run the capability gateway
//! - `persona plugin` — List, inspect and call installed plugins
//! - `persona fs` — Read and write files through the host adapters
//! - `persona status` — Show host telemetry
//! - `persona config` — Show configuration

pub mod commands;

pub use commands::Cli;
