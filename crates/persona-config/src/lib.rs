//! # persona-config
//!
//! Configuration for the Persona plugin bridge. Reads from `persona.toml`,
//! then applies environment variable overrides.

pub mod loader;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::PersonaConfig;
pub use schema::{ConfigWarning, ExecutionPolicy, WarningSeverity};
