//! # persona-plugin
//!
//! WebAssembly plugin host for the capability bridge. Plugins are WASM
//! modules whose imports are restricted to the capability contract; the host
//! binds those imports either to in-process adapters (direct binary) or to a
//! capability gateway over HTTP (gateway fallback).
//!
//! ## Plugin Layout
//!
//! Each plugin is a directory under the plugin root. The module is
//! `<id>.wasm` / `<id>.wat`, or named by an optional `plugin.toml`:
//!
//! ```toml
//! [plugin]
//! name = "demo"
//! version = "0.1.0"
//! description = "Greets and reads files through the host"
//! entry = "demo.wat"
//! ```

pub mod discovery;
pub mod gateway;
mod guest;
pub mod handle;
pub mod host;
pub mod local;
pub mod manifest;

pub use discovery::{discover_plugins, find_plugin};
pub use gateway::GatewayAdapterSet;
pub use handle::PluginHandle;
pub use host::{HostSettings, PluginHost};
pub use local::LocalAdapterSet;
pub use manifest::PluginManifest;
