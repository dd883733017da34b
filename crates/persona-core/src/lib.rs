//! # persona-core
//!
//! Shared vocabulary of the plugin capability bridge: the error taxonomy, the
//! capability contract plugins import, the adapter trait that satisfies it,
//! and the JSON shapes spoken by the capability gateway.

pub mod contract;
pub mod error;
pub mod types;
pub mod wire;

pub use contract::{CONTRACT, CapabilitySlot, HostAdapterSet, Signature, WasmType, greeting};
pub use error::{IoErrorKind, LoadErrorReason, PersonaError, Result};
pub use types::*;
