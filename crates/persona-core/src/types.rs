use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unique identifier for a plugin (its directory name).
pub type PluginId = String;

/// One installed plugin, as found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub id: PluginId,
    pub source_path: PathBuf,
}

/// How a plugin's capability calls are satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPath {
    /// Imports bound to in-process host adapters.
    DirectBinary,
    /// Imports proxied to the capability gateway over HTTP.
    GatewayFallback,
}

impl std::fmt::Display for ExecutionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionPath::DirectBinary => f.write_str("direct_binary"),
            ExecutionPath::GatewayFallback => f.write_str("gateway_fallback"),
        }
    }
}

/// What the current runtime can do. Injected rather than probed so that path
/// selection is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeEnvironment {
    /// Plugin imports may be bound to in-process host adapters.
    pub direct_binary: bool,
    /// Base URL of a capability gateway, e.g. `http://127.0.0.1:3710`.
    pub gateway_url: Option<String>,
}

impl RuntimeEnvironment {
    /// Path a process with this environment uses for the whole session.
    pub fn default_path(&self) -> ExecutionPath {
        if self.direct_binary {
            ExecutionPath::DirectBinary
        } else {
            ExecutionPath::GatewayFallback
        }
    }

    pub fn supports(&self, path: ExecutionPath) -> bool {
        match path {
            ExecutionPath::DirectBinary => self.direct_binary,
            ExecutionPath::GatewayFallback => self.gateway_url.is_some(),
        }
    }
}

/// One telemetry snapshot. Fields are sampled independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    pub cpu_load: [f64; 3],
    pub free_memory: u64,
    pub total_memory: u64,
}
