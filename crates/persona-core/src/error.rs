use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for the capability bridge.
#[derive(Error, Debug)]
pub enum PersonaError {
    // ── Discovery errors ───────────────────────────────────────
    #[error("plugin discovery failed: {}: {reason}", root.display())]
    Discovery { root: PathBuf, reason: String },

    // ── Loader errors ──────────────────────────────────────────
    #[error("failed to load plugin {plugin}: {reason}: {detail}")]
    Load {
        plugin: String,
        reason: LoadErrorReason,
        detail: String,
    },

    #[error("plugin error: {plugin}: {reason}")]
    Plugin { plugin: String, reason: String },

    // ── Adapter errors ─────────────────────────────────────────
    #[error("io error ({kind}): {message}")]
    Io { kind: IoErrorKind, message: String },

    // ── Gateway errors ─────────────────────────────────────────
    #[error("invalid action: {0}")]
    InvalidAction(String),

    #[error("gateway unreachable: {0}")]
    GatewayTransport(String),

    #[error("gateway returned failure: {0}")]
    GatewayResponse(String),

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Why a plugin could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorReason {
    /// The module imports or exports something the capability contract does not allow.
    IncompatibleContract,
    /// Reading, compiling or instantiating the module failed.
    InstantiationFailed,
    /// The requested execution path is not available in this runtime.
    EnvironmentUnsupported,
}

impl std::fmt::Display for LoadErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LoadErrorReason::IncompatibleContract => "incompatible contract",
            LoadErrorReason::InstantiationFailed => "instantiation failed",
            LoadErrorReason::EnvironmentUnsupported => "environment unsupported",
        };
        f.write_str(s)
    }
}

/// Classification of host I/O failures, preserved across both adapter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IoErrorKind {
    NotFound,
    PermissionDenied,
    Other,
}

impl std::fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IoErrorKind::NotFound => "not found",
            IoErrorKind::PermissionDenied => "permission denied",
            IoErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

impl From<std::io::ErrorKind> for IoErrorKind {
    fn from(kind: std::io::ErrorKind) -> Self {
        match kind {
            std::io::ErrorKind::NotFound => IoErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => IoErrorKind::PermissionDenied,
            _ => IoErrorKind::Other,
        }
    }
}

impl From<std::io::Error> for PersonaError {
    fn from(e: std::io::Error) -> Self {
        PersonaError::Io {
            kind: e.kind().into(),
            message: e.to_string(),
        }
    }
}

impl PersonaError {
    /// Shorthand for a [`PersonaError::Load`].
    pub fn load(plugin: impl Into<String>, reason: LoadErrorReason, detail: impl Into<String>) -> Self {
        PersonaError::Load {
            plugin: plugin.into(),
            reason,
            detail: detail.into(),
        }
    }

    /// The load failure reason, if this is a loader error.
    pub fn load_reason(&self) -> Option<LoadErrorReason> {
        match self {
            PersonaError::Load { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// The I/O kind, if this is an adapter I/O error.
    pub fn io_kind(&self) -> Option<IoErrorKind> {
        match self {
            PersonaError::Io { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PersonaError>;
