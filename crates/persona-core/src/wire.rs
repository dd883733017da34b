//! JSON bodies exchanged with the capability gateway.

use serde::{Deserialize, Serialize};

use crate::{IoErrorKind, PersonaError, SystemStatus};

/// Route of the filesystem endpoint.
pub const FILESYSTEM_ROUTE: &str = "/api/filesystem";
/// Route of the telemetry endpoint.
pub const SYSTEMINFO_ROUTE: &str = "/api/systeminfo";
/// Route of the plugin listing endpoint.
pub const PLUGINS_ROUTE: &str = "/api/plugins";
/// Route of the liveness endpoint.
pub const HEALTH_ROUTE: &str = "/health";

/// Filesystem actions the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsAction {
    ReadFile,
    WriteFile,
}

impl FsAction {
    pub fn as_str(self) -> &'static str {
        match self {
            FsAction::ReadFile => "readFile",
            FsAction::WriteFile => "writeFile",
        }
    }
}

impl std::str::FromStr for FsAction {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readFile" => Ok(FsAction::ReadFile),
            "writeFile" => Ok(FsAction::WriteFile),
            other => Err(PersonaError::InvalidAction(other.to_string())),
        }
    }
}

/// Body of `POST /api/filesystem`.
///
/// `action` stays a plain string on the wire so that unknown actions reach the
/// handler and get a `400` instead of a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemRequest {
    pub action: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl FilesystemRequest {
    pub fn read(path: &str) -> Self {
        Self {
            action: FsAction::ReadFile.as_str().into(),
            path: path.into(),
            content: None,
        }
    }

    pub fn write(path: &str, content: &str) -> Self {
        Self {
            action: FsAction::WriteFile.as_str().into(),
            path: path.into(),
            content: Some(content.into()),
        }
    }

    pub fn action(&self) -> crate::Result<FsAction> {
        self.action.parse()
    }
}

/// Response of `POST /api/filesystem`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<IoErrorKind>,
}

impl FilesystemResponse {
    pub fn data(data: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error_kind: None,
        }
    }

    pub fn message(message: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message),
            error_kind: None,
        }
    }

    pub fn failure(err: &PersonaError) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(err.to_string()),
            error_kind: err.io_kind(),
        }
    }

    /// Turn a failure response back into the error the adapter raised.
    pub fn into_error(self) -> PersonaError {
        let message = self.message.unwrap_or_else(|| "unknown gateway error".into());
        match self.error_kind {
            Some(kind) => PersonaError::Io { kind, message },
            None => PersonaError::GatewayResponse(message),
        }
    }
}

/// Response of `POST /api/systeminfo`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfoResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SystemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
