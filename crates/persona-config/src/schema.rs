use persona_core::{ExecutionPath, RuntimeEnvironment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration — maps to `persona.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    pub plugins: PluginsConfig,
    pub gateway: GatewayConfig,
    pub logging: LoggingConfig,
}

// ── Plugins ────────────────────────────────────────────────────

/// Which execution path the loader uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Derive the path from the runtime environment.
    #[default]
    Auto,
    DirectBinary,
    GatewayFallback,
}

impl std::str::FromStr for ExecutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ExecutionPolicy::Auto),
            "direct_binary" | "direct" => Ok(ExecutionPolicy::DirectBinary),
            "gateway_fallback" | "gateway" => Ok(ExecutionPolicy::GatewayFallback),
            other => Err(format!("unknown execution path '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Directory containing one subdirectory per installed plugin.
    pub plugin_dir: PathBuf,
    /// Execution path selection.
    pub execution_path: ExecutionPolicy,
    /// Whether this runtime can bind plugin imports to in-process adapters.
    pub direct_binary: bool,
    /// Fuel granted to each guest call (prevents runaway loops).
    pub fuel: u64,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            execution_path: ExecutionPolicy::Auto,
            direct_binary: true,
            fuel: 10_000_000,
        }
    }
}

// ── Gateway ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listen address of the capability gateway server.
    pub listen: String,
    /// Base URL the gateway adapter set sends requests to. Defaults to the
    /// local listen address when unset.
    pub url: Option<String>,
    /// Enable permissive CORS (browser callers on another origin).
    pub cors: bool,
    /// Per-request timeout for gateway adapter calls.
    pub timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:3710".into(),
            url: None,
            cors: false,
            timeout_secs: 10,
        }
    }
}

impl GatewayConfig {
    /// URL used by gateway adapters: explicit `url`, else the listen address.
    pub fn effective_url(&self) -> String {
        match &self.url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.listen),
        }
    }
}

// ── Logging ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Output format: "pretty" or "json".
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
        }
    }
}

impl PersonaConfig {
    /// The runtime environment this config describes.
    pub fn environment(&self) -> RuntimeEnvironment {
        RuntimeEnvironment {
            direct_binary: self.plugins.direct_binary,
            gateway_url: Some(self.gateway.effective_url()),
        }
    }

    /// The execution path the loader should use for this session.
    pub fn execution_path(&self) -> ExecutionPath {
        match self.plugins.execution_path {
            ExecutionPolicy::Auto => self.environment().default_path(),
            ExecutionPolicy::DirectBinary => ExecutionPath::DirectBinary,
            ExecutionPolicy::GatewayFallback => ExecutionPath::GatewayFallback,
        }
    }
}

// ── Validation ─────────────────────────────────────────────────

/// A single config validation issue.
#[derive(Debug)]
pub struct ConfigWarning {
    pub field: String,
    pub message: String,
    pub severity: WarningSeverity,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let icon = match self.severity {
            WarningSeverity::Error => "❌",
            WarningSeverity::Warning => "⚠️ ",
            WarningSeverity::Info => "💡",
        };
        write!(f, "{} {}: {}", icon, self.field, self.message)?;
        if let Some(ref h) = self.hint {
            write!(f, "\n   ↳ {}", h)?;
        }
        Ok(())
    }
}

impl PersonaConfig {
    /// Validate the config and return a list of warnings.
    /// Returns `Err` with all messages joined if any severity is Error.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, String> {
        let mut warnings = Vec::new();

        // ── Fuel ───
        if self.plugins.fuel == 0 {
            warnings.push(ConfigWarning {
                field: "plugins.fuel".into(),
                message: "fuel is 0 — every plugin call would trap immediately".into(),
                severity: WarningSeverity::Error,
                hint: Some("Set to e.g. 10000000".into()),
            });
        }

        // ── Execution path ───
        if self.plugins.execution_path == ExecutionPolicy::DirectBinary && !self.plugins.direct_binary
        {
            warnings.push(ConfigWarning {
                field: "plugins.execution_path".into(),
                message: "direct_binary requested but plugins.direct_binary is false".into(),
                severity: WarningSeverity::Error,
                hint: Some("Use 'auto' or 'gateway_fallback', or enable plugins.direct_binary".into()),
            });
        }

        // ── Gateway URL ───
        if let Some(ref url) = self.gateway.url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                warnings.push(ConfigWarning {
                    field: "gateway.url".into(),
                    message: format!("'{url}' is not an http(s) URL"),
                    severity: WarningSeverity::Error,
                    hint: Some("e.g. http://127.0.0.1:3710".into()),
                });
            }
        }

        // ── Listen address ───
        if !self.gateway.listen.starts_with("127.0.0.1") && !self.gateway.listen.starts_with("localhost")
        {
            warnings.push(ConfigWarning {
                field: "gateway.listen".into(),
                message: format!(
                    "gateway listens on {} — any client that can reach it gets full filesystem access",
                    self.gateway.listen
                ),
                severity: WarningSeverity::Warning,
                hint: Some("Bind to 127.0.0.1 unless remote callers need it".into()),
            });
        }

        if self.gateway.timeout_secs == 0 {
            warnings.push(ConfigWarning {
                field: "gateway.timeout_secs".into(),
                message: "timeout is 0 — gateway calls never time out".into(),
                severity: WarningSeverity::Info,
                hint: None,
            });
        }

        // ── Logging ───
        let valid_formats = ["pretty", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            warnings.push(ConfigWarning {
                field: "logging.format".into(),
                message: format!("unknown log format '{}'", self.logging.format),
                severity: WarningSeverity::Warning,
                hint: Some(format!("Valid values: {}", valid_formats.join(", "))),
            });
        }

        // Check for hard errors
        let errors: Vec<String> = warnings
            .iter()
            .filter(|w| w.severity == WarningSeverity::Error)
            .map(|w| format!("{}: {}", w.field, w.message))
            .collect();

        if !errors.is_empty() {
            return Err(format!("Configuration errors:\n  • {}", errors.join("\n  • ")));
        }

        Ok(warnings)
    }
}
