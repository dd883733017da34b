use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::schema::{ExecutionPolicy, PersonaConfig};

/// Loads and reloads the Persona configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<PersonaConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > PERSONA_CONFIG env > ~/.persona/persona.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("PERSONA_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".persona")
            .join("persona.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> persona_core::Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::parse_file(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            PersonaConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config — log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(persona_core::PersonaError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a read snapshot of the current config.
    pub fn get(&self) -> PersonaConfig {
        self.config.read().clone()
    }

    /// Get a shared reference for subscription.
    pub fn shared(&self) -> Arc<RwLock<PersonaConfig>> {
        Arc::clone(&self.config)
    }

    /// Path the config was loaded from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn parse_file(path: &Path) -> persona_core::Result<PersonaConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<PersonaConfig>(&raw).map_err(|e| {
            persona_core::PersonaError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply env var overrides (PERSONA_PLUGIN_DIR, PERSONA_GATEWAY_URL, etc.)
    fn apply_env_overrides(mut config: PersonaConfig) -> PersonaConfig {
        if let Ok(v) = std::env::var("PERSONA_PLUGIN_DIR") {
            config.plugins.plugin_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("PERSONA_EXECUTION_PATH") {
            match v.parse::<ExecutionPolicy>() {
                Ok(policy) => config.plugins.execution_path = policy,
                Err(e) => warn!(error = %e, "ignoring PERSONA_EXECUTION_PATH"),
            }
        }
        if let Ok(v) = std::env::var("PERSONA_GATEWAY_LISTEN") {
            config.gateway.listen = v;
        }
        if let Ok(v) = std::env::var("PERSONA_GATEWAY_URL") {
            config.gateway.url = Some(v);
        }
        if let Ok(v) = std::env::var("PERSONA_LOG_LEVEL") {
            config.logging.level = v;
        }
        config
    }

    /// Reload the config from disk. A file that fails to parse or validate
    /// leaves the current config in place.
    pub fn reload(&self) -> persona_core::Result<()> {
        if !self.config_path.exists() {
            return Err(persona_core::PersonaError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::parse_file(&self.config_path)?);
        new_config.validate().map_err(persona_core::PersonaError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
