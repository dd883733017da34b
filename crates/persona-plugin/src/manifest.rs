use semver::Version;
use serde::{Deserialize, Serialize};

/// File name of the optional manifest inside a plugin directory.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Plugin manifest — optional `plugin.toml` alongside the module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginManifest {
    pub plugin: PluginMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginMeta {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub authors: Vec<String>,
    /// Module file name relative to the plugin directory.
    #[serde(default)]
    pub entry: Option<String>,
    /// BLAKE3 hash of the module file for integrity verification.
    #[serde(default)]
    pub checksum: Option<String>,
}

impl PluginManifest {
    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> persona_core::Result<Self> {
        toml::from_str(s).map_err(|e| persona_core::PersonaError::Plugin {
            plugin: "unknown".into(),
            reason: format!("failed to parse {MANIFEST_FILE}: {e}"),
        })
    }

    /// Get the semver version.
    pub fn semver(&self) -> Option<Version> {
        Version::parse(&self.plugin.version).ok()
    }

    /// Verify the module file integrity.
    pub fn verify_checksum(&self, module_bytes: &[u8]) -> bool {
        match &self.plugin.checksum {
            Some(expected) => {
                let actual = blake3::hash(module_bytes).to_hex().to_string();
                actual.eq_ignore_ascii_case(expected)
            }
            None => true, // No checksum = no verification
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_manifest() {
        let manifest = PluginManifest::from_toml(
            r#"
[plugin]
name = "demo"
version = "0.1.0"
"#,
        )
        .unwrap();
        assert_eq!(manifest.plugin.name, "demo");
        assert!(manifest.plugin.entry.is_none());
        assert_eq!(manifest.semver(), Some(Version::new(0, 1, 0)));
    }

    #[test]
    fn invalid_version_has_no_semver() {
        let manifest = PluginManifest::from_toml(
            r#"
[plugin]
name = "demo"
version = "latest"
"#,
        )
        .unwrap();
        assert!(manifest.semver().is_none());
    }

    #[test]
    fn checksum_verification() {
        let bytes = b"(module)";
        let good = blake3::hash(bytes).to_hex().to_string();
        let manifest = PluginManifest::from_toml(&format!(
            "[plugin]\nname = \"c\"\nversion = \"1.0.0\"\nchecksum = \"{good}\"\n"
        ))
        .unwrap();
        assert!(manifest.verify_checksum(bytes));
        assert!(!manifest.verify_checksum(b"tampered"));
    }

    #[test]
    fn no_checksum_passes() {
        let manifest =
            PluginManifest::from_toml("[plugin]\nname = \"c\"\nversion = \"1.0.0\"\n").unwrap();
        assert!(manifest.verify_checksum(b"anything"));
    }

    #[test]
    fn missing_plugin_table_errors() {
        assert!(PluginManifest::from_toml("name = \"x\"").is_err());
    }
}
