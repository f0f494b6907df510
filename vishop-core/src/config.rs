use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{Result, VishopError};

/// Default name of the package configuration file, both on disk and inside a bundle.
pub const CONFIG_FILENAME: &str = "vishop.json";

/// Script categories accepted by the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptType {
    #[serde(rename = "color scheme")]
    ColorScheme,
    #[serde(rename = "ftplugin")]
    Ftplugin,
    #[serde(rename = "game")]
    Game,
    #[serde(rename = "indent")]
    Indent,
    #[serde(rename = "syntax")]
    Syntax,
    #[serde(rename = "utility")]
    Utility,
    #[serde(rename = "patch")]
    Patch,
}

impl ScriptType {
    pub const ALL: [ScriptType; 7] = [
        ScriptType::ColorScheme,
        ScriptType::Ftplugin,
        ScriptType::Game,
        ScriptType::Indent,
        ScriptType::Syntax,
        ScriptType::Utility,
        ScriptType::Patch,
    ];

    /// The value submitted as `script_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptType::ColorScheme => "color scheme",
            ScriptType::Ftplugin => "ftplugin",
            ScriptType::Game => "game",
            ScriptType::Indent => "indent",
            ScriptType::Syntax => "syntax",
            ScriptType::Utility => "utility",
            ScriptType::Patch => "patch",
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptType {
    type Err = VishopError;

    fn from_str(s: &str) -> Result<Self> {
        ScriptType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| VishopError::Config(format!("unknown script type '{s}'")))
    }
}

/// The single source of truth for a plugin release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub script_type: ScriptType,
    /// Minimum Vim version.
    pub required: String,
    pub version: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_details: Option<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Accepted for compatibility; nothing acts on it.
    #[serde(default)]
    pub private: bool,
}

impl PackageConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let config: PackageConfig = serde_json::from_slice(bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(VishopError::Config("'name' must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(VishopError::Config("'version' must not be empty".into()));
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            name = %self.name,
            version = %self.version,
            script_type = %self.script_type,
            excludes_count = self.excludes.len(),
            "Loaded PackageConfig"
        );
        debug!(?self, "PackageConfig loaded (full debug)");
    }
}
