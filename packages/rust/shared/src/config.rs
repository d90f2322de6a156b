//! Application configuration for SIL Inspector.
//!
//! User config lives at `~/.silinspector/silinspector.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SilInspectorError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "silinspector.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".silinspector";

// ---------------------------------------------------------------------------
// Config structs (matching silinspector.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// External tool locations.
    #[serde(default)]
    pub toolchain: ToolchainConfig,

    /// Process execution policy.
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[toolchain]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Compiler front end executable.
    #[serde(default = "default_compiler")]
    pub compiler: String,

    /// Symbol demangler executable.
    #[serde(default = "default_demangler")]
    pub demangler: String,

    /// Module name passed alongside `-parse-as-library`.
    #[serde(default = "default_module_name")]
    pub module_name: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: default_compiler(),
            demangler: default_demangler(),
            module_name: default_module_name(),
        }
    }
}

fn default_compiler() -> String {
    "swiftc".into()
}
fn default_demangler() -> String {
    "swift-demangle".into()
}
fn default_module_name() -> String {
    "SILInspectorWeb".into()
}

/// How registry entries are scheduled within one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// One program at a time, in registry order.
    #[default]
    Sequential,
    /// Every entry on its own task; results still reported in registry order.
    Parallel,
}

/// `[execution]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Per-invocation time limit in seconds. 0 disables the limit.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Scheduling of registry entries.
    #[serde(default)]
    pub mode: ExecutionMode,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            mode: ExecutionMode::default(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address.
    #[serde(default = "default_addr")]
    pub addr: String,

    /// Directory holding the built front end (`index.html`, `assets/`).
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            static_dir: default_static_dir(),
        }
    }
}

fn default_addr() -> String {
    "127.0.0.1:8000".into()
}
fn default_static_dir() -> String {
    "static".into()
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Compiler front end executable.
    pub compiler: String,
    /// Demangler executable.
    pub demangler: String,
    /// Module name for library parsing.
    pub module_name: String,
    /// Per-invocation time limit, `None` for unlimited.
    pub timeout: Option<Duration>,
    /// Scheduling of registry entries.
    pub mode: ExecutionMode,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let timeout = match config.execution.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            compiler: config.toolchain.compiler.clone(),
            demangler: config.toolchain.demangler.clone(),
            module_name: config.toolchain.module_name.clone(),
            timeout,
            mode: config.execution.mode,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.silinspector/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SilInspectorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.silinspector/silinspector.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SilInspectorError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        SilInspectorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| SilInspectorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| SilInspectorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SilInspectorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("swift-demangle"));
        assert!(toml_str.contains("mode = \"sequential\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.toolchain.compiler, "swiftc");
        assert_eq!(parsed.toolchain.module_name, "SILInspectorWeb");
        assert_eq!(parsed.execution.timeout_secs, 60);
        assert_eq!(parsed.server.addr, "127.0.0.1:8000");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[toolchain]
compiler = "/opt/swift/usr/bin/swiftc"

[execution]
mode = "parallel"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.toolchain.compiler, "/opt/swift/usr/bin/swiftc");
        assert_eq!(config.toolchain.demangler, "swift-demangle");
        assert_eq!(config.execution.mode, ExecutionMode::Parallel);
        assert_eq!(config.execution.timeout_secs, 60);
        assert_eq!(config.server.static_dir, "static");
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let toml_str = "[execution]\nmode = \"eventually\"\n";
        assert!(toml::from_str::<AppConfig>(toml_str).is_err());
    }

    #[test]
    fn pipeline_config_from_app_config() {
        let mut app = AppConfig::default();
        let pipeline = PipelineConfig::from(&app);
        assert_eq!(pipeline.timeout, Some(Duration::from_secs(60)));
        assert_eq!(pipeline.mode, ExecutionMode::Sequential);

        app.execution.timeout_secs = 0;
        assert_eq!(PipelineConfig::from(&app).timeout, None);
    }

    #[test]
    fn missing_config_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/silinspector.toml")).unwrap_err();
        assert!(matches!(err, SilInspectorError::Io { .. }));
    }
}
