//! Gateway configuration
//!
//! Runtime knobs for the server: which engine binary to launch and where
//! context artifacts land. Values come from the environment and can be
//! overridden per-flag by the CLI.

use std::path::PathBuf;

/// Environment variable naming the code2prompt binary
pub const ENGINE_BIN_ENV: &str = "CODE2PROMPT_BIN";

/// Environment variable overriding the artifact directory
pub const ARTIFACT_DIR_ENV: &str = "CODE2PROMPT_MCP_ARTIFACT_DIR";

/// Configuration for the gateway process
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Name or path of the code2prompt binary (subprocess strategy only)
    pub engine_binary: String,

    /// Directory for context artifacts; the system temp dir when unset
    pub artifact_dir: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            engine_binary: "code2prompt".to_string(),
            artifact_dir: None,
        }
    }
}

impl GatewayConfig {
    /// Builds a configuration from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(bin) = std::env::var(ENGINE_BIN_ENV) {
            if !bin.trim().is_empty() {
                config.engine_binary = bin;
            }
        }
        if let Ok(dir) = std::env::var(ARTIFACT_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.artifact_dir = Some(PathBuf::from(dir));
            }
        }
        config
    }
}
