//! # code2prompt MCP server
//!
//! Binary entry point for the context gateway. Parses flags, loads a local
//! `.env` if present, installs logging (stderr plus a log file; stdout is
//! reserved for the protocol), and serves the MCP tools over stdio until
//! the client disconnects.
//!
//! ## Flags
//!
//! - `--engine-bin`: code2prompt binary to spawn (also `CODE2PROMPT_BIN`)
//! - `--artifact-dir`: where context artifacts are written (also
//!   `CODE2PROMPT_MCP_ARTIFACT_DIR`)
//! - `--log-dir`: where the server log file goes

mod telemetry;

use std::path::PathBuf;

use clap::Parser;

use code2prompt_mcp::config::GatewayConfig;

#[derive(Parser)]
#[command(author, version, about = "MCP server exposing codebase context via code2prompt", long_about = None)]
struct Cli {
    /// Name or path of the code2prompt binary to spawn
    #[arg(long)]
    engine_bin: Option<String>,

    /// Directory for context artifact files (default: a subfolder of the system temp dir)
    #[arg(long)]
    artifact_dir: Option<PathBuf>,

    /// Directory for the server log file (default: a subfolder of the system temp dir)
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up GEMINI_API_KEY and friends from a local .env if present
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let log_dir = cli
        .log_dir
        .unwrap_or_else(|| std::env::temp_dir().join("code2prompt-mcp"));
    telemetry::setup_logging(&log_dir)?;

    let mut config = GatewayConfig::from_env();
    if let Some(bin) = cli.engine_bin {
        config.engine_binary = bin;
    }
    if cli.artifact_dir.is_some() {
        config.artifact_dir = cli.artifact_dir;
    }

    code2prompt_mcp::mcp::run(config).await?;

    Ok(())
}
