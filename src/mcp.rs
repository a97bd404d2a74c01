//! Model Context Protocol (MCP) server implementation
//!
//! This module runs the context gateway as a long-lived stdio MCP server.
//! It exposes:
//!
//! - Context tools: render a codebase as a prompt, inline or persisted to a file
//! - Question answering: submit codebase context plus a question to Gemini
//! - Git tools: working tree diff, branch diff, and log rendered by the engine
//!
//! Stdout carries the protocol; all logging goes to stderr and the log file.

mod tools;

pub use tools::ContextTools;

use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, instrument};

use crate::artifact::ArtifactWriter;
use crate::config::GatewayConfig;
use crate::engine;
use crate::error::{Error, Result};

/// Run the MCP server with the given configuration
///
/// Builds the context engine and artifact writer, registers the tool
/// handlers, and serves the protocol over stdin/stdout until the client
/// disconnects.
#[instrument(skip(config))]
pub async fn run(config: GatewayConfig) -> Result<()> {
    info!(engine = %config.engine_binary, "starting code2prompt MCP server");

    let engine = engine::default_engine(&config);
    let writer = ArtifactWriter::new(config.artifact_dir.clone());
    let tools = ContextTools::new(engine, writer);

    let service = tools
        .serve(stdio())
        .await
        .map_err(|e| Error::Service(format!("Failed to start MCP server: {e}")))?;

    info!("server listening for tool invocations");
    service
        .waiting()
        .await
        .map_err(|e| Error::Service(format!("MCP server task failed: {e}")))?;

    Ok(())
}
