//! Interface to the code2prompt context engine.
//!
//! The engine turns a directory tree into a single LLM-ready prompt. Two
//! strategies implement the same trait: a subprocess wrapper around the
//! `code2prompt` CLI (default) and an in-process binding to
//! `code2prompt-core` (cargo feature `embedded`). The strategy is fixed at
//! build time; request handling code only sees [`ContextEngine`].

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::GatewayConfig;
use crate::error::Result;

pub mod cli;
#[cfg(feature = "embedded")]
pub mod embedded;

/// Sort keys the engine understands.
pub const SORT_KEYS: &[&str] = &["name_asc", "name_desc", "date_asc", "date_desc"];

/// Parameters for a context generation run. Doubles as the MCP tool
/// parameter schema, so every field carries a description and a default
/// that matches the engine's own.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ContextRequest {
    /// Path to the codebase directory
    #[serde(default = "default_path")]
    #[schemars(description = "Path to the codebase")]
    pub path: String,

    /// Glob patterns selecting files to include
    #[serde(default)]
    #[schemars(description = "Patterns to include")]
    pub include_patterns: Vec<String>,

    /// Glob patterns selecting files to exclude
    #[serde(default)]
    #[schemars(description = "Patterns to exclude")]
    pub exclude_patterns: Vec<String>,

    /// Give include patterns priority when a file matches both lists
    #[serde(default)]
    #[schemars(description = "Give include patterns priority over exclude patterns")]
    pub include_priority: bool,

    /// Prefix source lines with line numbers
    #[serde(default = "default_true")]
    #[schemars(description = "Add line numbers to code")]
    pub line_numbers: bool,

    /// Render file paths as absolute instead of relative
    #[serde(default)]
    #[schemars(description = "Use absolute paths")]
    pub absolute_paths: bool,

    /// Render the directory tree for the whole project, not just included files
    #[serde(default)]
    #[schemars(description = "List the full directory tree")]
    pub full_directory_tree: bool,

    /// Wrap file contents in markdown code blocks
    #[serde(default = "default_true")]
    #[schemars(description = "Wrap code in markdown code blocks")]
    pub code_blocks: bool,

    /// Follow symbolic links while scanning
    #[serde(default)]
    #[schemars(description = "Follow symlinks")]
    pub follow_symlinks: bool,

    /// Include hidden files and directories
    #[serde(default)]
    #[schemars(description = "Include hidden directories and files")]
    pub include_hidden: bool,

    /// Ignore .gitignore rules while scanning
    #[serde(default)]
    #[schemars(description = "Skip .gitignore rules")]
    pub no_ignore: bool,

    /// Custom Handlebars template content for the rendered prompt
    #[serde(default)]
    #[schemars(description = "Custom Handlebars template contents")]
    pub template: Option<String>,

    /// Tokenizer encoding for the token count (cl100k when omitted)
    #[serde(default)]
    #[schemars(description = "Token encoding: cl100k, p50k, p50k_edit, r50k, gpt2")]
    pub encoding: Option<String>,

    /// Token count display style understood by the engine
    #[serde(default)]
    #[schemars(description = "Token count style: format or raw")]
    pub tokens: Option<String>,

    /// File ordering inside the rendered prompt
    #[serde(default)]
    #[schemars(description = "Sort order: name_asc, name_desc, date_asc, date_desc")]
    pub sort: Option<String>,

    /// Rendered prompt format
    #[serde(default)]
    #[schemars(description = "Output format: markdown, json, xml")]
    pub output_format: Option<String>,
}

impl Default for ContextRequest {
    fn default() -> Self {
        Self {
            path: default_path(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            include_priority: false,
            line_numbers: true,
            absolute_paths: false,
            full_directory_tree: false,
            code_blocks: true,
            follow_symlinks: false,
            include_hidden: false,
            no_ignore: false,
            template: None,
            encoding: None,
            tokens: None,
            sort: None,
            output_format: None,
        }
    }
}

fn default_path() -> String {
    ".".to_string()
}

fn default_true() -> bool {
    true
}

/// Output of a context generation or git history run.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedContext {
    /// The rendered prompt text (may be empty when nothing matched)
    pub prompt: String,
    /// Absolute path of the scanned directory
    pub directory: String,
    /// Token count reported by the engine, when it reported one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_count: Option<usize>,
    /// Engine note about which models the tokenizer matches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_info: Option<String>,
}

/// A strategy for running the code2prompt engine.
#[async_trait]
pub trait ContextEngine: Send + Sync {
    /// Renders a codebase scan into a prompt.
    async fn generate(&self, request: &ContextRequest) -> Result<RenderedContext>;

    /// Renders the working-tree git diff of `path`.
    async fn git_diff(&self, path: &str) -> Result<RenderedContext>;

    /// Renders the diff between two branches of `path`.
    async fn branch_diff(&self, path: &str, from: &str, to: &str) -> Result<RenderedContext>;

    /// Renders the commit log between two branches of `path`.
    async fn git_log(&self, path: &str, from: &str, to: &str) -> Result<RenderedContext>;
}

/// Builds the engine strategy this binary was compiled for.
#[cfg(not(feature = "embedded"))]
pub fn default_engine(config: &GatewayConfig) -> Arc<dyn ContextEngine> {
    Arc::new(cli::CliEngine::new(config.engine_binary.clone()))
}

/// Builds the engine strategy this binary was compiled for.
#[cfg(feature = "embedded")]
pub fn default_engine(_config: &GatewayConfig) -> Arc<dyn ContextEngine> {
    Arc::new(embedded::EmbeddedEngine::new())
}

/// Resolves the directory reported back to callers. Falls back to the
/// caller's own spelling when the path cannot be canonicalized.
pub(crate) async fn resolve_directory(path: &str) -> String {
    match tokio::fs::canonicalize(path).await {
        Ok(abs) => abs.display().to_string(),
        Err(_) => path.to_string(),
    }
}
