//! In-process strategy: binds `code2prompt-core` directly.
//!
//! Enabled with the `embedded` cargo feature. Scanning and rendering are
//! synchronous in the core crate, so each run happens on the blocking pool.
//! Token counts come from the core tokenizer and are therefore always
//! present, unlike the subprocess strategy's scraped ones.

use std::path::PathBuf;

use async_trait::async_trait;
use code2prompt_core::configuration::Code2PromptConfig;
use code2prompt_core::session::Code2PromptSession;
use code2prompt_core::sort::FileSortMethod;
use code2prompt_core::template::OutputFormat;
use code2prompt_core::tokenizer::{TokenFormat, TokenizerType, count_tokens};
use tracing::warn;

use crate::engine::{ContextEngine, ContextRequest, RenderedContext, resolve_directory};
use crate::error::{Error, Result};

/// Runs the engine inside this process.
#[derive(Debug, Default, Clone)]
pub struct EmbeddedEngine;

enum GitMode {
    None,
    WorkingTree,
    BranchDiff { from: String, to: String },
    BranchLog { from: String, to: String },
}

impl EmbeddedEngine {
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, request: ContextRequest, mode: GitMode) -> Result<RenderedContext> {
        let directory = resolve_directory(&request.path).await;
        let (prompt, token_count) = tokio::task::spawn_blocking(move || render(&request, &mode))
            .await
            .map_err(|e| Error::Engine(format!("engine task join error: {e}")))??;

        Ok(RenderedContext {
            prompt,
            directory,
            token_count: Some(token_count),
            model_info: None,
        })
    }
}

#[async_trait]
impl ContextEngine for EmbeddedEngine {
    async fn generate(&self, request: &ContextRequest) -> Result<RenderedContext> {
        self.run(request.clone(), GitMode::None).await
    }

    async fn git_diff(&self, path: &str) -> Result<RenderedContext> {
        self.run(request_for(path), GitMode::WorkingTree).await
    }

    async fn branch_diff(&self, path: &str, from: &str, to: &str) -> Result<RenderedContext> {
        let mode = GitMode::BranchDiff {
            from: from.to_string(),
            to: to.to_string(),
        };
        self.run(request_for(path), mode).await
    }

    async fn git_log(&self, path: &str, from: &str, to: &str) -> Result<RenderedContext> {
        let mode = GitMode::BranchLog {
            from: from.to_string(),
            to: to.to_string(),
        };
        self.run(request_for(path), mode).await
    }
}

fn request_for(path: &str) -> ContextRequest {
    ContextRequest {
        path: path.to_string(),
        ..Default::default()
    }
}

fn render(request: &ContextRequest, mode: &GitMode) -> Result<(String, usize)> {
    let tokenizer = tokenizer_for(request.encoding.as_deref());
    let config = build_config(request, mode, tokenizer.clone())?;
    let mut session = Code2PromptSession::new(config);

    session.load_codebase().map_err(engine_err)?;
    match mode {
        GitMode::None => {}
        GitMode::WorkingTree => session.load_git_diff().map_err(engine_err)?,
        GitMode::BranchDiff { .. } => session
            .load_git_diff_between_branches()
            .map_err(engine_err)?,
        GitMode::BranchLog { .. } => session.load_git_log_between_branches().map_err(engine_err)?,
    }

    let rendered = session.generate_prompt().map_err(engine_err)?;
    let token_count = count_tokens(&rendered.prompt, &tokenizer);
    Ok((rendered.prompt, token_count))
}

fn build_config(
    request: &ContextRequest,
    mode: &GitMode,
    tokenizer: TokenizerType,
) -> Result<Code2PromptConfig> {
    let mut builder = Code2PromptConfig::builder();
    builder
        .path(PathBuf::from(&request.path))
        .include_patterns(request.include_patterns.clone())
        .exclude_patterns(request.exclude_patterns.clone())
        .include_priority(request.include_priority)
        .line_numbers(request.line_numbers)
        .absolute_path(request.absolute_paths)
        .full_directory_tree(request.full_directory_tree)
        .no_codeblock(!request.code_blocks)
        .follow_symlinks(request.follow_symlinks)
        .hidden(request.include_hidden)
        .no_ignore(request.no_ignore)
        .encoding(tokenizer);

    if let Some(template) = &request.template {
        builder.custom_template(Some(template.clone()));
    }
    if let Some(tokens) = &request.tokens {
        match tokens.as_str() {
            "format" => {
                builder.token_format(TokenFormat::Format);
            }
            "raw" => {
                builder.token_format(TokenFormat::Raw);
            }
            other => warn!(tokens = %other, "ignoring unknown token format"),
        }
    }
    if let Some(sort) = &request.sort {
        match parse_sort(sort) {
            Some(method) => {
                builder.sort_method(Some(method));
            }
            None => warn!(sort = %sort, "ignoring unknown sort key"),
        }
    }
    if let Some(format) = &request.output_format {
        match parse_output_format(format) {
            Some(f) => {
                builder.output_format(f);
            }
            None => warn!(output_format = %format, "ignoring unknown output format"),
        }
    }
    match mode {
        GitMode::None => {}
        GitMode::WorkingTree => {
            builder.diff_enabled(true);
        }
        GitMode::BranchDiff { from, to } => {
            builder.diff_branches(Some((from.clone(), to.clone())));
        }
        GitMode::BranchLog { from, to } => {
            builder.log_branches(Some((from.clone(), to.clone())));
        }
    }

    builder.build().map_err(engine_err)
}

fn tokenizer_for(encoding: Option<&str>) -> TokenizerType {
    match encoding {
        None => TokenizerType::default(),
        Some(name) => match name.parse::<TokenizerType>() {
            Ok(tokenizer) => tokenizer,
            Err(_) => {
                warn!(encoding = %name, "unknown encoding, using the default tokenizer");
                TokenizerType::default()
            }
        },
    }
}

fn parse_sort(key: &str) -> Option<FileSortMethod> {
    match key {
        "name_asc" => Some(FileSortMethod::NameAsc),
        "name_desc" => Some(FileSortMethod::NameDesc),
        "date_asc" => Some(FileSortMethod::DateAsc),
        "date_desc" => Some(FileSortMethod::DateDesc),
        _ => None,
    }
}

fn parse_output_format(name: &str) -> Option<OutputFormat> {
    match name {
        "markdown" => Some(OutputFormat::Markdown),
        "json" => Some(OutputFormat::Json),
        "xml" => Some(OutputFormat::Xml),
        _ => None,
    }
}

fn engine_err(e: impl std::fmt::Display) -> Error {
    Error::Engine(e.to_string())
}
