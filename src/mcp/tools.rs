//! Tool handlers for the context gateway server.
//!
//! One handler struct carries all six tools. Context tools run the engine
//! scan and either return the rendered prompt inline or persist it as an
//! artifact; the question tool hands the artifact to Gemini; the git tools
//! run the engine in a history mode instead of a file-scan mode.

use std::sync::Arc;

use serde_json::json;

use rmcp::{
    Error, ServerHandler,
    model::{CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    schemars, tool,
};

use crate::artifact::ArtifactWriter;
use crate::engine::{ContextEngine, ContextRequest};
use crate::error::Error as GatewayError;
use crate::qa;

fn default_repo_path() -> String {
    ".".to_string()
}

fn default_base_branch() -> String {
    "main".to_string()
}

fn default_target_branch() -> String {
    "HEAD".to_string()
}

/// Parameters for `ask_gemini_question`. The scan parameters are flattened
/// in so a question call accepts everything `get_context` accepts.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct QuestionRequest {
    /// The question to answer
    #[schemars(description = "Question to ask about the codebase")]
    pub question: String,
    /// Model override, defaults to gemini-2.5-pro
    #[serde(default)]
    #[schemars(
        description = "Gemini model to use: gemini-2.5-pro (deeper analysis) or gemini-2.5-flash (faster)"
    )]
    pub model: Option<String>,
    #[serde(flatten)]
    pub context: ContextRequest,
}

/// Parameters for `get_git_diff`.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct GitDiffRequest {
    #[serde(default = "default_repo_path")]
    #[schemars(description = "Path to the git repository")]
    pub path: String,
}

/// Parameters for `get_branch_diff` and `get_git_log`.
#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct BranchRangeRequest {
    #[serde(default = "default_repo_path")]
    #[schemars(description = "Path to the git repository")]
    pub path: String,
    #[serde(default = "default_base_branch")]
    #[schemars(
        description = "Base branch for the comparison. Defaults to 'main'; set this explicitly for repositories whose default branch has a different name"
    )]
    pub branch1: String,
    #[serde(default = "default_target_branch")]
    #[schemars(description = "Target branch for the comparison, defaults to HEAD")]
    pub branch2: String,
}

/// Tools handler wrapping the context engine and artifact writer
#[derive(Clone)]
pub struct ContextTools {
    engine: Arc<dyn ContextEngine>,
    writer: ArtifactWriter,
}

#[tool(tool_box)]
impl ContextTools {
    pub fn new(engine: Arc<dyn ContextEngine>, writer: ArtifactWriter) -> Self {
        Self { engine, writer }
    }

    #[tool(
        description = "Retrieve context from a codebase as a single prompt. Walks the directory under include/exclude glob patterns and renders the matched files as markdown, returning the prompt inline together with its token count."
    )]
    async fn get_context(
        &self,
        #[tool(aggr)] request: ContextRequest,
    ) -> Result<CallToolResult, Error> {
        tracing::info!(path = %request.path, "getting context");

        let rendered = self.engine.generate(&request).await.map_err(tool_error)?;

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string(&rendered).unwrap(),
        )]))
    }

    #[tool(
        description = "Retrieve context from a codebase and save it to a uniquely named file, returning the absolute file path instead of the content. Use this for large codebases whose context would not fit in a tool response."
    )]
    async fn get_context_for_gemini(
        &self,
        #[tool(aggr)] request: ContextRequest,
    ) -> Result<CallToolResult, Error> {
        tracing::info!(path = %request.path, "getting context for file output");

        let path = qa::generate_context_file(self.engine.as_ref(), &self.writer, &request)
            .await
            .map_err(tool_error)?;

        Ok(CallToolResult::success(vec![Content::text(
            path.display().to_string(),
        )]))
    }

    #[tool(
        description = "Ask Gemini a question about a codebase. Extracts context with the given scan parameters, saves it to a file, and submits the context together with the question to the Gemini API. Requires the GEMINI_API_KEY environment variable."
    )]
    async fn ask_gemini_question(
        &self,
        #[tool(aggr)] request: QuestionRequest,
    ) -> Result<CallToolResult, Error> {
        if request.question.trim().is_empty() {
            return Err(Error::invalid_request("Question cannot be empty", None));
        }

        let model = request.model.as_deref().unwrap_or(qa::DEFAULT_MODEL);
        tracing::info!(model, path = %request.context.path, "asking Gemini a question");

        let answer = qa::answer_question(
            self.engine.as_ref(),
            &self.writer,
            &request.context,
            &request.question,
            model,
        )
        .await
        .map_err(tool_error)?;

        Ok(CallToolResult::success(vec![Content::text(
            serde_json::to_string(&answer).unwrap(),
        )]))
    }

    #[tool(
        description = "Get the git diff of the working tree for a repository, rendered as markdown. Shows uncommitted changes."
    )]
    async fn get_git_diff(
        &self,
        #[tool(aggr)] request: GitDiffRequest,
    ) -> Result<CallToolResult, Error> {
        tracing::info!(path = %request.path, "getting git diff");

        let rendered = self.engine.git_diff(&request.path).await.map_err(tool_error)?;

        Ok(git_response("diff", &rendered))
    }

    #[tool(
        description = "Get the diff between two git branches, rendered as markdown. Compares 'main' to 'HEAD' by default; pass branch1 explicitly when the repository's default branch is not 'main'."
    )]
    async fn get_branch_diff(
        &self,
        #[tool(aggr)] request: BranchRangeRequest,
    ) -> Result<CallToolResult, Error> {
        tracing::info!(
            path = %request.path,
            branch1 = %request.branch1,
            branch2 = %request.branch2,
            "getting branch diff"
        );

        let rendered = self
            .engine
            .branch_diff(&request.path, &request.branch1, &request.branch2)
            .await
            .map_err(tool_error)?;

        Ok(git_response("diff", &rendered))
    }

    #[tool(
        description = "Get the git log between two branches, rendered as markdown. Compares 'main' to 'HEAD' by default; pass branch1 explicitly when the repository's default branch is not 'main'."
    )]
    async fn get_git_log(
        &self,
        #[tool(aggr)] request: BranchRangeRequest,
    ) -> Result<CallToolResult, Error> {
        tracing::info!(
            path = %request.path,
            branch1 = %request.branch1,
            branch2 = %request.branch2,
            "getting git log"
        );

        let rendered = self
            .engine
            .git_log(&request.path, &request.branch1, &request.branch2)
            .await
            .map_err(tool_error)?;

        Ok(git_response("log", &rendered))
    }
}

#[tool(tool_box)]
impl ServerHandler for ContextTools {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Extracts codebase context via code2prompt. Use get_context to render a \
                 codebase as a single prompt, get_context_for_gemini to save it to a file for \
                 large codebases, ask_gemini_question to answer a question grounded in the \
                 codebase, and the git tools for diffs and logs."
                    .to_string(),
            ),
        }
    }
}

/// Maps a gateway error onto the MCP error surface. Validation failures
/// become invalid-request errors, everything else is internal.
fn tool_error(err: GatewayError) -> Error {
    match &err {
        GatewayError::UnsupportedModel { .. }
        | GatewayError::MissingCredential
        | GatewayError::InvalidRequest(_) => Error::invalid_request(err.to_string(), None),
        _ => Error::internal_error(err.to_string(), None),
    }
}

fn git_response(kind: &str, rendered: &crate::engine::RenderedContext) -> CallToolResult {
    let mut response = json!({
        kind: rendered.prompt,
        "directory": rendered.directory,
    });
    if let Some(count) = rendered.token_count {
        response["token_count"] = json!(count);
    }

    CallToolResult::success(vec![Content::text(
        serde_json::to_string(&response).unwrap(),
    )])
}
