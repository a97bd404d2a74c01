//! Question answering over generated context.
//!
//! Each question runs the full pipeline: validate the model name, fetch the
//! credential, regenerate the codebase context into a fresh artifact, read
//! it back, and submit context plus question to Gemini. Nothing is cached
//! between calls; the hosted model keeps no state, so every question pays
//! for a complete context extraction.

use std::path::PathBuf;

use serde::Serialize;
use tracing::{info, instrument};

use crate::artifact::{ArtifactWriter, read_artifact};
use crate::classify;
use crate::engine::{ContextEngine, ContextRequest};
use crate::error::{Error, Result};
use crate::gemini::{Client, Content, GenerationConfig};

/// Models the QA pipeline will talk to.
pub const SUPPORTED_MODELS: &[&str] = &["gemini-2.5-pro", "gemini-2.5-flash"];

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

/// Environment variable holding the Gemini credential.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Separator between the context body and the question in the prompt.
const PROMPT_SEPARATOR: &str = "\n\n---\n\nQuestion: ";

/// Sampling temperature for grounded answers.
const ANSWER_TEMPERATURE: f32 = 0.1;

/// Output cap for a single answer.
const MAX_OUTPUT_TOKENS: i32 = 30000;

/// Outcome of a question run.
#[derive(Debug, Clone, Serialize)]
pub struct QaAnswer {
    /// The model's answer text
    pub answer: String,
    /// Absolute path of the context artifact the answer was grounded on
    pub context_file: String,
    /// Whitespace word count of the submitted prompt. An approximation,
    /// not a tokenizer count.
    pub token_count: usize,
    /// The model that produced the answer
    pub model_used: String,
}

/// Checks `model` against the supported set.
pub fn validate_model(model: &str) -> Result<()> {
    if SUPPORTED_MODELS.contains(&model) {
        Ok(())
    } else {
        Err(Error::UnsupportedModel {
            model: model.to_string(),
            supported: SUPPORTED_MODELS.join(", "),
        })
    }
}

/// Reads the Gemini credential from the environment. Read per call so a
/// rotated key takes effect without a restart.
pub fn api_key_from_env() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(Error::MissingCredential),
    }
}

/// Generates context for `request` and persists it as an artifact,
/// returning the artifact's absolute path. Shared by the context-file tool
/// and the QA pipeline.
#[instrument(skip_all, level = "debug")]
pub async fn generate_context_file(
    engine: &dyn ContextEngine,
    writer: &ArtifactWriter,
    request: &ContextRequest,
) -> Result<PathBuf> {
    let rendered = engine
        .generate(request)
        .await
        .map_err(|e| Error::ContextGeneration(e.to_string()))?;

    let path = writer.persist(&rendered.prompt).await?;
    info!(path = %path.display(), bytes = rendered.prompt.len(), "context artifact ready");
    Ok(path)
}

/// Answers `question` over freshly generated context for `request`.
#[instrument(skip(engine, writer, request, question), level = "debug")]
pub async fn answer_question(
    engine: &dyn ContextEngine,
    writer: &ArtifactWriter,
    request: &ContextRequest,
    question: &str,
    model: &str,
) -> Result<QaAnswer> {
    validate_model(model)?;
    let api_key = api_key_from_env()?;
    let client = Client::with_api_key(api_key);
    answer_with_client(engine, writer, request, question, model, &client).await
}

pub(crate) async fn answer_with_client(
    engine: &dyn ContextEngine,
    writer: &ArtifactWriter,
    request: &ContextRequest,
    question: &str,
    model: &str,
    client: &Client,
) -> Result<QaAnswer> {
    let context_file = generate_context_file(engine, writer, request)
        .await
        .map_err(|e| Error::Extraction(e.to_string()))?;
    info!(path = %context_file.display(), "context extracted");

    let context = read_artifact(&context_file).await?;

    let prompt = format!("{context}{PROMPT_SEPARATOR}{question}");
    let token_count = approximate_tokens(&prompt);

    let config = GenerationConfig {
        temperature: Some(ANSWER_TEMPERATURE),
        max_output_tokens: Some(MAX_OUTPUT_TOKENS),
        ..Default::default()
    };
    let contents = vec![Content::new().with_role("user").with_text(prompt)];

    let response = match client.models().generate_content(model, contents, Some(config)).await {
        Ok(response) => response,
        Err(e) => return Err(Error::Service(classify::user_message(&e.to_string()))),
    };
    info!(model, "received response from Gemini");

    let answer = match response.text() {
        Some(text) => text,
        None => match response.block_reason() {
            Some(reason) => {
                let raw = format!("Response blocked by safety filters: {reason}");
                return Err(Error::Service(classify::user_message(&raw)));
            }
            // No text and no block reason: fall back to the response's
            // debug form rather than failing the call.
            None => format!("{response:?}"),
        },
    };

    Ok(QaAnswer {
        answer,
        context_file: context_file.display().to_string(),
        token_count,
        model_used: model.to_string(),
    })
}

fn approximate_tokens(prompt: &str) -> usize {
    prompt.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::EMPTY_CONTEXT_NOTICE;
    use crate::engine::testing::StubEngine;
    use lazy_static::lazy_static;
    use mockito::Server;
    use std::sync::Mutex;

    lazy_static! {
        static ref ENV_LOCK: Mutex<()> = Mutex::new(());
    }

    fn writer_in(dir: &tempfile::TempDir) -> ArtifactWriter {
        ArtifactWriter::new(Some(dir.path().to_path_buf()))
    }

    fn client_for(server: &Server) -> Client {
        let mut client = Client::with_api_key("test-key");
        client.set_base_url(server.url());
        client
    }

    fn generate_path(model: &str) -> String {
        format!("/v1beta/models/{model}:generateContent")
    }

    #[test]
    fn rejects_models_outside_the_allow_list() {
        let err = validate_model("invalid-model").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unsupported model 'invalid-model'"));
        assert!(msg.contains("gemini-2.5-pro"));
        assert!(msg.contains("gemini-2.5-flash"));

        assert!(validate_model("gemini-2.5-pro").is_ok());
        assert!(validate_model("gemini-2.5-flash").is_ok());
    }

    #[test]
    fn missing_or_blank_credentials_are_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();

        unsafe {
            std::env::remove_var(API_KEY_ENV);
        }
        let err = api_key_from_env().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("GEMINI_API_KEY environment variable is required"));
        assert!(msg.contains(".env"));

        unsafe {
            std::env::set_var(API_KEY_ENV, "   ");
        }
        assert!(api_key_from_env().is_err());

        unsafe {
            std::env::set_var(API_KEY_ENV, "a-key");
        }
        assert_eq!(api_key_from_env().unwrap(), "a-key");

        unsafe {
            std::env::remove_var(API_KEY_ENV);
        }
    }

    #[test]
    fn prompt_word_count_is_the_reported_token_count() {
        assert_eq!(approximate_tokens(""), 0);
        assert_eq!(approximate_tokens("one two  three\nfour"), 4);
    }

    #[tokio::test]
    async fn answers_over_generated_context() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::with_prompt("CONTEXT BODY");
        let writer = writer_in(&dir);

        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", generate_path("gemini-2.5-pro").as_str())
            .match_query(mockito::Matcher::Any)
            .match_body(mockito::Matcher::Regex(
                "CONTEXT BODY.*Question: What does this do".to_string(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "It scans code."}]}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let result = answer_with_client(
            &engine,
            &writer,
            &ContextRequest::default(),
            "What does this do?",
            "gemini-2.5-pro",
            &client_for(&server),
        )
        .await
        .unwrap();

        assert_eq!(result.answer, "It scans code.");
        assert_eq!(result.model_used, "gemini-2.5-pro");
        // "CONTEXT BODY\n\n---\n\nQuestion: What does this do?" has 8 words
        assert_eq!(result.token_count, 8);

        let artifact = PathBuf::from(&result.context_file);
        assert!(artifact.is_absolute());
        assert_eq!(read_artifact(&artifact).await.unwrap(), "CONTEXT BODY");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn engine_failures_are_reported_as_extraction_failures() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::failing_with("scan exploded");
        let writer = writer_in(&dir);

        let server = Server::new_async().await;
        let err = answer_with_client(
            &engine,
            &writer,
            &ContextRequest::default(),
            "anything?",
            "gemini-2.5-pro",
            &client_for(&server),
        )
        .await
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.starts_with("Context extraction failed:"), "got: {msg}");
        assert!(msg.contains("Failed to generate codebase context"));
        assert!(msg.contains("scan exploded"));
    }

    #[tokio::test]
    async fn rate_limits_surface_the_fixed_message_only() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::with_prompt("ctx");
        let writer = writer_in(&dir);

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", generate_path("gemini-2.5-flash").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .with_body("{\"error\": {\"code\": 429, \"message\": \"Resource has been exhausted (e.g. check quota) key=abc123\", \"status\": \"RESOURCE_EXHAUSTED\"}}")
            .create_async()
            .await;

        let err = answer_with_client(
            &engine,
            &writer,
            &ContextRequest::default(),
            "q?",
            "gemini-2.5-flash",
            &client_for(&server),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Rate limit exceeded. Please try again later or check your API quota."
        );
        assert!(!err.to_string().contains("abc123"));
    }

    #[tokio::test]
    async fn blocked_prompts_surface_the_safety_message() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::with_prompt("ctx");
        let writer = writer_in(&dir);

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", generate_path("gemini-2.5-pro").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#)
            .create_async()
            .await;

        let err = answer_with_client(
            &engine,
            &writer,
            &ContextRequest::default(),
            "q?",
            "gemini-2.5-pro",
            &client_for(&server),
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Content blocked by safety filters. Try rephrasing your question."
        );
    }

    #[tokio::test]
    async fn textless_responses_fall_back_to_their_debug_form() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::with_prompt("ctx");
        let writer = writer_in(&dir);

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", generate_path("gemini-2.5-pro").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#)
            .create_async()
            .await;

        let result = answer_with_client(
            &engine,
            &writer,
            &ContextRequest::default(),
            "q?",
            "gemini-2.5-pro",
            &client_for(&server),
        )
        .await
        .unwrap();

        assert!(result.answer.contains("GenerateContentResponse"));
    }

    #[tokio::test]
    async fn empty_scans_still_produce_an_answerable_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let engine = StubEngine::with_prompt("");
        let writer = writer_in(&dir);

        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", generate_path("gemini-2.5-pro").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates": [{"content": {"parts": [{"text": "Nothing matched."}]}}]}"#)
            .create_async()
            .await;

        let result = answer_with_client(
            &engine,
            &writer,
            &ContextRequest::default(),
            "anything there?",
            "gemini-2.5-pro",
            &client_for(&server),
        )
        .await
        .unwrap();

        let artifact = PathBuf::from(&result.context_file);
        assert_eq!(
            read_artifact(&artifact).await.unwrap(),
            EMPTY_CONTEXT_NOTICE
        );
    }
}
