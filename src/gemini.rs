//! Gemini API implementation
//!
//! Minimal client for Google's Gemini Developer API, covering the single
//! generateContent call the question-answering pipeline needs. Requests are
//! sent exactly once; rate limits and transient failures surface to the
//! caller rather than triggering retries.

mod client;
mod http;
mod models;
mod types;

pub use client::Client;
pub use models::ModelsService;
pub use types::{Candidate, Content, GenerateContentResponse, GenerationConfig, Part, PromptFeedback};
