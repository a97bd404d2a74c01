//! # code2prompt-mcp - Codebase Context Gateway for AI Agents
//!
//! This crate runs an MCP server that lets AI agents extract context from
//! codebases using the code2prompt engine and ask Gemini questions grounded
//! in that context. It supports:
//!
//! - Codebase scans under include/exclude glob patterns, rendered as one
//!   markdown prompt with token counts
//! - Context persistence to uniquely named artifact files, safe under
//!   concurrent calls
//! - Question answering over freshly extracted context via the Gemini API,
//!   with classified, credential-safe failure messages
//! - Git history views: working tree diff, branch diff, and branch log
//! - Two engine strategies behind one trait: spawning the code2prompt CLI
//!   (default) or calling code2prompt-core in process (feature `embedded`)
//! - Async API with Tokio
//!
//! ## Example
//!
//! ```rust,no_run
//! use code2prompt_mcp::config::GatewayConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Serve the tools over stdio until the client disconnects
//!     let config = GatewayConfig::from_env();
//!     code2prompt_mcp::mcp::run(config).await?;
//!     Ok(())
//! }
//! ```

mod error;

pub mod artifact;
pub mod classify;
pub mod config;
pub mod engine;
pub mod gemini;
pub mod mcp;
pub mod qa;

pub use error::Error;

/// Re-export of types module for public use
pub mod prelude {
    pub use crate::error::Error;
    pub use crate::error::Result;
}
