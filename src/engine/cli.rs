//! Subprocess strategy: drives the `code2prompt` CLI.
//!
//! Requests are translated into argv, the binary writes the rendered prompt
//! into a scratch file we pick, and the scratch file is read back and
//! removed. Stdout only carries human-oriented status lines; the token
//! count and model note are scraped from it on a best-effort basis and
//! omitted when the engine changes its wording.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::engine::{ContextEngine, ContextRequest, RenderedContext, SORT_KEYS, resolve_directory};
use crate::error::{Error, Result};

/// Runs the `code2prompt` binary once per request.
#[derive(Debug, Clone)]
pub struct CliEngine {
    binary: String,
}

enum GitMode {
    WorkingTree,
    BranchDiff { from: String, to: String },
    BranchLog { from: String, to: String },
}

impl CliEngine {
    /// Creates an engine that launches `binary` (a name resolved via PATH
    /// or an explicit path).
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[instrument(skip(self, args), level = "debug")]
    async fn invoke(
        &self,
        args: Vec<String>,
        output_file: &Path,
    ) -> Result<(String, Option<usize>, Option<String>)> {
        debug!(binary = %self.binary, ?args, "invoking code2prompt");

        let output = Command::new(&self.binary)
            .args(&args)
            .output()
            .await
            .map_err(|e| Error::Engine(format!("failed to launch '{}': {}", self.binary, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let message = if stderr.is_empty() {
                format!("code2prompt exited with {}", output.status)
            } else {
                format!("code2prompt exited with {}: {}", output.status, stderr)
            };
            return Err(Error::Engine(message));
        }

        let prompt = tokio::fs::read_to_string(output_file).await.map_err(|e| {
            Error::Engine(format!(
                "engine succeeded but output file {} is unreadable: {}",
                output_file.display(),
                e
            ))
        })?;
        remove_scratch(output_file).await;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (token_count, model_info) = parse_engine_stdout(&stdout);
        Ok((prompt, token_count, model_info))
    }

    async fn run_git(&self, mode: GitMode, path: &str) -> Result<RenderedContext> {
        let output_file = scratch_path("txt");
        let args = build_git_args(&mode, path, &output_file);
        let (prompt, token_count, model_info) = self.invoke(args, &output_file).await?;
        Ok(RenderedContext {
            prompt,
            directory: resolve_directory(path).await,
            token_count,
            model_info,
        })
    }
}

#[async_trait]
impl ContextEngine for CliEngine {
    async fn generate(&self, request: &ContextRequest) -> Result<RenderedContext> {
        let output_file = scratch_path("txt");

        // The request carries template *content*; the CLI wants a file.
        let template_file = match &request.template {
            Some(content) => {
                let path = scratch_path("hbs");
                tokio::fs::write(&path, content).await.map_err(|e| {
                    Error::Engine(format!(
                        "failed to stage template file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Some(path)
            }
            None => None,
        };

        let args = build_scan_args(request, &output_file, template_file.as_deref());
        let invoked = self.invoke(args, &output_file).await;
        if let Some(path) = &template_file {
            remove_scratch(path).await;
        }
        let (prompt, token_count, model_info) = invoked?;

        Ok(RenderedContext {
            prompt,
            directory: resolve_directory(&request.path).await,
            token_count,
            model_info,
        })
    }

    async fn git_diff(&self, path: &str) -> Result<RenderedContext> {
        self.run_git(GitMode::WorkingTree, path).await
    }

    async fn branch_diff(&self, path: &str, from: &str, to: &str) -> Result<RenderedContext> {
        self.run_git(
            GitMode::BranchDiff {
                from: from.to_string(),
                to: to.to_string(),
            },
            path,
        )
        .await
    }

    async fn git_log(&self, path: &str, from: &str, to: &str) -> Result<RenderedContext> {
        self.run_git(
            GitMode::BranchLog {
                from: from.to_string(),
                to: to.to_string(),
            },
            path,
        )
        .await
    }
}

fn scratch_path(extension: &str) -> PathBuf {
    std::env::temp_dir().join(format!("c2p_scratch_{}.{}", Uuid::new_v4().simple(), extension))
}

async fn remove_scratch(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "failed to remove scratch file");
    }
}

fn build_scan_args(
    request: &ContextRequest,
    output_file: &Path,
    template_file: Option<&Path>,
) -> Vec<String> {
    let mut args = Vec::new();
    for pattern in &request.include_patterns {
        args.push("-i".to_string());
        args.push(pattern.clone());
    }
    for pattern in &request.exclude_patterns {
        args.push("-e".to_string());
        args.push(pattern.clone());
    }
    if request.include_priority {
        args.push("--include-priority".to_string());
    }
    if request.line_numbers {
        args.push("-l".to_string());
    }
    if request.absolute_paths {
        args.push("--absolute-paths".to_string());
    }
    if request.full_directory_tree {
        args.push("--full-directory-tree".to_string());
    }
    if !request.code_blocks {
        args.push("--no-codeblock".to_string());
    }
    if request.follow_symlinks {
        args.push("-L".to_string());
    }
    if request.include_hidden {
        args.push("--hidden".to_string());
    }
    if request.no_ignore {
        args.push("--no-ignore".to_string());
    }
    if let Some(template) = template_file {
        args.push("-t".to_string());
        args.push(template.display().to_string());
    }
    if let Some(encoding) = &request.encoding {
        args.push("-c".to_string());
        args.push(encoding.clone());
    }
    if let Some(tokens) = &request.tokens {
        args.push("--tokens".to_string());
        args.push(tokens.clone());
    }
    if let Some(sort) = &request.sort {
        if SORT_KEYS.contains(&sort.as_str()) {
            args.push("--sort".to_string());
            args.push(sort.clone());
        } else {
            warn!(sort = %sort, "ignoring unknown sort key");
        }
    }
    if let Some(format) = &request.output_format {
        args.push("-F".to_string());
        args.push(format.clone());
    }
    finish_args(&mut args, output_file, &request.path);
    args
}

fn build_git_args(mode: &GitMode, path: &str, output_file: &Path) -> Vec<String> {
    let mut args = Vec::new();
    match mode {
        GitMode::WorkingTree => args.push("-d".to_string()),
        GitMode::BranchDiff { from, to } => {
            args.push("--git-diff-branch".to_string());
            args.push(from.clone());
            args.push(to.clone());
        }
        GitMode::BranchLog { from, to } => {
            args.push("--git-log-branch".to_string());
            args.push(from.clone());
            args.push(to.clone());
        }
    }
    finish_args(&mut args, output_file, path);
    args
}

// Shared tail: scratch output file, clipboard suppression, then the scanned
// path as the final positional argument.
fn finish_args(args: &mut Vec<String>, output_file: &Path, path: &str) {
    args.push("-O".to_string());
    args.push(output_file.display().to_string());
    args.push("--no-clipboard".to_string());
    args.push(path.to_string());
}

fn parse_engine_stdout(stdout: &str) -> (Option<usize>, Option<String>) {
    let ansi = Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").unwrap();
    let plain = ansi.replace_all(stdout, "");

    let token_count = Regex::new(r"(?i)token count:\s*([0-9][0-9,]*)")
        .unwrap()
        .captures(&plain)
        .and_then(|caps| caps[1].replace(',', "").parse::<usize>().ok());

    let model_info = Regex::new(r"(?i)model info:\s*(\S[^\r\n]*)")
        .unwrap()
        .captures(&plain)
        .map(|caps| caps[1].trim().to_string());

    (token_count, model_info)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out_file() -> PathBuf {
        PathBuf::from("/tmp/out.txt")
    }

    #[test]
    fn default_request_translates_to_the_minimal_argv() {
        let request = ContextRequest::default();
        let args = build_scan_args(&request, &out_file(), None);

        assert_eq!(
            args,
            vec!["-l", "-O", "/tmp/out.txt", "--no-clipboard", "."]
        );
    }

    #[test]
    fn patterns_are_repeated_flag_value_pairs() {
        let request = ContextRequest {
            include_patterns: vec!["*.rs".to_string(), "src/**".to_string()],
            exclude_patterns: vec!["target/**".to_string()],
            line_numbers: false,
            ..Default::default()
        };
        let args = build_scan_args(&request, &out_file(), None);

        assert_eq!(
            args,
            vec![
                "-i",
                "*.rs",
                "-i",
                "src/**",
                "-e",
                "target/**",
                "-O",
                "/tmp/out.txt",
                "--no-clipboard",
                "."
            ]
        );
    }

    #[test]
    fn boolean_switches_map_to_their_flags() {
        let request = ContextRequest {
            include_priority: true,
            absolute_paths: true,
            full_directory_tree: true,
            code_blocks: false,
            follow_symlinks: true,
            include_hidden: true,
            no_ignore: true,
            ..Default::default()
        };
        let args = build_scan_args(&request, &out_file(), None);

        for flag in [
            "--include-priority",
            "--absolute-paths",
            "--full-directory-tree",
            "--no-codeblock",
            "-L",
            "--hidden",
            "--no-ignore",
        ] {
            assert!(args.contains(&flag.to_string()), "missing {flag}");
        }
    }

    #[test]
    fn the_scanned_path_is_always_the_final_argument() {
        let request = ContextRequest {
            path: "/work/repo".to_string(),
            sort: Some("date_desc".to_string()),
            output_format: Some("json".to_string()),
            encoding: Some("p50k".to_string()),
            tokens: Some("raw".to_string()),
            ..Default::default()
        };
        let args = build_scan_args(&request, &out_file(), None);

        assert_eq!(args.last().unwrap(), "/work/repo");
        let sort_at = args.iter().position(|a| a == "--sort").unwrap();
        assert_eq!(args[sort_at + 1], "date_desc");
        let fmt_at = args.iter().position(|a| a == "-F").unwrap();
        assert_eq!(args[fmt_at + 1], "json");
        let enc_at = args.iter().position(|a| a == "-c").unwrap();
        assert_eq!(args[enc_at + 1], "p50k");
        let tok_at = args.iter().position(|a| a == "--tokens").unwrap();
        assert_eq!(args[tok_at + 1], "raw");
    }

    #[test]
    fn unknown_sort_keys_are_dropped() {
        let request = ContextRequest {
            sort: Some("alphabetical".to_string()),
            ..Default::default()
        };
        let args = build_scan_args(&request, &out_file(), None);
        assert!(!args.contains(&"--sort".to_string()));
    }

    #[test]
    fn template_files_are_passed_by_path() {
        let request = ContextRequest {
            template: Some("{{source_tree}}".to_string()),
            ..Default::default()
        };
        let template = PathBuf::from("/tmp/tpl.hbs");
        let args = build_scan_args(&request, &out_file(), Some(&template));

        let at = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[at + 1], "/tmp/tpl.hbs");
    }

    #[test]
    fn git_modes_use_their_dedicated_flags() {
        let diff = build_git_args(&GitMode::WorkingTree, "/repo", &out_file());
        assert_eq!(
            diff,
            vec!["-d", "-O", "/tmp/out.txt", "--no-clipboard", "/repo"]
        );

        let branch = build_git_args(
            &GitMode::BranchDiff {
                from: "main".to_string(),
                to: "HEAD".to_string(),
            },
            "/repo",
            &out_file(),
        );
        assert_eq!(
            branch,
            vec![
                "--git-diff-branch",
                "main",
                "HEAD",
                "-O",
                "/tmp/out.txt",
                "--no-clipboard",
                "/repo"
            ]
        );

        let log = build_git_args(
            &GitMode::BranchLog {
                from: "release".to_string(),
                to: "main".to_string(),
            },
            "/repo",
            &out_file(),
        );
        assert_eq!(log[0], "--git-log-branch");
        assert_eq!(&log[1..3], ["release", "main"]);
        assert_eq!(log.last().unwrap(), "/repo");
    }

    #[test]
    fn stdout_metadata_is_scraped_when_present() {
        let (tokens, model) =
            parse_engine_stdout("[i] Token count: 1234, Model info: ChatGPT models, text-embedding-ada-002\n");
        assert_eq!(tokens, Some(1234));
        assert_eq!(model, Some("ChatGPT models, text-embedding-ada-002".to_string()));
    }

    #[test]
    fn stdout_metadata_handles_ansi_and_digit_grouping() {
        let colored = "\x1b[32m[i]\x1b[0m \x1b[1mToken count:\x1b[0m 12,345\n";
        let (tokens, model) = parse_engine_stdout(colored);
        assert_eq!(tokens, Some(12345));
        assert_eq!(model, None);
    }

    #[test]
    fn missing_stdout_metadata_is_omitted_not_fatal() {
        assert_eq!(parse_engine_stdout(""), (None, None));
        assert_eq!(parse_engine_stdout("Done!\n"), (None, None));
        assert_eq!(parse_engine_stdout("Token count: soon"), (None, None));
    }

    #[cfg(unix)]
    mod subprocess {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn stub_engine(dir: &tempfile::TempDir, script_body: &str) -> String {
            let path = dir.path().join("fake-code2prompt");
            std::fs::write(&path, script_body).unwrap();
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path.display().to_string()
        }

        // Writes a fixed prompt into whatever file follows -O and reports
        // metadata on stdout, like the real binary does.
        const HAPPY_STUB: &str = r#"#!/bin/sh
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "-O" ]; then out="$a"; fi
  prev="$a"
done
printf 'stub context body' > "$out"
echo "Token count: 42"
echo "Model info: ChatGPT models"
"#;

        const FAILING_STUB: &str = r#"#!/bin/sh
echo "scan failed: bad pattern" >&2
exit 3
"#;

        #[tokio::test]
        async fn generate_round_trips_through_the_binary() {
            let dir = tempfile::tempdir().unwrap();
            let engine = CliEngine::new(stub_engine(&dir, HAPPY_STUB));
            let request = ContextRequest {
                path: dir.path().display().to_string(),
                ..Default::default()
            };

            let rendered = engine.generate(&request).await.unwrap();
            assert_eq!(rendered.prompt, "stub context body");
            assert_eq!(rendered.token_count, Some(42));
            assert_eq!(rendered.model_info, Some("ChatGPT models".to_string()));
            assert!(PathBuf::from(&rendered.directory).is_absolute());
        }

        #[tokio::test]
        async fn nonzero_exit_surfaces_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let engine = CliEngine::new(stub_engine(&dir, FAILING_STUB));

            let err = engine
                .generate(&ContextRequest::default())
                .await
                .unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("scan failed: bad pattern"), "got: {msg}");
        }

        #[tokio::test]
        async fn missing_binary_fails_to_launch() {
            let engine = CliEngine::new("/nonexistent/code2prompt-binary");
            let err = engine.git_diff(".").await.unwrap_err();
            assert!(err.to_string().contains("failed to launch"));
        }

        #[tokio::test]
        async fn git_diff_goes_through_the_same_pipeline() {
            let dir = tempfile::tempdir().unwrap();
            let engine = CliEngine::new(stub_engine(&dir, HAPPY_STUB));

            let rendered = engine
                .branch_diff(&dir.path().display().to_string(), "main", "HEAD")
                .await
                .unwrap();
            assert_eq!(rendered.prompt, "stub context body");
            assert_eq!(rendered.token_count, Some(42));
        }
    }
}
