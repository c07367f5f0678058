//! Claude CLI generator.
//!
//! Runs `claude -p --output-format json`, feeds the prompt on stdin and
//! parses the single JSON result envelope printed on stdout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::trait_def::{Generation, GenerationError, Generator};

/// Generator backed by the [Claude Code](https://docs.anthropic.com/en/docs/claude-code)
/// CLI in print mode.
#[derive(Debug, Clone)]
pub struct ClaudeCliGenerator {
    /// Path to the `claude` binary. Defaults to `"claude"` (found via `$PATH`).
    binary: String,
    /// Model alias or full name passed through `--model`.
    model: Option<String>,
}

impl ClaudeCliGenerator {
    /// The binary name used when none is configured.
    pub const DEFAULT_BINARY: &str = "claude";

    /// Create a generator that will look for `claude` on `$PATH`.
    pub fn new() -> Self {
        Self::with_binary(Self::DEFAULT_BINARY)
    }

    /// Create a generator with a custom binary path.
    pub fn with_binary(path: impl Into<String>) -> Self {
        Self {
            binary: path.into(),
            model: None,
        }
    }

    /// Request a specific model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("-p").arg("--output-format").arg("json");
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ClaudeCliGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Generator for ClaudeCliGenerator {
    fn name(&self) -> &str {
        "claude-cli"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Generation, GenerationError> {
        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        let started = Instant::now();
        let mut child = self.command().spawn().map_err(|source| GenerationError::Spawn {
            program: self.binary.clone(),
            source,
        })?;
        debug!(binary = %self.binary, prompt_bytes = prompt.len(), "spawned generator");

        let run = async move {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(prompt.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            child.wait_with_output().await
        };

        // Dropping `run` drops the child, and `kill_on_drop` reaps it.
        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
            output = run => output?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            // The CLI prints an error envelope on stdout for model-side failures.
            if let Ok(envelope) = serde_json::from_str::<ResultEnvelope>(stdout.trim()) {
                if envelope.is_error {
                    return Err(GenerationError::ModelError(envelope.error_message()));
                }
            }
            return Err(GenerationError::ExitStatus {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        let generation = parse_result_envelope(&stdout, started.elapsed())?;
        info!(
            generator = self.name(),
            cost_usd = generation.cost_usd,
            duration_ms = generation.duration.as_millis() as u64,
            output_bytes = generation.text.len(),
            "generation finished"
        );
        Ok(generation)
    }
}

// ---------------------------------------------------------------------------
// Result envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    subtype: Option<String>,
    #[serde(default)]
    is_error: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default, alias = "cost_usd")]
    total_cost_usd: f64,
    #[serde(default)]
    duration_ms: u64,
}

impl ResultEnvelope {
    fn error_message(&self) -> String {
        self.result
            .clone()
            .or_else(|| self.subtype.clone())
            .unwrap_or_else(|| "unknown error".to_owned())
    }
}

/// Parse the JSON envelope printed by `claude -p --output-format json`.
///
/// `elapsed` is used as the duration when the envelope does not carry one.
fn parse_result_envelope(stdout: &str, elapsed: Duration) -> Result<Generation, GenerationError> {
    let envelope: ResultEnvelope = serde_json::from_str(stdout.trim())
        .map_err(|e| GenerationError::MalformedOutput(format!("invalid result JSON: {e}")))?;

    if envelope.is_error {
        return Err(GenerationError::ModelError(envelope.error_message()));
    }

    let text = envelope
        .result
        .ok_or_else(|| GenerationError::MalformedOutput("result envelope has no `result` field".to_owned()))?;

    let duration = if envelope.duration_ms > 0 {
        Duration::from_millis(envelope.duration_ms)
    } else {
        elapsed
    };

    Ok(Generation {
        text,
        cost_usd: envelope.total_cost_usd,
        duration,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
