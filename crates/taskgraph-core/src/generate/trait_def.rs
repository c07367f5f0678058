//! The `Generator` trait -- the adapter interface for text generation.
//!
//! The decomposer never talks to a model directly. It hands a prompt to a
//! `Generator` and gets back raw text plus cost and timing. The trait is
//! object-safe so it can be held as `Arc<dyn Generator>`.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Output of one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Raw model output.
    pub text: String,
    /// Cost of the call in USD, as reported by the backend.
    pub cost_usd: f64,
    /// Duration of the call, as reported by the backend.
    pub duration: Duration,
}

/// Errors a [`Generator`] can return.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The caller cancelled the request.
    #[error("generation cancelled")]
    Cancelled,

    #[error("failed to start generator {program:?}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error talking to generator: {0}")]
    Io(#[from] std::io::Error),

    #[error("generator exited with status {code:?}: {stderr}")]
    ExitStatus { code: Option<i32>, stderr: String },

    #[error("malformed generator output: {0}")]
    MalformedOutput(String),

    /// The backend ran but reported a failure of its own.
    #[error("model reported an error: {0}")]
    ModelError(String),
}

/// Adapter interface for anything that turns a prompt into text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Human-readable name for this generator (e.g. "claude-cli").
    fn name(&self) -> &str;

    /// Run one generation.
    ///
    /// Implementations must return [`GenerationError::Cancelled`] promptly
    /// once `cancel` fires, including when it is already cancelled on entry.
    async fn execute(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Generation, GenerationError>;
}

// Compile-time assertion: Generator must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn Generator) {}
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes the prompt back, used only to prove the trait can be
    /// implemented and used as `dyn Generator`.
    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        fn name(&self) -> &str {
            "echo"
        }

        async fn execute(
            &self,
            cancel: &CancellationToken,
            prompt: &str,
        ) -> Result<Generation, GenerationError> {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }
            Ok(Generation {
                text: prompt.to_owned(),
                cost_usd: 0.0,
                duration: Duration::ZERO,
            })
        }
    }

    #[tokio::test]
    async fn generator_is_object_safe() {
        let generator: Box<dyn Generator> = Box::new(EchoGenerator);
        assert_eq!(generator.name(), "echo");

        let out = generator
            .execute(&CancellationToken::new(), "hello")
            .await
            .unwrap();
        assert_eq!(out.text, "hello");
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = EchoGenerator.execute(&cancel, "hello").await.unwrap_err();
        assert!(matches!(err, GenerationError::Cancelled));
    }

    #[test]
    fn exit_status_display() {
        let err = GenerationError::ExitStatus {
            code: Some(2),
            stderr: "boom".to_owned(),
        };
        assert_eq!(err.to_string(), "generator exited with status Some(2): boom");
    }
}
