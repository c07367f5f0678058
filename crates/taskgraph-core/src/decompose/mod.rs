//! Decomposition pipeline: architecture in, ordered task graph out.
//!
//! Steps:
//! 1. Reject a missing architecture.
//! 2. Build the prompt and run the generator (phase `generate`).
//! 3. Parse the output into tasks.
//! 4. Validate the tasks, fail-fast, when `validate_output` is set (phase
//!    `validate`).
//! 5. Compute the execution order.
//! 6. Assemble the [`TaskGraph`] with generation metadata.
//!
//! The generator call is the only await point. Everything after it is
//! synchronous and keeps no state between calls, so one [`Decomposer`] can
//! serve many concurrent decompositions.

pub mod error;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::generate::{DefaultPromptBuilder, GenerationError, Generator, PromptBuilder};
use crate::graph::schedule;
use crate::model::{Architecture, GenerationMetadata, TaskGraph};
use crate::parser::parse_tasks;
use crate::validate::validate;

pub use error::{DecomposeError, Phase, PipelineError};

/// Settings for a [`Decomposer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposerConfig {
    /// Run fail-fast validation on parsed tasks before scheduling.
    pub validate_output: bool,
    /// Accepted for configuration compatibility; generation is never retried.
    pub max_retries: u32,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            validate_output: true,
            max_retries: 0,
        }
    }
}

/// Turns an [`Architecture`] into a validated, ordered [`TaskGraph`].
pub struct Decomposer {
    generator: Arc<dyn Generator>,
    prompt_builder: Arc<dyn PromptBuilder>,
    config: DecomposerConfig,
}

impl std::fmt::Debug for Decomposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decomposer")
            .field("generator", &self.generator.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Decomposer {
    /// Create a decomposer with the default prompt builder and config.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            prompt_builder: Arc::new(DefaultPromptBuilder),
            config: DecomposerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DecomposerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_prompt_builder(mut self, builder: impl PromptBuilder + 'static) -> Self {
        self.prompt_builder = Arc::new(builder);
        self
    }

    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    /// Run the full pipeline for `architecture`.
    ///
    /// Cancellation is observed only while the generator runs and surfaces
    /// as [`DecomposeError::Cancelled`].
    pub async fn decompose(
        &self,
        cancel: &CancellationToken,
        architecture: Option<&Architecture>,
    ) -> Result<TaskGraph, DecomposeError> {
        let architecture = architecture.ok_or(DecomposeError::NoArchitecture)?;
        let started = Instant::now();
        let created_at = Utc::now();

        info!(
            generator = self.generator.name(),
            architecture = %architecture.name,
            "decomposing architecture"
        );

        let prompt = self.prompt_builder.build(architecture);
        let generation = self
            .generator
            .execute(cancel, &prompt)
            .await
            .map_err(|e| match e {
                GenerationError::Cancelled => DecomposeError::Cancelled,
                other => PipelineError::new(Phase::Generate, "generation failed", other).into(),
            })?;

        let tasks = parse_tasks(&generation.text)?;
        debug!(tasks = tasks.len(), "parsed generated tasks");

        if self.config.validate_output {
            validate(&tasks).map_err(|e| {
                PipelineError::new(Phase::Validate, "generated tasks failed validation", e)
            })?;
        } else {
            debug!("output validation disabled");
        }

        let execution_order = schedule(&tasks)?;

        let pipeline_duration = started.elapsed();
        info!(
            tasks = tasks.len(),
            cost_usd = generation.cost_usd,
            generation_ms = generation.duration.as_millis() as u64,
            pipeline_ms = pipeline_duration.as_millis() as u64,
            "decomposition complete"
        );

        Ok(TaskGraph {
            id: Uuid::new_v4(),
            tasks,
            execution_order,
            raw_output: generation.text,
            metadata: GenerationMetadata {
                created_at,
                cost_usd: generation.cost_usd,
                generation_duration_ms: generation.duration.as_millis() as u64,
                pipeline_duration_ms: pipeline_duration.as_millis() as u64,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = DecomposerConfig::default();
        assert!(config.validate_output);
        assert_eq!(config.max_retries, 0);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: DecomposerConfig = toml::from_str("max_retries = 3").unwrap();
        assert!(config.validate_output);
        assert_eq!(config.max_retries, 3);

        let config: DecomposerConfig = toml::from_str("validate_output = false").unwrap();
        assert!(!config.validate_output);
    }
}
