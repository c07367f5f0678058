//! Error taxonomy for the decomposition pipeline.

use std::fmt;

use thiserror::Error;

use crate::generate::GenerationError;
use crate::graph::GraphError;
use crate::parser::ParseError;
use crate::validate::ValidationError;

/// Pipeline stage a [`PipelineError`] was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Generate,
    Validate,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generate => f.write_str("generate"),
            Self::Validate => f.write_str("validate"),
        }
    }
}

/// A failure at the generate or validate stage, wrapping its cause.
#[derive(Debug, Error)]
#[error("{phase} phase failed: {message}")]
pub struct PipelineError {
    pub phase: Phase,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl PipelineError {
    pub fn new(
        phase: Phase,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            phase,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The underlying validation failure, for [`Phase::Validate`] errors.
    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.source.as_deref()?.downcast_ref()
    }

    /// The underlying generator failure, for [`Phase::Generate`] errors.
    pub fn generation_error(&self) -> Option<&GenerationError> {
        self.source.as_deref()?.downcast_ref()
    }
}

/// Errors returned by [`super::Decomposer::decompose`].
///
/// `NoArchitecture` and `Parse(ParseError::NoTasksFound)` are fixed values
/// that callers can match on directly.
#[derive(Debug, Error)]
pub enum DecomposeError {
    #[error("no architecture provided")]
    NoArchitecture,

    /// The caller cancelled while the generator was running.
    #[error("decomposition cancelled")]
    Cancelled,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl DecomposeError {
    /// The pipeline phase this error was raised in, if it carries one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Pipeline(e) => Some(e.phase),
            _ => None,
        }
    }
}
