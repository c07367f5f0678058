//! Turn model-generated task breakdowns into validated, dependency-ordered
//! execution plans.
//!
//! ```text
//! Architecture --Decomposer--> Generator --text--> parser --> validate --> graph::schedule --> TaskGraph
//! ```
//!
//! The parser, validator and scheduler are pure functions of their input and
//! can be used on their own.

pub mod decompose;
pub mod generate;
pub mod graph;
pub mod model;
pub mod parser;
pub mod validate;

pub use decompose::{DecomposeError, Decomposer, DecomposerConfig, Phase, PipelineError};
pub use generate::{
    ClaudeCliGenerator, DefaultPromptBuilder, Generation, GenerationError, Generator,
    PromptBuilder,
};
pub use graph::{
    DependencyGraph, GraphError, GraphErrorKind, batches_for_order, execution_batches, schedule,
};
pub use model::{
    Architecture, Complexity, Component, GenerationMetadata, Task, TaskGraph, TaskStatus,
    is_valid_task_id,
};
pub use parser::{ParseError, ParseReport, SkipReason, SkippedSection, parse_tasks, parse_tasks_with_report};
pub use validate::{ValidationError, ValidationField, validate, validate_all};
