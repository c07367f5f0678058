//! Text generation: the [`Generator`] adapter interface, the Claude CLI
//! implementation, and prompt construction.
//!
//! # Architecture
//!
//! ```text
//! Decomposer
//!     |
//!     |  PromptBuilder::build(architecture) --> prompt
//!     v
//! Arc<dyn Generator> --execute(cancel, prompt)--> Generation { text, cost_usd, duration }
//! ```

pub mod claude_cli;
pub mod prompt;
pub mod trait_def;

pub use claude_cli::ClaudeCliGenerator;
pub use prompt::{DefaultPromptBuilder, PromptBuilder};
pub use trait_def::{Generation, GenerationError, Generator};
