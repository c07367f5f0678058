//! Shared test utilities for taskgraph integration tests.
//!
//! Provides task fixtures, sample model output, and [`ScriptedGenerator`],
//! an in-memory [`Generator`] that replays canned responses.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use taskgraph_core::{Architecture, Component, Generation, GenerationError, Generator, Task};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Build a task with a generated title and description.
pub fn task(id: &str, deps: &[&str]) -> Task {
    let mut t = Task::new(id, format!("Task {id}"), format!("Implement {id}."));
    t.dependencies = deps.iter().map(|d| (*d).to_owned()).collect();
    t
}

/// The diamond: T002 and T003 depend on T001, T004 depends on both.
pub fn diamond() -> Vec<Task> {
    vec![
        task("T001", &[]),
        task("T002", &["T001"]),
        task("T003", &["T001"]),
        task("T004", &["T002", "T003"]),
    ]
}

/// A small but realistic architecture description.
pub fn sample_architecture() -> Architecture {
    Architecture {
        name: "bookmarks".to_owned(),
        overview: "A bookmark manager with a REST API and SQLite storage.".to_owned(),
        components: vec![
            Component {
                name: "store".to_owned(),
                responsibility: "SQLite persistence for bookmarks and tags".to_owned(),
                paths: vec!["src/store".to_owned()],
            },
            Component {
                name: "api".to_owned(),
                responsibility: "HTTP handlers".to_owned(),
                paths: vec!["src/api".to_owned()],
            },
        ],
        technologies: vec!["rust".to_owned(), "sqlite".to_owned()],
        constraints: vec!["No network access in tests".to_owned()],
    }
}

/// Well-formed model output describing the diamond.
pub const DIAMOND_OUTPUT: &str = "\
Here is the plan.

## Task T001: Define bookmark types
**Description:** Add the `Bookmark` and `Tag` structs shared by the store and API.
**Dependencies:** none
**Files:** src/model.rs
**Complexity:** small
**Success Criteria:**
- types compile
- serde round-trips JSON

## Task T002: Implement the SQLite store
**Description:** CRUD operations for bookmarks.
**Dependencies:** T001
**Files:** src/store/mod.rs, src/store/schema.sql
**Complexity:** medium

## Task T003: Implement the HTTP handlers
**Description:** REST endpoints for bookmarks.
**Dependencies:** [T001]
**Files:** src/api/mod.rs
**Complexity:** medium

## Task T004: Wire up the server
**Description:** Connect the handlers to the store and start the server.
**Dependencies:** T002, T003
**Files:** src/main.rs
**Complexity:** small
";

/// Model output whose tasks depend on each other in a loop.
pub const CYCLIC_OUTPUT: &str = "\
Task T001: First
Description: Needs the second.
Dependencies: T002

Task T002: Second
Description: Needs the first.
Dependencies: T001
";

/// Model output with a dependency on a task that does not exist.
pub const DANGLING_OUTPUT: &str = "\
Task T001: Lonely
Description: Depends on a ghost.
Dependencies: T999

Task T002: Follower
Description: Depends on the first task.
Dependencies: T001
";

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// One canned reply from a [`ScriptedGenerator`].
#[derive(Debug, Clone)]
pub enum Reply {
    /// Return this text.
    Text(String),
    /// Fail with [`GenerationError::ModelError`].
    Fail(String),
    /// Wait for cancellation, then return [`GenerationError::Cancelled`].
    Hang,
}

/// A [`Generator`] that replays a fixed script of replies.
///
/// When the script runs out, the last reply is repeated. Every prompt it
/// receives is recorded for inspection.
#[derive(Debug)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    cost_usd: f64,
    duration: Duration,
}

impl ScriptedGenerator {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            cost_usd: 0.05,
            duration: Duration::from_millis(1200),
        }
    }

    /// A generator that always returns `text`.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self::new([Reply::Text(text.into())])
    }

    /// Override the cost and duration reported with each reply.
    pub fn reporting(mut self, cost_usd: f64, duration: Duration) -> Self {
        self.cost_usd = cost_usd;
        self.duration = duration;
        self
    }

    /// Number of `execute` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    fn next_reply(&self) -> Option<Reply> {
        let mut replies = self.replies.lock().expect("reply script poisoned");
        let mut last = self.last.lock().expect("reply script poisoned");
        if let Some(reply) = replies.pop_front() {
            *last = Some(reply);
        }
        last.clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn execute(
        &self,
        cancel: &CancellationToken,
        prompt: &str,
    ) -> Result<Generation, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_owned());

        if cancel.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        match self.next_reply() {
            Some(Reply::Text(text)) => Ok(Generation {
                text,
                cost_usd: self.cost_usd,
                duration: self.duration,
            }),
            Some(Reply::Fail(message)) => Err(GenerationError::ModelError(message)),
            Some(Reply::Hang) => {
                cancel.cancelled().await;
                Err(GenerationError::Cancelled)
            }
            None => Err(GenerationError::MalformedOutput("script is empty".to_owned())),
        }
    }
}
