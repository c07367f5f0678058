//! Structural and referential validation of a task list.
//!
//! Checks, in order:
//! - The list is non-empty.
//! - Every id matches the `T###` pattern.
//! - Ids are unique.
//! - Every dependency refers to a task in the list.
//! - No task depends on itself.
//! - Every task has a title and a description (diagnostic mode only).
//!
//! [`validate`] stops at the first problem; [`validate_all`] reports every
//! problem. Both run the same check sequence.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use thiserror::Error;

use crate::model::{Task, is_valid_task_id};

/// The part of a task list a [`ValidationError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationField {
    /// The list as a whole.
    Tasks,
    Id,
    Dependencies,
    Title,
    Description,
}

impl ValidationField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::Id => "id",
            Self::Dependencies => "dependencies",
            Self::Title => "title",
            Self::Description => "description",
        }
    }
}

impl fmt::Display for ValidationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One structural problem in a task list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}{}: {message}", .task_id.as_deref().map(|id| format!(" on task {id}")).unwrap_or_default())]
pub struct ValidationError {
    pub field: ValidationField,
    /// The offending task, when the problem belongs to one.
    pub task_id: Option<String>,
    pub message: String,
}

impl ValidationError {
    fn new(field: ValidationField, task_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            field,
            task_id: task_id.map(str::to_owned),
            message: message.into(),
        }
    }
}

/// Validate `tasks`, returning the first problem found.
pub fn validate(tasks: &[Task]) -> Result<(), ValidationError> {
    let mut first = None;
    let _ = run_checks(tasks, Mode::FailFast, &mut |err| {
        first = Some(err);
        ControlFlow::Break(())
    });
    match first {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Validate `tasks`, returning every problem found.
pub fn validate_all(tasks: &[Task]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let _ = run_checks(tasks, Mode::Diagnostic, &mut |err| {
        errors.push(err);
        ControlFlow::Continue(())
    });
    errors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FailFast,
    Diagnostic,
}

type Sink<'a> = dyn FnMut(ValidationError) -> ControlFlow<()> + 'a;

fn run_checks(tasks: &[Task], mode: Mode, sink: &mut Sink<'_>) -> ControlFlow<()> {
    if tasks.is_empty() {
        sink(ValidationError::new(
            ValidationField::Tasks,
            None,
            "task list is empty",
        ))?;
        return ControlFlow::Break(());
    }

    for task in tasks {
        if !is_valid_task_id(&task.id) {
            sink(ValidationError::new(
                ValidationField::Id,
                Some(&task.id),
                format!("task id {:?} does not match the pattern T###", task.id),
            ))?;
        }
    }

    let mut ids: HashSet<&str> = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !ids.insert(task.id.as_str()) {
            sink(ValidationError::new(
                ValidationField::Id,
                Some(&task.id),
                format!("duplicate task id {}", task.id),
            ))?;
        }
    }

    for task in tasks {
        for dep in &task.dependencies {
            if !ids.contains(dep.as_str()) {
                sink(ValidationError::new(
                    ValidationField::Dependencies,
                    Some(&task.id),
                    format!("task {} depends on unknown task {dep}", task.id),
                ))?;
            }
        }
    }

    for task in tasks {
        if task.dependencies.iter().any(|dep| *dep == task.id) {
            sink(ValidationError::new(
                ValidationField::Dependencies,
                Some(&task.id),
                format!("task {} cannot depend on itself", task.id),
            ))?;
        }
    }

    if mode == Mode::Diagnostic {
        for task in tasks {
            if task.title.trim().is_empty() {
                sink(ValidationError::new(
                    ValidationField::Title,
                    Some(&task.id),
                    format!("task {} has an empty title", task.id),
                ))?;
            }
            if task.description.trim().is_empty() {
                sink(ValidationError::new(
                    ValidationField::Description,
                    Some(&task.id),
                    format!("task {} has an empty description", task.id),
                ))?;
            }
        }
    }

    ControlFlow::Continue(())
}
