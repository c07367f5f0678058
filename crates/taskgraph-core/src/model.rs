//! Core data model: tasks, the finished task graph, and the architecture
//! description that drives generation.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task ids are `T` followed by exactly three digits.
static TASK_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T\d{3}$").expect("task id pattern is valid"));

/// Return `true` if `id` matches the task id pattern exactly (e.g. `T001`).
pub fn is_valid_task_id(id: &str) -> bool {
    TASK_ID_RE.is_match(id)
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = TaskStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(TaskStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TaskStatus`] string.
#[derive(Debug, Clone)]
pub struct TaskStatusParseError(pub String);

impl fmt::Display for TaskStatusParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid task status: {:?}", self.0)
    }
}

impl std::error::Error for TaskStatusParseError {}

// ---------------------------------------------------------------------------

/// Rough size estimate attached to a task by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Small,
    Medium,
    Large,
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
        };
        f.write_str(s)
    }
}

impl FromStr for Complexity {
    type Err = ComplexityParseError;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "large" => Ok(Self::Large),
            _ => Err(ComplexityParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`Complexity`] string.
#[derive(Debug, Clone)]
pub struct ComplexityParseError(pub String);

impl fmt::Display for ComplexityParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid complexity: {:?}", self.0)
    }
}

impl std::error::Error for ComplexityParseError {}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A single unit of work extracted from model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Task id, e.g. `T001`.
    pub id: String,
    pub title: String,
    pub description: String,
    /// Ids of tasks that must finish before this one, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Files the task is expected to touch. Advisory only.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<Complexity>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub success_criteria: Vec<String>,
    /// Set by whoever executes the task; never written here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task with no dependencies, files or criteria.
    pub fn new(id: impl Into<String>, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            dependencies: Vec::new(),
            files: Vec::new(),
            status: TaskStatus::Pending,
            complexity: None,
            success_criteria: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }
}

// ---------------------------------------------------------------------------
// TaskGraph
// ---------------------------------------------------------------------------

/// Generation bookkeeping attached to every [`TaskGraph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetadata {
    pub created_at: DateTime<Utc>,
    /// Cost reported by the generation client, in USD.
    pub cost_usd: f64,
    /// Duration reported by the generation client.
    pub generation_duration_ms: u64,
    /// Wall time of the whole decomposition pipeline.
    pub pipeline_duration_ms: u64,
}

/// The validated, dependency-ordered result of one decomposition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    pub id: Uuid,
    /// Tasks in parse order, not execution order.
    pub tasks: Vec<Task>,
    /// A topological ordering of the task ids.
    pub execution_order: Vec<String>,
    /// The model output the tasks were parsed from.
    pub raw_output: String,
    pub metadata: GenerationMetadata,
}

impl TaskGraph {
    /// Look up a task by id.
    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks arranged in execution order.
    pub fn ordered_tasks(&self) -> Vec<&Task> {
        self.execution_order
            .iter()
            .filter_map(|id| self.task(id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Architecture
// ---------------------------------------------------------------------------

/// Architecture description handed to the model for decomposition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Architecture {
    pub name: String,
    pub overview: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// One component of an [`Architecture`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub responsibility: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

impl Architecture {
    /// Parse an architecture description from TOML.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_pattern() {
        assert!(is_valid_task_id("T001"));
        assert!(is_valid_task_id("T999"));
        assert!(!is_valid_task_id("T01"));
        assert!(!is_valid_task_id("T0001"));
        assert!(!is_valid_task_id("t001"));
        assert!(!is_valid_task_id(" T001"));
        assert!(!is_valid_task_id(""));
    }

    #[test]
    fn status_display_and_parse() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::Completed,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn complexity_parse_is_case_insensitive() {
        assert_eq!("Small".parse::<Complexity>().unwrap(), Complexity::Small);
        assert_eq!(" LARGE ".parse::<Complexity>().unwrap(), Complexity::Large);
        let err = "huge".parse::<Complexity>().unwrap_err();
        assert_eq!(err.to_string(), "invalid complexity: \"huge\"");
    }

    #[test]
    fn task_serializes_status_in_snake_case() {
        let mut task = Task::new("T001", "Setup", "Create the workspace");
        task.status = TaskStatus::InProgress;
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert!(json.get("complexity").is_none());
        assert!(json.get("started_at").is_none());
    }

    #[test]
    fn task_deserializes_with_defaults() {
        let task: Task = serde_json::from_str(
            r#"{"id":"T002","title":"Build","description":"Compile it"}"#,
        )
        .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.dependencies.is_empty());
        assert!(task.files.is_empty());
    }

    #[test]
    fn ordered_tasks_follow_execution_order() {
        let graph = TaskGraph {
            id: Uuid::new_v4(),
            tasks: vec![
                Task::new("T002", "Second", "b"),
                Task::new("T001", "First", "a"),
            ],
            execution_order: vec!["T001".to_owned(), "T002".to_owned()],
            raw_output: String::new(),
            metadata: GenerationMetadata {
                created_at: Utc::now(),
                cost_usd: 0.0,
                generation_duration_ms: 0,
                pipeline_duration_ms: 0,
            },
        };
        let ids: Vec<&str> = graph.ordered_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T001", "T002"]);
        assert!(graph.task("T003").is_none());
    }

    #[test]
    fn architecture_from_toml() {
        let arch = Architecture::from_toml_str(
            r#"
name = "inventory"
overview = "A small inventory service."
technologies = ["rust", "postgres"]

[[components]]
name = "api"
responsibility = "HTTP handlers"
paths = ["src/api"]
"#,
        )
        .unwrap();
        assert_eq!(arch.name, "inventory");
        assert_eq!(arch.components.len(), 1);
        assert_eq!(arch.components[0].paths, vec!["src/api"]);
        assert!(arch.constraints.is_empty());
    }
}
