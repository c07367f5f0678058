//! Parser for model-generated task breakdowns.
//!
//! The model is asked to emit one block per task:
//!
//! ```text
//! Task T001: Set up the workspace
//! Description: Create the cargo workspace and CI config.
//! Dependencies: none
//! Files: Cargo.toml, .github/workflows/ci.yml
//! Complexity: small
//! Success Criteria:
//! - `cargo build` succeeds
//! ```
//!
//! Output is rarely that tidy, so parsing is lenient: headers and field
//! names may carry Markdown heading hashes, bullets or bold markers, field
//! names are case-insensitive, and field values may continue on indented or
//! list-item lines directly below the field. A blank line or any other
//! unindented line ends the field, so commentary between or after tasks is
//! never folded into a value. A section whose header cannot be parsed, or
//! that has no description, is skipped; the whole parse only fails when no
//! section yields a task.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Complexity, Task, is_valid_task_id};

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:[-*+][ \t]+)?(?:\*\*|__)?[ \t]*task[ \t]+\[?([a-z]*\d+)\]?[ \t]*(?:\*\*|__)?[ \t]*:(.*)$",
    )
    .expect("header pattern is valid")
});

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^[ \t]*(?:[-*+][ \t]+)?(?:\*\*|__)?[ \t]*(description|dependencies|depends[ \t]+on|files|complexity|success[ \t]+criteria|acceptance[ \t]+criteria)[ \t]*(?:\*\*|__)?[ \t]*:[ \t]*(?:\*\*|__)?(.*)$",
    )
    .expect("field pattern is valid")
});

static TASK_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bT\d{3}\b").expect("task reference pattern is valid"));

static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*+\u{2022}]|\d+[.)])[ \t]+(?:\[[ xX]\][ \t]*)?")
        .expect("list item pattern is valid")
});

static SEPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(?:-{3,}|\*{3,}|_{3,}|={3,})[ \t]*$").expect("separator pattern is valid")
});

static FILE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("file split pattern is valid"));

/// Tokens that explicitly mark an empty dependency list.
const NO_DEPENDENCY_TOKENS: &[&str] = &["none", "n/a", "na", "-"];

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Errors returned by [`parse_tasks`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No section of the input produced a task.
    #[error("no tasks found in model output")]
    NoTasksFound,
}

/// Why a task section was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The header id does not match the `T###` pattern.
    InvalidId(String),
    /// The header carries no title after the colon.
    EmptyTitle,
    /// The section has no `Description:` text.
    EmptyDescription,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId(id) => write!(f, "invalid task id {id:?} (expected T followed by three digits)"),
            Self::EmptyTitle => f.write_str("missing task title"),
            Self::EmptyDescription => f.write_str("missing task description"),
        }
    }
}

/// A section that looked like a task header but could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSection {
    /// 1-based line number of the header.
    pub line: usize,
    /// The header line as it appeared in the input.
    pub header: String,
    pub reason: SkipReason,
}

/// Tasks recovered from a parse, plus the sections that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub tasks: Vec<Task>,
    pub skipped: Vec<SkippedSection>,
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Parse model output into tasks, in the order they appear.
///
/// Skipped sections are logged at `warn` level. Use
/// [`parse_tasks_with_report`] to inspect them programmatically.
pub fn parse_tasks(text: &str) -> Result<Vec<Task>, ParseError> {
    let report = parse_tasks_with_report(text)?;
    for section in &report.skipped {
        warn!(
            line = section.line,
            header = %section.header,
            reason = %section.reason,
            "skipped unparseable task section"
        );
    }
    Ok(report.tasks)
}

/// Parse model output, reporting every skipped section alongside the tasks.
pub fn parse_tasks_with_report(text: &str) -> Result<ParseReport, ParseError> {
    let headers: Vec<_> = HEADER_RE.captures_iter(text).collect();
    let mut report = ParseReport::default();

    for (i, caps) in headers.iter().enumerate() {
        let Some(header) = caps.get(0) else { continue };
        let body_end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map_or(text.len(), |m| m.start());
        let raw_id = caps.get(1).map_or("", |m| m.as_str());
        let raw_title = caps.get(2).map_or("", |m| m.as_str());

        let parsed = parse_header(raw_id, raw_title).and_then(|(id, title)| {
            let task = parse_section_body(id, title, &text[header.end()..body_end]);
            if task.description.trim().is_empty() {
                return Err(SkipReason::EmptyDescription);
            }
            Ok(task)
        });
        match parsed {
            Ok(task) => report.tasks.push(task),
            Err(reason) => report.skipped.push(SkippedSection {
                line: text[..header.start()].matches('\n').count() + 1,
                header: header.as_str().trim().to_owned(),
                reason,
            }),
        }
    }

    if report.tasks.is_empty() {
        return Err(ParseError::NoTasksFound);
    }

    debug!(
        tasks = report.tasks.len(),
        skipped = report.skipped.len(),
        "parsed task sections"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Section parsing
// ---------------------------------------------------------------------------

fn parse_header(raw_id: &str, raw_title: &str) -> Result<(String, String), SkipReason> {
    let id = raw_id.trim();
    if !is_valid_task_id(id) {
        return Err(SkipReason::InvalidId(id.to_owned()));
    }
    let title = strip_emphasis(raw_title);
    if title.is_empty() {
        return Err(SkipReason::EmptyTitle);
    }
    Ok((id.to_owned(), title.to_owned()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Description,
    Dependencies,
    Files,
    Complexity,
    SuccessCriteria,
}

impl Field {
    fn from_marker(marker: &str) -> Option<Self> {
        let normalized = marker
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "description" => Some(Self::Description),
            "dependencies" | "depends on" => Some(Self::Dependencies),
            "files" => Some(Self::Files),
            "complexity" => Some(Self::Complexity),
            "success criteria" | "acceptance criteria" => Some(Self::SuccessCriteria),
            _ => None,
        }
    }
}

/// Raw field text collected from one section before interpretation.
#[derive(Debug, Default)]
struct SectionFields {
    description: Vec<String>,
    /// Value on the `Dependencies:` line itself; absence tokens only count here.
    dependencies_inline: Option<String>,
    dependencies: String,
    files: String,
    complexity: Option<String>,
    success_criteria: Vec<String>,
}

impl SectionFields {
    fn start(&mut self, field: Field, value: &str) {
        let value = value.trim();
        match field {
            Field::Description => {
                if !value.is_empty() {
                    self.description.push(value.to_owned());
                }
            }
            Field::Dependencies => {
                if self.dependencies_inline.is_none() {
                    self.dependencies_inline = Some(value.to_owned());
                }
                self.dependencies.push_str(value);
                self.dependencies.push('\n');
            }
            Field::Files => {
                self.files.push_str(value);
                self.files.push('\n');
            }
            Field::Complexity => {
                if !value.is_empty() {
                    self.complexity = Some(value.to_owned());
                }
            }
            Field::SuccessCriteria => self.push_criterion(value),
        }
    }

    fn continue_with(&mut self, field: Field, line: &str) {
        let line = line.trim();
        match field {
            Field::Description => self.description.push(line.to_owned()),
            Field::Dependencies => {
                self.dependencies.push_str(line);
                self.dependencies.push('\n');
            }
            Field::Files => {
                self.files.push_str(line);
                self.files.push('\n');
            }
            // Complexity is a single token; anything after it is noise.
            Field::Complexity => {}
            Field::SuccessCriteria => self.push_criterion(line),
        }
    }

    fn push_criterion(&mut self, line: &str) {
        let item = LIST_ITEM_RE.replace(line.trim(), "");
        let item = item.trim();
        if !item.is_empty() {
            self.success_criteria.push(item.to_owned());
        }
    }
}

fn parse_section_body(id: String, title: String, body: &str) -> Task {
    let mut fields = SectionFields::default();
    let mut current: Option<Field> = None;

    for line in body.lines() {
        if SEPARATOR_RE.is_match(line) {
            current = None;
            continue;
        }
        if let Some(caps) = FIELD_RE.captures(line) {
            let marker = caps.get(1).map_or("", |m| m.as_str());
            if let Some(field) = Field::from_marker(marker) {
                fields.start(field, caps.get(2).map_or("", |m| m.as_str()));
                current = Some(field);
                continue;
            }
        }
        if let Some(field) = current {
            if is_continuation(line) {
                fields.continue_with(field, line);
            } else {
                current = None;
            }
        }
    }

    let complexity = fields.complexity.as_deref().and_then(|raw| {
        let token = strip_emphasis(raw.split_whitespace().next().unwrap_or(""));
        match token.trim_end_matches(['.', ',', ';']).parse::<Complexity>() {
            Ok(c) => Some(c),
            Err(e) => {
                debug!(task_id = %id, error = %e, "ignoring unrecognised complexity");
                None
            }
        }
    });

    let mut task = Task::new(id, title, fields.description.join("\n"));
    task.dependencies = parse_dependencies(fields.dependencies_inline.as_deref(), &fields.dependencies);
    task.files = parse_files(&fields.files);
    task.complexity = complexity;
    task.success_criteria = fields.success_criteria;
    task
}

/// Whether `line` carries on the field above it: indented text or a list item.
fn is_continuation(line: &str) -> bool {
    !line.trim().is_empty() && (line.starts_with([' ', '\t']) || LIST_ITEM_RE.is_match(line))
}

/// Extract dependency ids in order of first appearance, without duplicates.
///
/// An inline value that opens with an absence token (`none`, `n/a`, `-`)
/// yields no dependencies regardless of what follows.
fn parse_dependencies(inline: Option<&str>, text: &str) -> Vec<String> {
    if inline.is_some_and(declares_no_dependencies) {
        return Vec::new();
    }
    let mut deps: Vec<String> = Vec::new();
    for m in TASK_REF_RE.find_iter(text) {
        if !deps.iter().any(|d| d == m.as_str()) {
            deps.push(m.as_str().to_owned());
        }
    }
    deps
}

fn declares_no_dependencies(inline: &str) -> bool {
    let first = inline.split_whitespace().next().unwrap_or("");
    let token = first
        .trim_matches(|c: char| matches!(c, '*' | '_' | '`' | '.' | ',' | ';' | '(' | ')' | '[' | ']'))
        .to_ascii_lowercase();
    NO_DEPENDENCY_TOKENS.contains(&token.as_str())
}

fn parse_files(text: &str) -> Vec<String> {
    FILE_SPLIT_RE
        .split(text)
        .map(|token| token.trim_matches(|c: char| matches!(c, '`' | '"' | '\'')))
        .filter(|token| !token.is_empty() && *token != "-")
        .map(str::to_owned)
        .collect()
}

fn strip_emphasis(s: &str) -> &str {
    s.trim().trim_matches(|c: char| c == '*' || c == '_').trim()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
