//! Prompt construction for task decomposition.
//!
//! Renders an [`Architecture`] into the prompt sent to the generator. The
//! prompt pins down the exact text format the parser accepts, so changes
//! to one must be mirrored in the other.

use crate::model::Architecture;

/// Renders an architecture into a generation prompt.
pub trait PromptBuilder: Send + Sync {
    fn build(&self, architecture: &Architecture) -> String;
}

/// Output format reference included in every prompt.
const FORMAT_REFERENCE: &str = r#"## Output Format

Emit one block per task, in this exact shape:

```text
Task T001: <short imperative title>
Description: <what to build and how, one or more lines>
Dependencies: none
Files: path/to/file.rs, path/to/other.rs
Complexity: small
Success Criteria:
- <observable acceptance statement>
- <another statement>
```

### Field rules
- **Task ids** are `T` followed by exactly three digits (`T001`, `T002`, ...), unique across the plan.
- **Dependencies** lists the ids this task needs finished first, e.g. `T001, T003`. Write `none` when there are none. Never list the task's own id.
- **Files** is a comma-separated list of paths the task will create or modify.
- **Complexity** is one of `small`, `medium`, `large`.
- **Success Criteria** is optional but strongly preferred.
"#;

/// Task decomposition guidelines included in every prompt.
const DECOMPOSITION_GUIDELINES: &str = r#"## Decomposition Guidelines

1. **Prefer small tasks.** A task that touches 1-3 files is ideal.
2. **Define shared types first.** If several tasks share types or interfaces, create a task that defines them and make the others depend on it.
3. **Only declare real dependencies.** Tasks without dependencies can run in parallel; do not chain tasks that are independent.
4. **No cycles.** The dependency relation must form a directed acyclic graph.
5. **Write self-contained descriptions.** Whoever executes a task sees only its description and the codebase.
6. **Number tasks in a sensible order.** Lower ids should generally come before the tasks that depend on them.
"#;

/// The prompt builder used when none is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPromptBuilder;

impl PromptBuilder for DefaultPromptBuilder {
    fn build(&self, architecture: &Architecture) -> String {
        let mut prompt = String::with_capacity(4096);

        prompt.push_str("# Task Decomposition\n\n");
        prompt.push_str(
            "You are a senior engineer breaking a software architecture down into \
             a dependency-ordered set of implementation tasks. Respond with the task \
             list only, using the format below. Do not add any other commentary.\n\n",
        );

        prompt.push_str(FORMAT_REFERENCE);
        prompt.push('\n');
        prompt.push_str(DECOMPOSITION_GUIDELINES);
        prompt.push('\n');

        prompt.push_str("## Architecture\n\n");
        if architecture.name.is_empty() {
            prompt.push_str("- **Name:** (unnamed)\n");
        } else {
            prompt.push_str(&format!("- **Name:** {}\n", architecture.name));
        }
        if !architecture.technologies.is_empty() {
            prompt.push_str(&format!(
                "- **Technologies:** {}\n",
                architecture.technologies.join(", ")
            ));
        }
        prompt.push('\n');

        if !architecture.overview.trim().is_empty() {
            prompt.push_str("### Overview\n\n");
            prompt.push_str(architecture.overview.trim());
            prompt.push_str("\n\n");
        }

        if !architecture.components.is_empty() {
            prompt.push_str("### Components\n\n");
            for component in &architecture.components {
                prompt.push_str(&format!(
                    "- `{}` -- {}",
                    component.name, component.responsibility
                ));
                if !component.paths.is_empty() {
                    prompt.push_str(&format!(" (paths: {})", component.paths.join(", ")));
                }
                prompt.push('\n');
            }
            prompt.push('\n');
        }

        if !architecture.constraints.is_empty() {
            prompt.push_str("### Constraints\n\n");
            for constraint in &architecture.constraints {
                prompt.push_str(&format!("- {constraint}\n"));
            }
            prompt.push('\n');
        }

        prompt
    }
}
