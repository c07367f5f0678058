//! JSON persistence for task graphs.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use taskgraph_core::TaskGraph;

/// Write `graph` to `path` as pretty JSON, creating parent dirs as needed.
pub fn save_graph(path: &Path, graph: &TaskGraph) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let mut contents = serde_json::to_string_pretty(graph).context("failed to serialize task graph")?;
    contents.push('\n');
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write task graph to {}", path.display()))?;
    debug!(path = %path.display(), graph_id = %graph.id, "saved task graph");
    Ok(())
}

/// Read a task graph previously written by [`save_graph`].
pub fn load_graph(path: &Path) -> Result<TaskGraph> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read task graph at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse task graph at {}", path.display()))
}
