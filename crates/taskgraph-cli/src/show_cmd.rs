//! `taskgraph show` command: print a saved task graph.

use std::path::Path;

use anyhow::Result;

use taskgraph_core::{Task, TaskGraph, TaskStatus, batches_for_order};

use crate::store;

/// Run the show command.
pub fn run_show(path: &Path) -> Result<()> {
    let graph = store::load_graph(path)?;
    print_graph(&graph);
    Ok(())
}

/// Print a graph summary followed by its tasks in execution order.
pub fn print_graph(graph: &TaskGraph) {
    println!("Task graph: {}", graph.id);
    println!(
        "Created: {}",
        graph.metadata.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "Cost: ${:.4}  generation: {}ms  pipeline: {}ms",
        graph.metadata.cost_usd,
        graph.metadata.generation_duration_ms,
        graph.metadata.pipeline_duration_ms,
    );
    println!();

    let batches = batches_for_order(&graph.tasks, &graph.execution_order);
    if batches.len() < graph.tasks.len() {
        println!("Parallelism: {} waves for {} tasks", batches.len(), graph.tasks.len());
        println!();
    }

    println!("Tasks ({}):", graph.execution_order.len());
    for (position, task) in graph.ordered_tasks().into_iter().enumerate() {
        print_task_line(position + 1, task);
    }
}

/// Print one task as a single status line.
pub fn print_task_line(position: usize, task: &Task) {
    let status_icon = match task.status {
        TaskStatus::Pending => ".",
        TaskStatus::InProgress => "*",
        TaskStatus::Completed => "+",
        TaskStatus::Failed => "!",
    };
    let complexity = task
        .complexity
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default();
    let deps = if task.dependencies.is_empty() {
        String::new()
    } else {
        format!(" (after {})", task.dependencies.join(", "))
    };
    println!(
        "  {position:>3}. [{status_icon}] {} {}{complexity}{deps}",
        task.id, task.title
    );
}
