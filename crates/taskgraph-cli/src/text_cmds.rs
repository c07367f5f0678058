//! Offline commands over saved model output: `parse`, `validate` and
//! `schedule`.
//!
//! Each reads a text file (or stdin when the path is `-`) in the format the
//! model is prompted to produce, and never calls the model.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

use taskgraph_core::{
    ParseReport, Task, batches_for_order, parse_tasks_with_report, schedule, validate_all,
};

use crate::show_cmd::print_task_line;

/// Read model output from `path`, or stdin for `-`.
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read model output from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read model output at {}", path.display()))
}

fn parse_input(path: &Path) -> Result<ParseReport> {
    let text = read_input(path)?;
    let report = parse_tasks_with_report(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    for section in &report.skipped {
        eprintln!(
            "warning: line {}: skipped {:?}: {}",
            section.line, section.header, section.reason
        );
    }
    Ok(report)
}

/// Run the parse command.
pub fn run_parse(path: &Path, json: bool) -> Result<()> {
    let report = parse_input(path)?;

    if json {
        let out =
            serde_json::to_string_pretty(&report.tasks).context("failed to serialize tasks")?;
        println!("{out}");
        return Ok(());
    }

    println!("Parsed {} task(s):", report.tasks.len());
    for (i, task) in report.tasks.iter().enumerate() {
        print_task_line(i + 1, task);
        print_task_details(task);
    }
    Ok(())
}

fn print_task_details(task: &Task) {
    for line in task.description.lines() {
        println!("         {line}");
    }
    if !task.files.is_empty() {
        println!("         files: {}", task.files.join(", "));
    }
    for criterion in &task.success_criteria {
        println!("         - {criterion}");
    }
}

/// Run the validate command, reporting every problem found.
pub fn run_validate(path: &Path) -> Result<()> {
    let report = parse_input(path)?;
    let errors = validate_all(&report.tasks);

    if errors.is_empty() {
        println!("{} task(s) valid.", report.tasks.len());
        return Ok(());
    }

    println!("Found {} problem(s):", errors.len());
    for err in &errors {
        println!("  - {err}");
    }
    bail!("validation failed for {}", path.display());
}

/// Run the schedule command.
pub fn run_schedule(path: &Path, json: bool) -> Result<()> {
    let report = parse_input(path)?;
    let order = schedule(&report.tasks).context("failed to order tasks")?;
    let batches = batches_for_order(&report.tasks, &order);

    if json {
        let out = serde_json::json!({
            "execution_order": order,
            "batches": batches,
        });
        let out = serde_json::to_string_pretty(&out).context("failed to serialize schedule")?;
        println!("{out}");
        return Ok(());
    }

    println!("Execution order:");
    for (i, id) in order.iter().enumerate() {
        let title = report
            .tasks
            .iter()
            .find(|t| &t.id == id)
            .map_or("", |t| t.title.as_str());
        println!("  {:>3}. {id} {title}", i + 1);
    }
    println!();
    println!("Waves:");
    for (i, batch) in batches.iter().enumerate() {
        println!("  {:>3}: {}", i + 1, batch.join(", "));
    }
    Ok(())
}
