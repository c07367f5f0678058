//! Deterministic execution ordering (Kahn's algorithm).

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use super::{DependencyGraph, GraphError};
use crate::model::Task;

/// Compute a deterministic execution order for `tasks`.
///
/// Ready tasks are queued in ascending id order, and tasks that become
/// ready while one task is processed are sorted before they join the
/// queue, so the result depends only on the task set and never on input
/// order. An empty input yields an empty order.
pub fn schedule(tasks: &[Task]) -> Result<Vec<String>, GraphError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    ordered(&DependencyGraph::new(tasks))
}

/// Group tasks into waves that can run in parallel.
///
/// A task lands one wave after the latest wave among its dependencies;
/// each wave is sorted by id.
pub fn execution_batches(tasks: &[Task]) -> Result<Vec<Vec<String>>, GraphError> {
    if tasks.is_empty() {
        return Ok(Vec::new());
    }

    let graph = DependencyGraph::new(tasks);
    let order = ordered(&graph)?;
    Ok(waves(&graph, &order))
}

/// Group tasks into waves along an order already produced by [`schedule`].
///
/// Skips the cycle check and the topological sort, so callers that need
/// both the order and the waves pay for them once. Ids in `order` that
/// name no task land in the first wave.
pub fn batches_for_order(tasks: &[Task], order: &[String]) -> Vec<Vec<String>> {
    waves(&DependencyGraph::new(tasks), order)
}

fn ordered(graph: &DependencyGraph) -> Result<Vec<String>, GraphError> {
    graph.check_acyclic()?;
    let order = kahn_order(graph)?;

    debug!(tasks = order.len(), "computed execution order");
    Ok(order)
}

fn waves(graph: &DependencyGraph, order: &[String]) -> Vec<Vec<String>> {
    let mut level: HashMap<&str, usize> = HashMap::with_capacity(order.len());
    let mut batches: Vec<Vec<String>> = Vec::new();

    for id in order {
        let wave = graph
            .dependencies_of(id)
            .iter()
            .filter_map(|dep| level.get(dep).map(|l| l + 1))
            .max()
            .unwrap_or(0);
        level.insert(id.as_str(), wave);
        if batches.len() <= wave {
            batches.resize_with(wave + 1, Vec::new);
        }
        batches[wave].push(id.clone());
    }

    for batch in &mut batches {
        batch.sort();
    }
    batches
}

fn kahn_order(graph: &DependencyGraph) -> Result<Vec<String>, GraphError> {
    let mut in_degree: HashMap<&str, usize> = graph
        .ids()
        .map(|id| (id, graph.in_degree(id).unwrap_or(0)))
        .collect();

    // `ids()` is already ascending.
    let mut queue: VecDeque<&str> = graph
        .ids()
        .filter(|id| in_degree.get(id).copied() == Some(0))
        .collect();
    let mut order: Vec<String> = Vec::with_capacity(graph.len());

    while let Some(id) = queue.pop_front() {
        order.push(id.to_owned());

        let mut ready: Vec<&str> = Vec::new();
        for dependent in graph.dependents_of(id) {
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree = degree.saturating_sub(1);
                if *degree == 0 {
                    ready.push(dependent.as_str());
                }
            }
        }
        ready.sort_unstable();
        queue.extend(ready);
    }

    if order.len() != graph.len() {
        let missing: Vec<String> = graph
            .ids()
            .filter(|id| !order.iter().any(|o| o == id))
            .map(str::to_owned)
            .collect();
        return Err(GraphError::incomplete(missing));
    }

    Ok(order)
}
