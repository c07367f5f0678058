//! In-memory dependency graph over a task list, with cycle detection.
//!
//! Edges point from a task to the tasks it depends on. Dependencies that
//! name no task in the list are ignored here; rejecting them is the
//! validator's job.

pub mod schedule;

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;
use tracing::warn;

use crate::model::Task;

pub use schedule::{batches_for_order, execution_batches, schedule};

/// Why a task list could not be linearized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphErrorKind {
    /// The dependency relation contains a cycle.
    Cycle,
    /// Scheduling stopped before every task was placed.
    Incomplete,
}

impl fmt::Display for GraphErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle => f.write_str("cycle"),
            Self::Incomplete => f.write_str("incomplete"),
        }
    }
}

/// A failure to order the task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GraphError {
    pub kind: GraphErrorKind,
    /// For [`GraphErrorKind::Cycle`], the cycle in dependency order with the
    /// first id repeated at the end. For [`GraphErrorKind::Incomplete`], the
    /// tasks that were never scheduled.
    pub task_ids: Vec<String>,
    pub message: String,
}

impl GraphError {
    pub fn cycle(task_ids: Vec<String>) -> Self {
        let message = format!("dependency cycle detected: {}", task_ids.join(" -> "));
        Self {
            kind: GraphErrorKind::Cycle,
            task_ids,
            message,
        }
    }

    pub fn incomplete(task_ids: Vec<String>) -> Self {
        let message = format!(
            "could not schedule {} task(s): {}",
            task_ids.len(),
            task_ids.join(", ")
        );
        Self {
            kind: GraphErrorKind::Incomplete,
            task_ids,
            message,
        }
    }
}

/// One node per task id.
#[derive(Debug, Clone, Default)]
struct Node {
    /// Declared dependencies, including unresolved ones.
    dependencies: Vec<String>,
    /// Tasks that depend on this one.
    dependents: Vec<String>,
    /// Number of dependencies that resolve to a node.
    in_degree: usize,
}

/// Directed dependency graph built from a task list.
///
/// Nodes are kept in ascending id order so every traversal is deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, Node>,
}

impl DependencyGraph {
    /// Build the graph from `tasks`.
    ///
    /// If an id appears more than once, the first occurrence wins.
    pub fn new(tasks: &[Task]) -> Self {
        let mut nodes: BTreeMap<String, Node> = BTreeMap::new();
        for task in tasks {
            if nodes.contains_key(&task.id) {
                warn!(task_id = %task.id, "duplicate task id in graph input, keeping first");
                continue;
            }
            nodes.insert(
                task.id.clone(),
                Node {
                    dependencies: task.dependencies.clone(),
                    ..Node::default()
                },
            );
        }

        // Second pass: reverse edges and in-degrees over resolved dependencies.
        let edges: Vec<(String, String)> = nodes
            .iter()
            .flat_map(|(id, node)| {
                node.dependencies
                    .iter()
                    .map(move |dep| (id.clone(), dep.clone()))
            })
            .collect();
        for (id, dep) in edges {
            if !nodes.contains_key(&dep) {
                continue;
            }
            if let Some(dep_node) = nodes.get_mut(&dep) {
                dep_node.dependents.push(id.clone());
            }
            if let Some(node) = nodes.get_mut(&id) {
                node.in_degree += 1;
            }
        }

        Self { nodes }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Task ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Dependencies of `id` that resolve to a node, in declaration order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.nodes
            .get(id)
            .map(|node| {
                node.dependencies
                    .iter()
                    .map(String::as_str)
                    .filter(|dep| self.nodes.contains_key(*dep))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tasks that depend on `id`.
    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map(|node| node.dependents.as_slice())
            .unwrap_or_default()
    }

    /// Number of resolved dependencies of `id`, or `None` if `id` is unknown.
    pub fn in_degree(&self, id: &str) -> Option<usize> {
        self.nodes.get(id).map(|node| node.in_degree)
    }

    /// Find a dependency cycle, if one exists.
    ///
    /// Runs a depth-first search rooted at each unvisited node in ascending
    /// id order. The returned path follows dependency edges and repeats its
    /// first id at the end, e.g. `[T001, T002, T001]`.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        let mut on_path: HashSet<&str> = HashSet::new();

        for root in self.nodes.keys() {
            if visited.contains(root.as_str()) {
                continue;
            }

            // Explicit stack of (node, index of next dependency to visit).
            let mut stack: Vec<(&str, usize)> = vec![(root.as_str(), 0)];
            let mut path: Vec<&str> = vec![root.as_str()];
            on_path.insert(root.as_str());

            while let Some(frame) = stack.last_mut() {
                let (id, next) = *frame;
                let deps = match self.nodes.get(id) {
                    Some(node) => &node.dependencies,
                    None => {
                        stack.pop();
                        continue;
                    }
                };

                match deps.get(next) {
                    Some(dep) => {
                        frame.1 += 1;
                        let Some((dep_id, _)) = self.nodes.get_key_value(dep.as_str()) else {
                            continue;
                        };
                        let dep_id = dep_id.as_str();
                        if on_path.contains(dep_id) {
                            let start = path.iter().position(|p| *p == dep_id).unwrap_or(0);
                            let mut cycle: Vec<String> =
                                path[start..].iter().map(|s| (*s).to_owned()).collect();
                            cycle.push(dep_id.to_owned());
                            return Some(cycle);
                        }
                        if !visited.contains(dep_id) {
                            stack.push((dep_id, 0));
                            path.push(dep_id);
                            on_path.insert(dep_id);
                        }
                    }
                    None => {
                        stack.pop();
                        path.pop();
                        on_path.remove(id);
                        visited.insert(id);
                    }
                }
            }
        }

        None
    }

    /// Return a [`GraphError`] describing the first cycle found, if any.
    pub fn check_acyclic(&self) -> Result<(), GraphError> {
        match self.find_cycle() {
            Some(cycle) => Err(GraphError::cycle(cycle)),
            None => Ok(()),
        }
    }
}
