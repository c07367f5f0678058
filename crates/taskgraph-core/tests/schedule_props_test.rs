//! Property tests for dependency ordering.
//!
//! Random DAGs are built by only letting a task depend on lower-numbered
//! tasks. The rejection property plants a back edge on top.

use proptest::prelude::*;

use taskgraph_core::{DependencyGraph, GraphErrorKind, Task, execution_batches, schedule};
use taskgraph_test_utils::task;

fn id(n: usize) -> String {
    format!("T{:03}", n + 1)
}

/// A random DAG of up to 24 tasks, returned in id order.
fn dag() -> impl Strategy<Value = Vec<Task>> {
    (1usize..24)
        .prop_flat_map(|n| {
            let edges = (0..n)
                .map(|i| proptest::collection::vec(0..i.max(1), 0..=i.min(4)))
                .collect::<Vec<_>>();
            (Just(n), edges)
        })
        .prop_map(|(n, edges)| {
            (0..n)
                .map(|i| {
                    let deps: Vec<String> = if i == 0 {
                        Vec::new()
                    } else {
                        edges[i].iter().map(|&d| id(d)).collect()
                    };
                    let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                    task(&id(i), &deps)
                })
                .collect()
        })
}

fn position(order: &[String], id: &str) -> usize {
    order
        .iter()
        .position(|o| o == id)
        .unwrap_or_else(|| panic!("{id} missing from order"))
}

proptest! {
    #[test]
    fn order_respects_every_dependency(tasks in dag()) {
        let order = schedule(&tasks).unwrap();
        for t in &tasks {
            for dep in &t.dependencies {
                prop_assert!(position(&order, dep) < position(&order, &t.id));
            }
        }
    }

    #[test]
    fn order_is_a_permutation_of_the_input(tasks in dag()) {
        let mut order = schedule(&tasks).unwrap();
        let mut ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
        order.sort();
        ids.sort();
        prop_assert_eq!(order, ids);
    }

    #[test]
    fn order_ignores_input_order(
        (tasks, shuffled) in dag().prop_flat_map(|tasks| {
            let shuffled = Just(tasks.clone()).prop_shuffle();
            (Just(tasks), shuffled)
        })
    ) {
        prop_assert_eq!(schedule(&tasks).unwrap(), schedule(&shuffled).unwrap());
    }

    #[test]
    fn batches_cover_order_and_respect_dependencies(tasks in dag()) {
        let order = schedule(&tasks).unwrap();
        let batches = execution_batches(&tasks).unwrap();

        let flattened: usize = batches.iter().map(Vec::len).sum();
        prop_assert_eq!(flattened, order.len());

        let wave_of = |id: &str| batches.iter().position(|b| b.iter().any(|x| x == id));
        for t in &tasks {
            for dep in &t.dependencies {
                prop_assert!(wave_of(dep) < wave_of(&t.id));
            }
        }
    }

    #[test]
    fn planted_back_edge_is_reported_as_cycle(
        mut tasks in dag().prop_filter("need two tasks", |t| t.len() >= 2),
        pick in any::<prop::sample::Index>(),
    ) {
        // T001 -> later -> T001
        let later = pick.index(tasks.len() - 1) + 1;
        tasks[later].dependencies.push(id(0));
        tasks[0].dependencies.push(id(later));

        let err = schedule(&tasks).unwrap_err();
        prop_assert_eq!(err.kind, GraphErrorKind::Cycle);

        // Every consecutive pair in the reported cycle is a real edge.
        let graph = DependencyGraph::new(&tasks);
        prop_assert!(err.task_ids.len() >= 2);
        prop_assert_eq!(err.task_ids.first(), err.task_ids.last());
        for pair in err.task_ids.windows(2) {
            prop_assert!(
                graph.dependencies_of(&pair[0]).contains(&pair[1].as_str()),
                "{} does not depend on {}", pair[0], pair[1]
            );
        }
    }
}
