use chrono::NaiveDate;
use proptest::prelude::*;
use plancore::{
    CriticalPathConfig, CriticalPathScheduler, DependencyKind, GraphError, ProjectGraph, Task,
};

const KINDS: [DependencyKind; 4] = [
    DependencyKind::FinishToStart,
    DependencyKind::StartToStart,
    DependencyKind::FinishToFinish,
    DependencyKind::StartToFinish,
];

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

// Random DAGs: task i may only depend on tasks 0..i, so every generated
// edge set is acyclic. Duplicate pairs are dropped by the graph itself.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = ProjectGraph> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let durations = proptest::collection::vec(0i64..8, num_tasks);
        let edges = proptest::collection::vec(
            (any::<usize>(), any::<usize>(), 0usize..4, -3i64..6),
            0..num_tasks * 2,
        );
        (durations, edges).prop_map(move |(durations, edges)| {
            let mut graph = ProjectGraph::new("prop");
            for (i, duration) in durations.into_iter().enumerate() {
                graph
                    .add_task(Task::new(format!("t{i:02}"), "t", start(), duration))
                    .unwrap();
            }
            for (a, b, kind, lag) in edges {
                let succ = a % num_tasks;
                if succ == 0 {
                    continue;
                }
                let pred = b % succ;
                let _ = graph.connect(
                    &format!("t{pred:02}"),
                    &format!("t{succ:02}"),
                    KINDS[kind],
                    lag,
                );
            }
            graph
        })
    })
}

fn scheduler() -> CriticalPathScheduler {
    CriticalPathScheduler::new(start(), CriticalPathConfig::default())
}

proptest! {
    #[test]
    fn test_timings_are_ordered(graph in dag_strategy(12)) {
        let schedule = scheduler().schedule(&graph).unwrap();
        prop_assert_eq!(schedule.len(), graph.task_count());

        for task in schedule.tasks() {
            let t = task.timing;
            prop_assert!(t.earliest_start >= 0);
            prop_assert!(t.earliest_start <= t.earliest_finish);
            prop_assert!(t.earliest_finish <= t.latest_finish);
            prop_assert!(t.latest_start <= t.latest_finish);
            prop_assert!(t.slack >= 0);
            prop_assert_eq!(t.slack, t.latest_start - t.earliest_start);
        }
        prop_assert!(schedule.tasks().any(|t| t.is_critical));
    }

    #[test]
    fn test_forward_constraints_hold(graph in dag_strategy(12)) {
        let schedule = scheduler().schedule(&graph).unwrap();
        for dep in graph.dependencies() {
            let p = schedule.task(&dep.predecessor).unwrap().timing;
            let s = schedule.task(&dep.successor).unwrap().timing;
            let (anchor, bound) = match dep.kind {
                DependencyKind::FinishToStart => (s.earliest_start, p.earliest_finish),
                DependencyKind::StartToStart => (s.earliest_start, p.earliest_start),
                DependencyKind::FinishToFinish => (s.earliest_finish, p.earliest_finish),
                DependencyKind::StartToFinish => (s.earliest_finish, p.earliest_start),
            };
            prop_assert!(anchor >= bound + dep.lag_days);
        }
    }

    #[test]
    fn test_backward_constraints_hold(graph in dag_strategy(12)) {
        let schedule = scheduler().schedule(&graph).unwrap();
        let deps = graph.dependencies();
        for dep in &deps {
            let p = schedule.task(&dep.predecessor).unwrap().timing;
            let s = schedule.task(&dep.successor).unwrap().timing;
            let (anchor, bound) = match dep.kind {
                DependencyKind::FinishToStart => (p.latest_finish, s.latest_start),
                DependencyKind::StartToStart => (p.latest_start, s.latest_start),
                DependencyKind::FinishToFinish => (p.latest_finish, s.latest_finish),
                DependencyKind::StartToFinish => (p.latest_start, s.latest_finish),
            };
            prop_assert!(anchor <= bound - dep.lag_days);
        }

        // Tasks without successors all end at the project finish.
        let sinks: Vec<_> = schedule
            .tasks()
            .filter(|t| !deps.iter().any(|d| d.predecessor == t.task_id))
            .map(|t| t.timing)
            .collect();
        let finish = sinks.iter().map(|t| t.earliest_finish).max().unwrap();
        for t in sinks {
            prop_assert_eq!(t.latest_finish, finish);
        }
    }

    #[test]
    fn test_recompute_is_idempotent(graph in dag_strategy(10)) {
        let first = scheduler().schedule(&graph).unwrap();
        let second = scheduler().schedule(&graph).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_reversed_edges_are_rejected(graph in dag_strategy(10)) {
        let mut graph = graph;
        let edges: Vec<(String, String)> = graph
            .dependencies()
            .into_iter()
            .map(|d| (d.predecessor.clone(), d.successor.clone()))
            .collect();
        let count = graph.dependency_count();
        let revision = graph.revision();

        for (pred, succ) in edges {
            let err = graph
                .connect(&succ, &pred, DependencyKind::FinishToStart, 0)
                .unwrap_err();
            let is_cycle = matches!(err, GraphError::CircularDependency { .. });
            prop_assert!(is_cycle);
        }
        prop_assert_eq!(graph.dependency_count(), count);
        prop_assert_eq!(graph.revision(), revision);
    }
}
