//! Critical path calculation using forward and backward passes.

use std::collections::VecDeque;

use crate::graph::ProjectGraph;
use crate::interner::{TaskIdInt, TaskIdInterner};
use crate::models::DependencyKind;

use super::types::TaskTiming;

/// Error types for critical path calculation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CriticalPathError {
    /// Topological ordering failed; `remaining` tasks sit on or behind a cycle.
    GraphNotAcyclic { remaining: usize },
    /// Duration is negative (`Some`) or absent (`None`).
    InvalidDuration { task: String, duration: Option<i64> },
    /// An edge references a task the graph does not hold.
    TaskNotFound(String),
}

impl std::fmt::Display for CriticalPathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CriticalPathError::GraphNotAcyclic { remaining } => {
                write!(f, "Dependency graph is not acyclic ({remaining} tasks unordered)")
            }
            CriticalPathError::InvalidDuration { task, duration } => match duration {
                Some(d) => write!(f, "Task {task} has negative duration {d}"),
                None => write!(f, "Task {task} has no duration"),
            },
            CriticalPathError::TaskNotFound(id) => write!(f, "Task not found: {id}"),
        }
    }
}

impl std::error::Error for CriticalPathError {}

/// One edge as seen from one endpoint.
#[derive(Clone, Copy, Debug)]
pub struct EdgeRef {
    /// The task at the other end of the edge.
    pub other: TaskIdInt,
    pub kind: DependencyKind,
    pub lag: i64,
}

/// Dense, validated copy of a graph for the passes.
/// All lookups use direct array indexing.
pub struct TaskData {
    /// Task ID string <-> integer mapping (sorted, so deterministic).
    pub index: TaskIdInterner,
    /// Task durations indexed by task ID.
    pub durations: Vec<i64>,
    /// Incoming edges indexed by successor ID.
    pub preds: Vec<Vec<EdgeRef>>,
    /// Outgoing edges indexed by predecessor ID.
    pub succs: Vec<Vec<EdgeRef>>,
}

impl TaskData {
    /// Copy `graph` into scratch vectors, rejecting bad durations and dangling edges.
    pub fn new(graph: &ProjectGraph) -> Result<Self, CriticalPathError> {
        let index = TaskIdInterner::from_sorted(graph.tasks().map(|t| t.id.as_str()));
        let n = index.len();

        let mut durations = vec![0; n];
        for task in graph.tasks() {
            let duration = match task.duration_days {
                Some(d) if d >= 0 => d,
                other => {
                    return Err(CriticalPathError::InvalidDuration {
                        task: task.id.clone(),
                        duration: other,
                    })
                }
            };
            if let Some(id) = index.get(&task.id) {
                durations[id as usize] = duration;
            }
        }

        let mut preds: Vec<Vec<EdgeRef>> = vec![Vec::new(); n];
        let mut succs: Vec<Vec<EdgeRef>> = vec![Vec::new(); n];
        for dep in graph.dependencies() {
            let pred = index
                .get(&dep.predecessor)
                .ok_or_else(|| CriticalPathError::TaskNotFound(dep.predecessor.clone()))?;
            let succ = index
                .get(&dep.successor)
                .ok_or_else(|| CriticalPathError::TaskNotFound(dep.successor.clone()))?;
            succs[pred as usize].push(EdgeRef {
                other: succ,
                kind: dep.kind,
                lag: dep.lag_days,
            });
            preds[succ as usize].push(EdgeRef {
                other: pred,
                kind: dep.kind,
                lag: dep.lag_days,
            });
        }

        Ok(Self {
            index,
            durations,
            preds,
            succs,
        })
    }

    /// Get number of tasks.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Result of both passes over a whole project.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriticalPathResult {
    /// Tasks in topological order.
    pub order: Vec<TaskIdInt>,
    /// Timing indexed by task ID.
    pub timings: Vec<TaskTiming>,
    /// Max earliest finish over tasks without successors (days from start).
    pub project_finish: i64,
}

/// Topological sort using Kahn's algorithm (dependencies before dependents).
///
/// Ready tasks are taken in ID order, so the result is deterministic.
pub fn topological_order(data: &TaskData) -> Result<Vec<TaskIdInt>, CriticalPathError> {
    let n = data.len();
    let mut in_degree: Vec<usize> = data.preds.iter().map(|p| p.len()).collect();
    let mut queue: VecDeque<TaskIdInt> = (0..n as TaskIdInt)
        .filter(|&id| in_degree[id as usize] == 0)
        .collect();

    let mut result: Vec<TaskIdInt> = Vec::with_capacity(n);
    while let Some(task) = queue.pop_front() {
        result.push(task);
        for edge in &data.succs[task as usize] {
            let idx = edge.other as usize;
            in_degree[idx] -= 1;
            if in_degree[idx] == 0 {
                queue.push_back(edge.other);
            }
        }
    }

    if result.len() != n {
        return Err(CriticalPathError::GraphNotAcyclic {
            remaining: n - result.len(),
        });
    }
    Ok(result)
}

/// Earliest start of a successor implied by one incoming edge.
///
/// The predecessor anchor is its start for SS/SF and its finish for FS/FF;
/// FF/SF constrain the successor's finish, so its duration is subtracted.
fn forward_bound(edge: &EdgeRef, pred: &TaskTiming, succ_duration: i64) -> i64 {
    let anchor = if edge.kind.from_start() {
        pred.earliest_start
    } else {
        pred.earliest_finish
    };
    let bound = anchor.saturating_add(edge.lag);
    if edge.kind.to_finish() {
        bound.saturating_sub(succ_duration)
    } else {
        bound
    }
}

/// Latest finish of a predecessor implied by one outgoing edge.
///
/// Mirror of [`forward_bound`]: the successor anchor is its finish for FF/SF
/// and its start for FS/SS; SS/SF constrain the predecessor's start, so its
/// duration is added back.
fn backward_bound(edge: &EdgeRef, succ: &TaskTiming, pred_duration: i64) -> i64 {
    let anchor = if edge.kind.to_finish() {
        succ.latest_finish
    } else {
        succ.latest_start
    };
    let bound = anchor.saturating_sub(edge.lag);
    if edge.kind.from_start() {
        bound.saturating_add(pred_duration)
    } else {
        bound
    }
}

/// Forward pass: earliest start/finish in topological order.
pub fn forward_pass(data: &TaskData, order: &[TaskIdInt], clamp_to_start: bool) -> Vec<TaskTiming> {
    let mut timings = vec![TaskTiming::default(); data.len()];

    for &task in order {
        let idx = task as usize;
        let duration = data.durations[idx];

        let mut earliest_start = data.preds[idx]
            .iter()
            .map(|edge| forward_bound(edge, &timings[edge.other as usize], duration))
            .max()
            .unwrap_or(0);
        if clamp_to_start {
            earliest_start = earliest_start.max(0);
        }

        let timing = &mut timings[idx];
        timing.earliest_start = earliest_start;
        timing.earliest_finish = earliest_start.saturating_add(duration);
    }
    timings
}

/// Project finish: max earliest finish over tasks with no successors.
pub fn project_finish(data: &TaskData, timings: &[TaskTiming]) -> i64 {
    (0..data.len())
        .filter(|&idx| data.succs[idx].is_empty())
        .map(|idx| timings[idx].earliest_finish)
        .max()
        .unwrap_or(0)
}

/// Backward pass: latest start/finish in reverse topological order, then slack.
pub fn backward_pass(data: &TaskData, order: &[TaskIdInt], timings: &mut [TaskTiming], finish: i64) {
    for &task in order.iter().rev() {
        let idx = task as usize;
        let duration = data.durations[idx];

        let latest_finish = data.succs[idx]
            .iter()
            .map(|edge| backward_bound(edge, &timings[edge.other as usize], duration))
            .min()
            .unwrap_or(finish);

        let timing = &mut timings[idx];
        timing.latest_finish = latest_finish;
        timing.latest_start = latest_finish.saturating_sub(duration);
        timing.slack = timing.latest_start.saturating_sub(timing.earliest_start);
    }
}

/// Run both passes over the whole graph.
pub fn calculate_critical_path(
    data: &TaskData,
    clamp_to_start: bool,
) -> Result<CriticalPathResult, CriticalPathError> {
    let order = topological_order(data)?;
    let mut timings = forward_pass(data, &order, clamp_to_start);
    let finish = project_finish(data, &timings);
    backward_pass(data, &order, &mut timings, finish);

    Ok(CriticalPathResult {
        order,
        timings,
        project_finish: finish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dependency, Task};
    use chrono::NaiveDate;

    fn make_graph(tasks: &[(&str, i64)], deps: &[(&str, &str, DependencyKind, i64)]) -> ProjectGraph {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let tasks = tasks.iter().map(|(id, d)| Task::new(*id, *id, start, *d));
        let deps = deps
            .iter()
            .map(|(p, s, kind, lag)| Dependency::new(*p, *s, *kind, *lag));
        ProjectGraph::load("p", tasks, deps).unwrap()
    }

    fn timing<'a>(data: &TaskData, result: &'a CriticalPathResult, id: &str) -> &'a TaskTiming {
        &result.timings[data.index.get(id).unwrap() as usize]
    }

    use DependencyKind::*;

    #[test]
    fn test_single_task_critical_path() {
        let graph = make_graph(&[("a", 5)], &[]);
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();

        assert_eq!(result.project_finish, 5);
        let a = timing(&data, &result, "a");
        assert_eq!((a.earliest_start, a.earliest_finish), (0, 5));
        assert!(a.is_critical());
    }

    #[test]
    fn test_chain_with_lag() {
        // a(3) -FS0-> b(2) -FS1-> c(4)
        let graph = make_graph(
            &[("a", 3), ("b", 2), ("c", 4)],
            &[("a", "b", FinishToStart, 0), ("b", "c", FinishToStart, 1)],
        );
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();

        assert_eq!(result.project_finish, 10);
        let c = timing(&data, &result, "c");
        assert_eq!((c.earliest_start, c.earliest_finish), (6, 10));
        for id in ["a", "b", "c"] {
            assert!(timing(&data, &result, id).is_critical(), "{id} should be critical");
        }
    }

    #[test]
    fn test_parallel_paths_with_slack() {
        // a (2d) -> target (1d)
        // b (5d) -> target (1d)
        let graph = make_graph(
            &[("a", 2), ("b", 5), ("target", 1)],
            &[("a", "target", FinishToStart, 0), ("b", "target", FinishToStart, 0)],
        );
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();

        assert_eq!(result.project_finish, 6);
        assert_eq!(timing(&data, &result, "a").slack, 3);
        assert!(timing(&data, &result, "b").is_critical());
        assert!(timing(&data, &result, "target").is_critical());
    }

    #[test]
    fn test_start_to_start_with_lag() {
        // a(4) -SS2-> b(3): b may start two days after a starts
        let graph = make_graph(&[("a", 4), ("b", 3)], &[("a", "b", StartToStart, 2)]);
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();

        let b = timing(&data, &result, "b");
        assert_eq!((b.earliest_start, b.earliest_finish), (2, 5));
        assert_eq!(result.project_finish, 5);
        let a = timing(&data, &result, "a");
        // SS pins a's latest start to b.LS - 2 = 0
        assert_eq!(a.latest_start, 0);
        assert_eq!(a.slack, 0);
    }

    #[test]
    fn test_finish_to_finish() {
        // a(5) -FF1-> b(2): b finishes no earlier than a.EF + 1 = 6
        let graph = make_graph(&[("a", 5), ("b", 2)], &[("a", "b", FinishToFinish, 1)]);
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();

        let b = timing(&data, &result, "b");
        assert_eq!((b.earliest_start, b.earliest_finish), (4, 6));
        let a = timing(&data, &result, "a");
        assert_eq!(a.latest_finish, 5);
        assert_eq!(a.slack, 0);
    }

    #[test]
    fn test_start_to_finish() {
        // a(2) -SF3-> b(1): b finishes no earlier than a.ES + 3 = 3
        let graph = make_graph(&[("a", 2), ("b", 1)], &[("a", "b", StartToFinish, 3)]);
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();

        let b = timing(&data, &result, "b");
        assert_eq!((b.earliest_start, b.earliest_finish), (2, 3));
        let a = timing(&data, &result, "a");
        // a.LS <= b.LF - 3 = 0
        assert_eq!(a.latest_start, 0);
        assert!(a.is_critical());
    }

    #[test]
    fn test_negative_lead_clamped_to_project_start() {
        // a(3) -SS-2-> b(1)
        let graph = make_graph(&[("a", 3), ("b", 1)], &[("a", "b", StartToStart, -2)]);
        let data = TaskData::new(&graph).unwrap();

        let clamped = calculate_critical_path(&data, true).unwrap();
        assert_eq!(timing(&data, &clamped, "b").earliest_start, 0);

        let free = calculate_critical_path(&data, false).unwrap();
        assert_eq!(timing(&data, &free, "b").earliest_start, -2);
    }

    #[test]
    fn test_fs_lead_overlaps() {
        // a(5) -FS-2-> b(4): b starts at 3
        let graph = make_graph(&[("a", 5), ("b", 4)], &[("a", "b", FinishToStart, -2)]);
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();
        assert_eq!(timing(&data, &result, "b").earliest_start, 3);
        assert_eq!(result.project_finish, 7);
    }

    #[test]
    fn test_invalid_durations_rejected() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut graph = ProjectGraph::new("p");
        graph.add_task(Task::new("neg", "neg", start, -1)).unwrap();
        assert_eq!(
            TaskData::new(&graph).err(),
            Some(CriticalPathError::InvalidDuration {
                task: "neg".to_string(),
                duration: Some(-1)
            })
        );

        let mut graph = ProjectGraph::new("p");
        let mut missing = Task::new("none", "none", start, 1);
        missing.duration_days = None;
        graph.add_task(missing).unwrap();
        assert!(matches!(
            TaskData::new(&graph),
            Err(CriticalPathError::InvalidDuration { duration: None, .. })
        ));
    }

    #[test]
    fn test_topological_order_detects_cycle() {
        // Hand-built scratch data with a 2-cycle; the graph layer never allows this.
        let data = TaskData {
            index: TaskIdInterner::from_sorted(["x", "y"]),
            durations: vec![1, 1],
            preds: vec![
                vec![EdgeRef { other: 1, kind: FinishToStart, lag: 0 }],
                vec![EdgeRef { other: 0, kind: FinishToStart, lag: 0 }],
            ],
            succs: vec![
                vec![EdgeRef { other: 1, kind: FinishToStart, lag: 0 }],
                vec![EdgeRef { other: 0, kind: FinishToStart, lag: 0 }],
            ],
        };
        assert_eq!(
            topological_order(&data),
            Err(CriticalPathError::GraphNotAcyclic { remaining: 2 })
        );
    }

    #[test]
    fn test_empty_graph() {
        let graph = ProjectGraph::new("p");
        let data = TaskData::new(&graph).unwrap();
        let result = calculate_critical_path(&data, true).unwrap();
        assert!(result.order.is_empty());
        assert_eq!(result.project_finish, 0);
    }
}
