//! Edge and containment validation run before any graph mutation.

use rustc_hash::FxHashSet;

use super::model::ProjectGraph;
use super::GraphError;

/// Check that `predecessor -> successor` may be added to `graph`.
///
/// Rejections, in order: self edge, unknown endpoint, existing edge for the
/// same ordered pair, and an existing path `successor ~> predecessor`
/// (the new edge would close a cycle).
pub fn check_new_edge(
    graph: &ProjectGraph,
    predecessor: &str,
    successor: &str,
) -> Result<(), GraphError> {
    if predecessor == successor {
        return Err(GraphError::SelfDependency(predecessor.to_string()));
    }
    for id in [predecessor, successor] {
        if !graph.contains_task(id) {
            return Err(GraphError::TaskNotFound(id.to_string()));
        }
    }
    if graph.has_dependency(predecessor, successor) {
        return Err(GraphError::DuplicateDependency {
            predecessor: predecessor.to_string(),
            successor: successor.to_string(),
        });
    }
    if reaches(graph, successor, predecessor) {
        return Err(GraphError::CircularDependency {
            predecessor: predecessor.to_string(),
            successor: successor.to_string(),
        });
    }
    Ok(())
}

/// Whether `target` is reachable from `start` by following successor edges.
///
/// Iterative depth-first search with one visited set shared by the whole
/// traversal, so every task is expanded at most once.
pub fn reaches(graph: &ProjectGraph, start: &str, target: &str) -> bool {
    if start == target {
        return true;
    }
    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut stack: Vec<&str> = vec![start];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        for dep in graph.successors_of(current) {
            let next = dep.successor.as_str();
            if next == target {
                return true;
            }
            if !visited.contains(next) {
                stack.push(next);
            }
        }
    }
    false
}

/// Check that `task` may take `parent` as its containment parent.
///
/// The parent must exist, differ from the task, and must not already sit
/// underneath the task in the containment tree.
pub fn check_parent(graph: &ProjectGraph, task: &str, parent: &str) -> Result<(), GraphError> {
    let invalid = || GraphError::InvalidParent {
        task: task.to_string(),
        parent: parent.to_string(),
    };
    if task == parent || !graph.contains_task(parent) {
        return Err(invalid());
    }

    let mut visited: FxHashSet<&str> = FxHashSet::default();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == task {
            return Err(invalid());
        }
        if !visited.insert(current) {
            // Pre-existing loop above `parent`; refuse to extend it.
            return Err(invalid());
        }
        cursor = graph
            .task(current)
            .and_then(|t| t.parent_id.as_deref());
    }
    Ok(())
}
