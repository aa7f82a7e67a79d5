//! Project task/dependency graph.
//!
//! - [`model`] holds [`ProjectGraph`], the unit of validation and scheduling.
//! - [`validate`] contains the self-loop, cycle and containment checks that
//!   run before every mutation.

mod model;
pub mod validate;

use thiserror::Error;

pub use model::ProjectGraph;

/// Errors returned by graph mutations. The graph is unchanged after any of them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Task already exists: {0}")]
    DuplicateTask(String),
    #[error("Task cannot depend on itself: {0}")]
    SelfDependency(String),
    #[error("Dependency {predecessor} -> {successor} would create a cycle")]
    CircularDependency {
        predecessor: String,
        successor: String,
    },
    #[error("Dependency {predecessor} -> {successor} already exists")]
    DuplicateDependency {
        predecessor: String,
        successor: String,
    },
    #[error("Dependency id already in use: {0}")]
    DuplicateDependencyId(String),
    #[error("Dependency not found: {0}")]
    DependencyNotFound(String),
    #[error("Progress for task {task} must be 0-100, got {progress}")]
    InvalidProgress { task: String, progress: u8 },
    #[error("Task {task} cannot take {parent} as parent")]
    InvalidParent { task: String, parent: String },
    #[error("Team member {member} is already assigned to task {task}")]
    DuplicateAssignment { task: String, member: String },
    #[error("Team member {member} is not assigned to task {task}")]
    AssignmentNotFound { task: String, member: String },
    #[error("Allocation for task {task} must be 0-100%, got {percentage}")]
    InvalidAllocation { task: String, percentage: u8 },
}
