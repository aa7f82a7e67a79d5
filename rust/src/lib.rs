//! Project schedule engine: dependency graphs, critical path scheduling,
//! baselines and board/timeline projections.
//!
//! Typical flow: open a [`Project`] (directly or through a [`Portfolio`]),
//! add tasks and dependencies (every edge is checked for self-loops and
//! cycles before it is accepted), read the published [`Schedule`], take
//! [`Baseline`]s, and render [`KanbanBoard`] / [`GanttChart`] views.

pub mod baseline;
pub mod config;
pub mod critical_path;
pub mod graph;
pub mod interner;
pub mod logging;
pub mod models;
pub mod project;
pub mod views;

#[cfg(feature = "python")]
mod python;

pub use baseline::{Baseline, BaselineError, BaselineLedger, BaselineTask, TaskVariance};
pub use config::{ConfigError, EngineConfig, SubtaskPolicy};
pub use critical_path::{
    CriticalPathConfig, CriticalPathScheduler, CriticalPathSchedulerError, Schedule,
    ScheduledTask, TaskTiming,
};
pub use graph::{GraphError, ProjectGraph};
pub use models::{
    Assignment, Dependency, DependencyKind, DependencyUpdate, Task, TaskBaseline, TaskId,
    TaskPriority, TaskStatus, TaskUpdate,
};
pub use project::{ErrorKind, Portfolio, Project, ProjectError};
pub use views::{GanttChart, GanttLink, GanttTask, KanbanBoard, KanbanCard, KanbanColumn};
