//! Critical path scheduling.
//!
//! Two-pass CPM over a whole project graph: a forward pass for earliest
//! start/finish, a backward pass for latest start/finish, and slack as the
//! difference. Tasks with zero slack form the critical path.

mod calculation;
mod scheduler;
mod types;

pub use calculation::{
    backward_pass, calculate_critical_path, forward_pass, project_finish, topological_order,
    CriticalPathError, CriticalPathResult, EdgeRef, TaskData,
};
pub use scheduler::{CriticalPathScheduler, CriticalPathSchedulerError};
pub use types::{CriticalPathConfig, Schedule, ScheduledTask, TaskTiming};
