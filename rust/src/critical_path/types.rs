//! Types for critical path scheduling.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::graph::ProjectGraph;
use crate::models::TaskId;

/// Configuration for the critical path scheduler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriticalPathConfig {
    /// Floor early starts at the project start even when a lead pulls earlier.
    pub clamp_to_project_start: bool,
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
}

impl Default for CriticalPathConfig {
    fn default() -> Self {
        Self {
            clamp_to_project_start: true,
            verbosity: 0,
        }
    }
}

/// Per-task timing in whole days relative to the project start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TaskTiming {
    /// Earliest possible start time (from forward pass).
    pub earliest_start: i64,
    /// Earliest possible finish time (from forward pass).
    pub earliest_finish: i64,
    /// Latest allowable start time (from backward pass).
    pub latest_start: i64,
    /// Latest allowable finish time (from backward pass).
    pub latest_finish: i64,
    /// Slack = latest_start - earliest_start.
    pub slack: i64,
}

impl TaskTiming {
    pub fn is_critical(&self) -> bool {
        self.slack == 0
    }
}

/// Computed schedule fields for one task, as calendar dates.
///
/// Finish dates are exclusive: a one-day task starting on the 3rd finishes
/// on the 4th.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ScheduledTask {
    pub task_id: TaskId,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub slack: i64,
    pub is_critical: bool,
    #[serde(skip)]
    pub timing: TaskTiming,
}

/// Immutable result of one scheduler run over a project graph.
///
/// Only the scheduler constructs these; a project publishes a new one
/// wholesale instead of editing fields in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Schedule {
    project_id: String,
    revision: u64,
    project_start: NaiveDate,
    project_finish: NaiveDate,
    /// Project length in days (finish offset).
    length_days: i64,
    tasks: BTreeMap<TaskId, ScheduledTask>,
    /// Critical tasks in topological order.
    critical_path: Vec<TaskId>,
}

impl Schedule {
    pub(crate) fn new(
        project_id: String,
        revision: u64,
        project_start: NaiveDate,
        project_finish: NaiveDate,
        length_days: i64,
        tasks: BTreeMap<TaskId, ScheduledTask>,
        critical_path: Vec<TaskId>,
    ) -> Self {
        Self {
            project_id,
            revision,
            project_start,
            project_finish,
            length_days,
            tasks,
            critical_path,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Graph revision this schedule was computed from.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn project_start(&self) -> NaiveDate {
        self.project_start
    }

    pub fn project_finish(&self) -> NaiveDate {
        self.project_finish
    }

    pub fn length_days(&self) -> i64 {
        self.length_days
    }

    pub fn task(&self, id: &str) -> Option<&ScheduledTask> {
        self.tasks.get(id)
    }

    /// Scheduled tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn critical_path(&self) -> &[TaskId] {
        &self.critical_path
    }

    pub fn is_critical(&self, id: &str) -> bool {
        self.tasks.get(id).is_some_and(|t| t.is_critical)
    }

    /// Whether `graph` changed structurally since this schedule was computed.
    pub fn is_stale_for(&self, graph: &ProjectGraph) -> bool {
        self.project_id != graph.project_id() || self.revision != graph.revision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = CriticalPathConfig::default();
        assert!(config.clamp_to_project_start);
        assert_eq!(config.verbosity, 0);
    }

    #[test]
    fn test_task_timing_critical() {
        let timing = TaskTiming {
            earliest_start: 0,
            earliest_finish: 5,
            latest_start: 0,
            latest_finish: 5,
            slack: 0,
        };
        assert!(timing.is_critical());

        let timing_with_slack = TaskTiming {
            earliest_start: 0,
            earliest_finish: 5,
            latest_start: 2,
            latest_finish: 7,
            slack: 2,
        };
        assert!(!timing_with_slack.is_critical());
    }
}
