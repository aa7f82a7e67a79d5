//! Critical path scheduler implementation.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::graph::ProjectGraph;
use crate::models::TaskId;
use crate::{log_changes, log_debug};

use super::calculation::{calculate_critical_path, CriticalPathError, TaskData};
use super::types::{CriticalPathConfig, Schedule, ScheduledTask, TaskTiming};

/// Errors that can occur during critical path scheduling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CriticalPathSchedulerError {
    #[error("Dependency graph is not acyclic ({0} tasks unordered)")]
    GraphNotAcyclic(usize),
    #[error("Invalid duration for task {task}: {duration:?}")]
    InvalidDuration { task: String, duration: Option<i64> },
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Offset of {0} days from the project start is not a representable date")]
    DateOutOfRange(i64),
}

impl From<CriticalPathError> for CriticalPathSchedulerError {
    fn from(err: CriticalPathError) -> Self {
        match err {
            CriticalPathError::GraphNotAcyclic { remaining } => {
                CriticalPathSchedulerError::GraphNotAcyclic(remaining)
            }
            CriticalPathError::InvalidDuration { task, duration } => {
                CriticalPathSchedulerError::InvalidDuration { task, duration }
            }
            CriticalPathError::TaskNotFound(id) => CriticalPathSchedulerError::TaskNotFound(id),
        }
    }
}

/// Two-pass CPM scheduler anchored at a project start date.
///
/// `schedule` never touches the graph; it returns a fresh [`Schedule`] or an
/// error, so a failed run cannot disturb a previously published result.
pub struct CriticalPathScheduler {
    project_start: NaiveDate,
    config: CriticalPathConfig,
}

impl CriticalPathScheduler {
    pub fn new(project_start: NaiveDate, config: CriticalPathConfig) -> Self {
        Self {
            project_start,
            config,
        }
    }

    /// Run the scheduling algorithm.
    pub fn schedule(&self, graph: &ProjectGraph) -> Result<Schedule, CriticalPathSchedulerError> {
        let verbosity = self.config.verbosity;

        // Phase 1: scratch copy + validation
        let data = TaskData::new(graph)?;

        // Phase 2: forward/backward passes
        let result = calculate_critical_path(&data, self.config.clamp_to_project_start)?;

        // Phase 3: resolve offsets into dates
        let mut tasks: BTreeMap<TaskId, ScheduledTask> = BTreeMap::new();
        let mut critical_path: Vec<TaskId> = Vec::new();

        for &task in &result.order {
            let Some(id) = data.index.resolve(task) else {
                continue;
            };
            let timing = result.timings[task as usize];
            log_debug!(
                verbosity,
                task = id,
                es = timing.earliest_start,
                ef = timing.earliest_finish,
                ls = timing.latest_start,
                lf = timing.latest_finish,
                slack = timing.slack,
                "timing"
            );

            if timing.is_critical() {
                critical_path.push(id.to_string());
            }
            tasks.insert(id.to_string(), self.scheduled_task(id, timing)?);
        }

        let project_finish = offset_date(self.project_start, result.project_finish)?;

        log_changes!(
            verbosity,
            project = graph.project_id(),
            revision = graph.revision(),
            tasks = tasks.len(),
            critical = critical_path.len(),
            finish = %project_finish,
            "schedule computed"
        );

        Ok(Schedule::new(
            graph.project_id().to_string(),
            graph.revision(),
            self.project_start,
            project_finish,
            result.project_finish,
            tasks,
            critical_path,
        ))
    }

    fn scheduled_task(
        &self,
        id: &str,
        timing: TaskTiming,
    ) -> Result<ScheduledTask, CriticalPathSchedulerError> {
        Ok(ScheduledTask {
            task_id: id.to_string(),
            early_start: offset_date(self.project_start, timing.earliest_start)?,
            early_finish: offset_date(self.project_start, timing.earliest_finish)?,
            late_start: offset_date(self.project_start, timing.latest_start)?,
            late_finish: offset_date(self.project_start, timing.latest_finish)?,
            slack: timing.slack,
            is_critical: timing.is_critical(),
            timing,
        })
    }
}

/// `start + days`, every calendar day counting.
fn offset_date(start: NaiveDate, days: i64) -> Result<NaiveDate, CriticalPathSchedulerError> {
    Duration::try_days(days)
        .and_then(|span| start.checked_add_signed(span))
        .ok_or(CriticalPathSchedulerError::DateOutOfRange(days))
}
