//! Baseline snapshots of a project's schedule and cost state.
//!
//! A [`Baseline`] is frozen at creation and shared behind an `Arc`; the
//! [`BaselineLedger`] keeps one project's baselines numbered 1, 2, 3, ...
//! and refuses anything that would repeat or skip a number.

use chrono::{DateTime, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::critical_path::Schedule;
use crate::graph::ProjectGraph;
use crate::models::{TaskBaseline, TaskId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BaselineError {
    #[error("Baseline {sequence_number} conflicts with project {project} (next is {expected})")]
    SequenceConflict {
        project: String,
        sequence_number: u32,
        expected: u32,
    },
    #[error("Baseline for project {got} cannot be recorded in project {expected}")]
    ProjectMismatch { expected: String, got: String },
    #[error("Baseline {sequence_number} not found in project {project}")]
    NotFound { project: String, sequence_number: u32 },
    #[error("Schedule for project {0} is stale or incomplete; recompute before snapshotting")]
    StaleSchedule(String),
}

/// Frozen copy of one task's schedule-relevant fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaselineTask {
    pub task_id: TaskId,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: Option<i64>,
    pub estimated_cost: f64,
    pub early_start: NaiveDate,
    pub early_finish: NaiveDate,
    pub late_start: NaiveDate,
    pub late_finish: NaiveDate,
    pub slack: i64,
    pub is_critical: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub id: Uuid,
    pub project_id: String,
    pub sequence_number: u32,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub project_start: NaiveDate,
    pub project_finish: NaiveDate,
    pub total_cost: f64,
    /// Tasks in id order.
    pub tasks: Vec<BaselineTask>,
}

/// Difference between a baseline task and its current state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TaskVariance {
    pub task_id: TaskId,
    /// Current start date minus baseline start date.
    pub start_shift_days: i64,
    /// Current end date minus baseline end date.
    pub finish_shift_days: i64,
    /// Current early finish minus baseline early finish, when a schedule was given.
    pub early_finish_shift_days: Option<i64>,
    /// `None` when either side lacks a duration or the difference overflows.
    pub duration_delta: Option<i64>,
    /// Current estimated cost minus baseline cost.
    pub cost_delta: f64,
}

impl Baseline {
    /// Freeze `graph` and its current `schedule` as baseline `sequence_number`.
    ///
    /// Fails if the schedule was computed from a different revision of the
    /// graph or is missing any task.
    pub fn capture(
        graph: &ProjectGraph,
        schedule: &Schedule,
        sequence_number: u32,
        label: String,
        created_by: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, BaselineError> {
        let stale = || BaselineError::StaleSchedule(graph.project_id().to_string());
        if schedule.is_stale_for(graph) {
            return Err(stale());
        }

        let mut tasks = Vec::with_capacity(graph.task_count());
        for task in graph.tasks() {
            let computed = schedule.task(&task.id).ok_or_else(stale)?;
            tasks.push(BaselineTask {
                task_id: task.id.clone(),
                title: task.title.clone(),
                start_date: task.start_date,
                end_date: task.end_date,
                duration_days: task.duration_days,
                estimated_cost: task.estimated_cost,
                early_start: computed.early_start,
                early_finish: computed.early_finish,
                late_start: computed.late_start,
                late_finish: computed.late_finish,
                slack: computed.slack,
                is_critical: computed.is_critical,
            });
        }
        tasks.sort_by(|a, b| a.task_id.cmp(&b.task_id));

        Ok(Self {
            id: Uuid::new_v4(),
            project_id: graph.project_id().to_string(),
            sequence_number,
            label,
            created_at,
            created_by,
            project_start: schedule.project_start(),
            project_finish: schedule.project_finish(),
            total_cost: tasks.iter().map(|t| t.estimated_cost).sum(),
            tasks,
        })
    }

    pub fn task(&self, id: &str) -> Option<&BaselineTask> {
        self.tasks
            .binary_search_by(|t| t.task_id.as_str().cmp(id))
            .ok()
            .map(|idx| &self.tasks[idx])
    }

    /// Per-task baseline values to stamp onto the live tasks.
    pub(crate) fn stamps(&self) -> FxHashMap<TaskId, TaskBaseline> {
        self.tasks
            .iter()
            .map(|t| {
                (
                    t.task_id.clone(),
                    TaskBaseline {
                        sequence_number: self.sequence_number,
                        start: t.start_date,
                        end: t.end_date,
                        duration_days: t.duration_days,
                        cost: t.estimated_cost,
                    },
                )
            })
            .collect()
    }

    /// Compare against the current graph (and optionally its schedule).
    ///
    /// Tasks added after the baseline have nothing to compare against and
    /// are skipped, as are baseline tasks that no longer exist.
    pub fn variance(&self, graph: &ProjectGraph, schedule: Option<&Schedule>) -> Vec<TaskVariance> {
        self.tasks
            .iter()
            .filter_map(|base| {
                let current = graph.task(&base.task_id)?;
                let early_finish_shift_days = schedule
                    .and_then(|s| s.task(&base.task_id))
                    .map(|s| (s.early_finish - base.early_finish).num_days());
                let duration_delta = match (current.duration_days, base.duration_days) {
                    (Some(now), Some(then)) => now.checked_sub(then),
                    _ => None,
                };
                Some(TaskVariance {
                    task_id: base.task_id.clone(),
                    start_shift_days: (current.start_date - base.start_date).num_days(),
                    finish_shift_days: (current.end_date - base.end_date).num_days(),
                    early_finish_shift_days,
                    duration_delta,
                    cost_delta: current.estimated_cost - base.estimated_cost,
                })
            })
            .collect()
    }

    /// Baseline task ids no longer present in `graph`.
    pub fn missing_tasks(&self, graph: &ProjectGraph) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| !graph.contains_task(&t.task_id))
            .map(|t| t.task_id.as_str())
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Baselines of one project, ordered by sequence number.
#[derive(Clone, Debug, Default)]
pub struct BaselineLedger {
    project_id: String,
    entries: Vec<Arc<Baseline>>,
}

impl BaselineLedger {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            entries: Vec::new(),
        }
    }

    /// Rebuild a ledger from persisted baselines (any order).
    pub fn restore(
        project_id: impl Into<String>,
        mut baselines: Vec<Baseline>,
    ) -> Result<Self, BaselineError> {
        let mut ledger = Self::new(project_id);
        baselines.sort_by_key(|b| b.sequence_number);
        for baseline in baselines {
            ledger.record(baseline)?;
        }
        Ok(ledger)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Sequence number the next baseline must carry.
    pub fn next_sequence(&self) -> u32 {
        self.entries
            .last()
            .map(|b| b.sequence_number + 1)
            .unwrap_or(1)
    }

    /// Append a baseline; its sequence number must be exactly `next_sequence()`.
    pub fn record(&mut self, baseline: Baseline) -> Result<Arc<Baseline>, BaselineError> {
        if baseline.project_id != self.project_id {
            return Err(BaselineError::ProjectMismatch {
                expected: self.project_id.clone(),
                got: baseline.project_id,
            });
        }
        let expected = self.next_sequence();
        if baseline.sequence_number != expected {
            return Err(BaselineError::SequenceConflict {
                project: self.project_id.clone(),
                sequence_number: baseline.sequence_number,
                expected,
            });
        }
        let baseline = Arc::new(baseline);
        self.entries.push(Arc::clone(&baseline));
        Ok(baseline)
    }

    /// All baselines, ascending by sequence number.
    pub fn list(&self) -> &[Arc<Baseline>] {
        &self.entries
    }

    pub fn get(&self, sequence_number: u32) -> Option<&Arc<Baseline>> {
        // Sequence numbers are dense from 1.
        let idx = (sequence_number as usize).checked_sub(1)?;
        self.entries.get(idx)
    }

    pub fn latest(&self) -> Option<&Arc<Baseline>> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
