use chrono::NaiveDate;
use serde::Serialize;

use crate::critical_path::Schedule;
use crate::graph::ProjectGraph;
use crate::models::{Task, TaskId};

/// One timeline bar.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GanttTask {
    pub id: TaskId,
    pub text: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration: Option<i64>,
    pub progress: u8,
    pub parent: Option<TaskId>,
    pub is_critical: bool,
    /// Total float from the published schedule, if any.
    pub slack: Option<i64>,
}

/// One timeline arrow; `type` is the lowercase kind token (`fs`, `ss`, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GanttLink {
    pub id: String,
    pub source: TaskId,
    pub target: TaskId,
    #[serde(rename = "type")]
    pub kind: String,
    pub lag: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GanttChart {
    pub data: Vec<GanttTask>,
    pub links: Vec<GanttLink>,
}

impl GanttChart {
    /// Project the graph onto a timeline.
    ///
    /// Critical flags and slack come from `schedule`; without one every task
    /// is reported non-critical.
    pub fn build(graph: &ProjectGraph, schedule: Option<&Schedule>) -> Self {
        let mut tasks: Vec<&Task> = graph.tasks().collect();
        tasks.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));

        let data = tasks
            .into_iter()
            .map(|task| {
                let computed = schedule.and_then(|s| s.task(&task.id));
                GanttTask {
                    id: task.id.clone(),
                    text: task.title.clone(),
                    start_date: task.start_date,
                    end_date: task.end_date,
                    duration: task.duration_days,
                    progress: task.progress,
                    parent: task.parent_id.clone(),
                    is_critical: computed.is_some_and(|c| c.is_critical),
                    slack: computed.map(|c| c.slack),
                }
            })
            .collect();

        let links = graph
            .dependencies()
            .into_iter()
            .map(|dep| GanttLink {
                id: dep.id.clone(),
                source: dep.predecessor.clone(),
                target: dep.successor.clone(),
                kind: dep.kind.wire_token().to_string(),
                lag: dep.lag_days,
            })
            .collect();

        Self { data, links }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
