//! Core data types for project graphs.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque task identifier supplied by the record-storage layer.
pub type TaskId = String;

/// Kanban column a task sits in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Backlog,
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// Board columns in display order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Backlog,
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Review => "review",
            Self::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}

/// Temporal relation carried by a dependency edge.
///
/// The first letter names the predecessor's anchor, the second the
/// successor's: `FinishToStart` means the successor may not start before the
/// predecessor finishes (plus lag).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    #[serde(rename = "FS", alias = "fs")]
    FinishToStart,
    #[serde(rename = "SS", alias = "ss")]
    StartToStart,
    #[serde(rename = "FF", alias = "ff")]
    FinishToFinish,
    #[serde(rename = "SF", alias = "sf")]
    StartToFinish,
}

impl DependencyKind {
    /// Two-letter code used by the record-storage layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FinishToStart => "FS",
            Self::StartToStart => "SS",
            Self::FinishToFinish => "FF",
            Self::StartToFinish => "SF",
        }
    }

    /// Lowercase token used in timeline links.
    pub fn wire_token(&self) -> &'static str {
        match self {
            Self::FinishToStart => "fs",
            Self::StartToStart => "ss",
            Self::FinishToFinish => "ff",
            Self::StartToFinish => "sf",
        }
    }

    /// Accepts either the code or the wire token.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FS" => Some(Self::FinishToStart),
            "SS" => Some(Self::StartToStart),
            "FF" => Some(Self::FinishToFinish),
            "SF" => Some(Self::StartToFinish),
            _ => None,
        }
    }

    /// Whether the predecessor side of the constraint is its start.
    pub(crate) fn from_start(&self) -> bool {
        matches!(self, Self::StartToStart | Self::StartToFinish)
    }

    /// Whether the successor side of the constraint is its finish.
    pub(crate) fn to_finish(&self) -> bool {
        matches!(self, Self::FinishToFinish | Self::StartToFinish)
    }
}

impl Default for DependencyKind {
    fn default() -> Self {
        Self::FinishToStart
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A directed scheduling edge `predecessor -> successor`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    pub predecessor: TaskId,
    pub successor: TaskId,
    #[serde(default)]
    pub kind: DependencyKind,
    /// Positive = delay, negative = lead.
    #[serde(default)]
    pub lag_days: i64,
}

impl Dependency {
    pub fn new(
        predecessor: impl Into<TaskId>,
        successor: impl Into<TaskId>,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            predecessor: predecessor.into(),
            successor: successor.into(),
            kind,
            lag_days,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Allocation of a team member to a task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub team_member_id: String,
    pub allocated_hours: f64,
    /// 0-100.
    pub allocation_percentage: u8,
}

/// Baseline values stamped onto a task by the most recent snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskBaseline {
    pub sequence_number: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub duration_days: Option<i64>,
    pub cost: f64,
}

/// A schedulable unit of work.
///
/// Computed schedule fields are not stored here; they live in the
/// [`Schedule`](crate::critical_path::Schedule) published by the scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub kanban_order: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Whole days. `None` or negative values are rejected by the scheduler.
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub parent_id: Option<TaskId>,
    #[serde(default)]
    pub estimated_hours: f64,
    #[serde(default)]
    pub actual_hours: f64,
    #[serde(default)]
    pub estimated_cost: f64,
    #[serde(default)]
    pub actual_cost: f64,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub(crate) baseline: Option<TaskBaseline>,
}

impl Task {
    /// Create a task whose calendar dates span `duration_days` from `start_date`.
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        start_date: NaiveDate,
        duration_days: i64,
    ) -> Self {
        let end_date = chrono::Duration::try_days(duration_days.max(0))
            .and_then(|span| start_date.checked_add_signed(span))
            .unwrap_or(start_date);
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            status: TaskStatus::default(),
            kanban_order: 0,
            start_date,
            end_date,
            duration_days: Some(duration_days),
            progress: 0,
            priority: TaskPriority::default(),
            parent_id: None,
            estimated_hours: 0.0,
            actual_hours: 0.0,
            estimated_cost: 0.0,
            actual_cost: 0.0,
            assignments: Vec::new(),
            baseline: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<TaskId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus, kanban_order: i32) -> Self {
        self.status = status;
        self.kanban_order = kanban_order;
        self
    }

    /// Baseline stamped by the latest snapshot, if any.
    pub fn baseline(&self) -> Option<&TaskBaseline> {
        self.baseline.as_ref()
    }

    /// Estimated minus actual cost.
    pub fn cost_variance(&self) -> f64 {
        self.estimated_cost - self.actual_cost
    }

    /// Days the current end date has moved past the baseline end (0 without a baseline).
    pub fn schedule_variance_days(&self) -> i64 {
        self.baseline
            .as_ref()
            .map(|b| (self.end_date - b.end).num_days())
            .unwrap_or(0)
    }
}

/// Externally settable task fields. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub kanban_order: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub progress: Option<u8>,
    pub priority: Option<TaskPriority>,
    /// `Some(None)` detaches the task from its parent.
    pub parent_id: Option<Option<TaskId>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
    pub estimated_cost: Option<f64>,
    pub actual_cost: Option<f64>,
}

impl TaskUpdate {
    /// Whether applying this update invalidates computed schedule fields.
    pub fn is_structural(&self) -> bool {
        self.duration_days.is_some()
    }
}

/// Externally settable dependency fields.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DependencyUpdate {
    pub kind: Option<DependencyKind>,
    pub lag_days: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, n).unwrap()
    }

    #[test]
    fn test_dependency_kind_parse_and_tokens() {
        assert_eq!(DependencyKind::parse("fs"), Some(DependencyKind::FinishToStart));
        assert_eq!(DependencyKind::parse(" SF "), Some(DependencyKind::StartToFinish));
        assert_eq!(DependencyKind::parse("XX"), None);
        assert_eq!(DependencyKind::StartToStart.wire_token(), "ss");
        assert_eq!(DependencyKind::FinishToFinish.to_string(), "FF");
    }

    #[test]
    fn test_dependency_kind_serde_codes() {
        let kind: DependencyKind = serde_json::from_str("\"SS\"").unwrap();
        assert_eq!(kind, DependencyKind::StartToStart);
        let kind: DependencyKind = serde_json::from_str("\"ff\"").unwrap();
        assert_eq!(kind, DependencyKind::FinishToFinish);
        assert_eq!(
            serde_json::to_string(&DependencyKind::StartToFinish).unwrap(),
            "\"SF\""
        );
    }

    #[test]
    fn test_task_new_derives_end_date() {
        let task = Task::new("a", "Design", day(1), 4);
        assert_eq!(task.end_date, day(5));
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, TaskPriority::Medium);
    }

    #[test]
    fn test_variances() {
        let mut task = Task::new("a", "Design", day(1), 4);
        task.estimated_cost = 100.0;
        task.actual_cost = 130.0;
        assert!((task.cost_variance() + 30.0).abs() < 1e-9);
        assert_eq!(task.schedule_variance_days(), 0);

        task.baseline = Some(TaskBaseline {
            sequence_number: 1,
            start: day(1),
            end: day(3),
            duration_days: Some(2),
            cost: 100.0,
        });
        assert_eq!(task.schedule_variance_days(), 2);
    }

    #[test]
    fn test_status_round_trip_names() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskPriority::parse("critical"), Some(TaskPriority::Critical));
    }

    #[test]
    fn test_update_structural_flag() {
        assert!(!TaskUpdate::default().is_structural());
        let update = TaskUpdate {
            duration_days: Some(3),
            ..Default::default()
        };
        assert!(update.is_structural());
    }
}
