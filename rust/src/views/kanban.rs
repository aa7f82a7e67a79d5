use chrono::NaiveDate;
use serde::Serialize;

use crate::graph::ProjectGraph;
use crate::models::{Task, TaskId, TaskPriority, TaskStatus};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KanbanCard {
    pub id: TaskId,
    pub title: String,
    pub priority: TaskPriority,
    pub progress: u8,
    pub kanban_order: i32,
    pub due_date: NaiveDate,
    pub assignees: Vec<String>,
}

impl KanbanCard {
    fn from_task(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            priority: task.priority,
            progress: task.progress,
            kanban_order: task.kanban_order,
            due_date: task.end_date,
            assignees: task
                .assignments
                .iter()
                .map(|a| a.team_member_id.clone())
                .collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KanbanColumn {
    pub status: TaskStatus,
    pub cards: Vec<KanbanCard>,
}

/// Tasks bucketed by status, one column per status in workflow order.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KanbanBoard {
    pub project_id: String,
    pub columns: Vec<KanbanColumn>,
}

impl KanbanBoard {
    pub fn build(graph: &ProjectGraph) -> Self {
        let mut columns: Vec<KanbanColumn> = TaskStatus::ALL
            .iter()
            .map(|&status| KanbanColumn {
                status,
                cards: Vec::new(),
            })
            .collect();

        let mut tasks: Vec<&Task> = graph.tasks().collect();
        tasks.sort_by(|a, b| {
            a.kanban_order
                .cmp(&b.kanban_order)
                .then_with(|| a.start_date.cmp(&b.start_date))
                .then_with(|| a.id.cmp(&b.id))
        });

        for task in tasks {
            if let Some(column) = columns.iter_mut().find(|c| c.status == task.status) {
                column.cards.push(KanbanCard::from_task(task));
            }
        }

        Self {
            project_id: graph.project_id().to_string(),
            columns,
        }
    }

    pub fn column(&self, status: TaskStatus) -> Option<&KanbanColumn> {
        self.columns.iter().find(|c| c.status == status)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
