//! Read-only projections of a project for boards and timelines.

mod gantt;
mod kanban;

pub use gantt::{GanttChart, GanttLink, GanttTask};
pub use kanban::{KanbanBoard, KanbanCard, KanbanColumn};
