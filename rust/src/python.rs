//! Python bindings for the record-storage layer.
//!
//! Structured results cross the boundary as JSON strings; every
//! [`ErrorKind`] surfaces as its own exception class derived from
//! `ValueError`.

// Allow clippy warning triggered by PyO3 macro expansion
#![allow(clippy::useless_conversion)]

use chrono::NaiveDate;
use pyo3::create_exception;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::sync::Arc;

use crate::baseline::Baseline;
use crate::config::EngineConfig;
use crate::models::{Assignment, Dependency, DependencyKind, Task, TaskStatus};
use crate::project::{ErrorKind, Project, ProjectError};

create_exception!(plancore, SelfDependency, PyValueError);
create_exception!(plancore, CircularDependency, PyValueError);
create_exception!(plancore, DuplicateDependency, PyValueError);
create_exception!(plancore, GraphNotAcyclic, PyValueError);
create_exception!(plancore, InvalidDuration, PyValueError);
create_exception!(plancore, TaskNotFound, PyValueError);
create_exception!(plancore, BaselineSequenceConflict, PyValueError);
create_exception!(plancore, DuplicateTask, PyValueError);
create_exception!(plancore, InvalidProgress, PyValueError);
create_exception!(plancore, InvalidParent, PyValueError);
create_exception!(plancore, DuplicateDependencyId, PyValueError);
create_exception!(plancore, DependencyNotFound, PyValueError);
create_exception!(plancore, DuplicateAssignment, PyValueError);
create_exception!(plancore, AssignmentNotFound, PyValueError);
create_exception!(plancore, InvalidAllocation, PyValueError);
create_exception!(plancore, DateOutOfRange, PyValueError);
create_exception!(plancore, BaselineNotFound, PyValueError);
create_exception!(plancore, ProjectMismatch, PyValueError);
create_exception!(plancore, StaleSchedule, PyValueError);
create_exception!(plancore, ProjectNotFound, PyValueError);
create_exception!(plancore, DuplicateProject, PyValueError);
create_exception!(plancore, InvalidConfig, PyValueError);
create_exception!(plancore, Poisoned, PyValueError);

fn to_py_err(err: ProjectError) -> PyErr {
    let msg = err.to_string();
    match err.kind() {
        ErrorKind::SelfDependency => SelfDependency::new_err(msg),
        ErrorKind::CircularDependency => CircularDependency::new_err(msg),
        ErrorKind::DuplicateDependency => DuplicateDependency::new_err(msg),
        ErrorKind::GraphNotAcyclic => GraphNotAcyclic::new_err(msg),
        ErrorKind::InvalidDuration => InvalidDuration::new_err(msg),
        ErrorKind::TaskNotFound => TaskNotFound::new_err(msg),
        ErrorKind::BaselineSequenceConflict => BaselineSequenceConflict::new_err(msg),
        ErrorKind::DuplicateTask => DuplicateTask::new_err(msg),
        ErrorKind::InvalidProgress => InvalidProgress::new_err(msg),
        ErrorKind::InvalidParent => InvalidParent::new_err(msg),
        ErrorKind::DuplicateDependencyId => DuplicateDependencyId::new_err(msg),
        ErrorKind::DependencyNotFound => DependencyNotFound::new_err(msg),
        ErrorKind::DuplicateAssignment => DuplicateAssignment::new_err(msg),
        ErrorKind::AssignmentNotFound => AssignmentNotFound::new_err(msg),
        ErrorKind::InvalidAllocation => InvalidAllocation::new_err(msg),
        ErrorKind::DateOutOfRange => DateOutOfRange::new_err(msg),
        ErrorKind::BaselineNotFound => BaselineNotFound::new_err(msg),
        ErrorKind::ProjectMismatch => ProjectMismatch::new_err(msg),
        ErrorKind::StaleSchedule => StaleSchedule::new_err(msg),
        ErrorKind::ProjectNotFound => ProjectNotFound::new_err(msg),
        ErrorKind::DuplicateProject => DuplicateProject::new_err(msg),
        ErrorKind::InvalidConfig => InvalidConfig::new_err(msg),
        ErrorKind::Poisoned => Poisoned::new_err(msg),
    }
}

fn json_err(err: serde_json::Error) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn parse_config(config_json: Option<&str>) -> PyResult<EngineConfig> {
    match config_json {
        Some(raw) => EngineConfig::from_json(raw).map_err(|e| to_py_err(e.into())),
        None => Ok(EngineConfig::default()),
    }
}

fn parse_status(status: &str) -> PyResult<TaskStatus> {
    TaskStatus::parse(status)
        .ok_or_else(|| PyValueError::new_err(format!("Unknown task status: {status}")))
}

fn parse_kind(kind: &str) -> PyResult<DependencyKind> {
    DependencyKind::parse(kind)
        .ok_or_else(|| PyValueError::new_err(format!("Unknown dependency kind: {kind}")))
}

/// One project's graph, schedule and baselines.
#[pyclass(name = "Project", frozen)]
pub struct PyProject {
    inner: Arc<Project>,
}

#[pymethods]
impl PyProject {
    #[new]
    #[pyo3(signature = (project_id, project_start, config_json=None))]
    fn new(project_id: String, project_start: NaiveDate, config_json: Option<&str>) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        Ok(Self {
            inner: Arc::new(Project::new(project_id, project_start, config).map_err(to_py_err)?),
        })
    }

    /// Rebuild a project from stored records. Each argument is a JSON array.
    #[staticmethod]
    #[pyo3(signature = (project_id, project_start, tasks_json, dependencies_json, baselines_json="[]", config_json=None))]
    fn load(
        project_id: String,
        project_start: NaiveDate,
        tasks_json: &str,
        dependencies_json: &str,
        baselines_json: &str,
        config_json: Option<&str>,
    ) -> PyResult<Self> {
        let config = parse_config(config_json)?;
        let tasks: Vec<Task> = serde_json::from_str(tasks_json).map_err(json_err)?;
        let dependencies: Vec<Dependency> =
            serde_json::from_str(dependencies_json).map_err(json_err)?;
        let baselines: Vec<Baseline> = serde_json::from_str(baselines_json).map_err(json_err)?;
        let project = Project::load(
            project_id,
            project_start,
            config,
            tasks,
            dependencies,
            baselines,
        )
        .map_err(to_py_err)?;
        Ok(Self {
            inner: Arc::new(project),
        })
    }

    #[getter]
    fn id(&self) -> String {
        self.inner.id().to_string()
    }

    #[pyo3(signature = (task_id, title, start_date, duration_days, parent_id=None, status="todo", kanban_order=0, progress=0, estimated_cost=0.0))]
    #[allow(clippy::too_many_arguments)]
    fn add_task(
        &self,
        task_id: String,
        title: String,
        start_date: NaiveDate,
        duration_days: i64,
        parent_id: Option<String>,
        status: &str,
        kanban_order: i32,
        progress: u8,
        estimated_cost: f64,
    ) -> PyResult<()> {
        let mut task = Task::new(task_id, title, start_date, duration_days)
            .with_status(parse_status(status)?, kanban_order);
        task.parent_id = parent_id;
        task.progress = progress;
        task.estimated_cost = estimated_cost;
        self.inner.add_task(task).map_err(to_py_err)
    }

    fn remove_task(&self, task_id: &str) -> PyResult<()> {
        self.inner.remove_task(task_id).map(|_| ()).map_err(to_py_err)
    }

    /// Apply a JSON-encoded field update; returns whether it was structural.
    fn update_task(&self, task_id: &str, update_json: &str) -> PyResult<bool> {
        let update = serde_json::from_str(update_json).map_err(json_err)?;
        self.inner.update_task(task_id, update).map_err(to_py_err)
    }

    fn update_progress(&self, task_id: &str, progress: u8) -> PyResult<()> {
        self.inner
            .update_progress(task_id, progress)
            .map_err(to_py_err)
    }

    fn move_kanban(&self, task_id: &str, status: &str, kanban_order: i32) -> PyResult<()> {
        self.inner
            .move_kanban(task_id, parse_status(status)?, kanban_order)
            .map_err(to_py_err)
    }

    #[pyo3(signature = (predecessor, successor, kind="FS", lag_days=0))]
    fn add_dependency(
        &self,
        predecessor: &str,
        successor: &str,
        kind: &str,
        lag_days: i64,
    ) -> PyResult<String> {
        self.inner
            .add_dependency(predecessor, successor, parse_kind(kind)?, lag_days)
            .map_err(to_py_err)
    }

    fn remove_dependency(&self, predecessor: &str, successor: &str) -> PyResult<()> {
        self.inner
            .remove_dependency(predecessor, successor)
            .map(|_| ())
            .map_err(to_py_err)
    }

    fn remove_dependency_by_id(&self, dependency_id: &str) -> PyResult<()> {
        self.inner
            .remove_dependency_by_id(dependency_id)
            .map(|_| ())
            .map_err(to_py_err)
    }

    #[pyo3(signature = (task_id, team_member_id, allocated_hours=0.0, allocation_percentage=100))]
    fn assign(
        &self,
        task_id: &str,
        team_member_id: String,
        allocated_hours: f64,
        allocation_percentage: u8,
    ) -> PyResult<()> {
        let assignment = Assignment {
            team_member_id,
            allocated_hours,
            allocation_percentage,
        };
        self.inner.assign(task_id, assignment).map_err(to_py_err)
    }

    /// Recompute and return the schedule as JSON.
    fn recompute(&self) -> PyResult<String> {
        let schedule = self.inner.recompute().map_err(to_py_err)?;
        serde_json::to_string(&*schedule).map_err(json_err)
    }

    /// Published schedule as JSON, or `None` before the first run.
    fn schedule_json(&self) -> PyResult<Option<String>> {
        match self.inner.schedule().map_err(to_py_err)? {
            Some(schedule) => serde_json::to_string(&*schedule)
                .map(Some)
                .map_err(json_err),
            None => Ok(None),
        }
    }

    #[pyo3(signature = (label=None, created_by=None))]
    fn create_baseline(&self, label: Option<String>, created_by: Option<String>) -> PyResult<String> {
        let baseline = self
            .inner
            .create_baseline(label, created_by)
            .map_err(to_py_err)?;
        baseline.to_json().map_err(json_err)
    }

    fn list_baselines(&self) -> PyResult<Vec<String>> {
        self.inner
            .list_baselines()
            .map_err(to_py_err)?
            .iter()
            .map(|b| b.to_json().map_err(json_err))
            .collect()
    }

    /// Per-task variance against baseline `sequence_number`, as JSON.
    fn variance(&self, sequence_number: u32) -> PyResult<String> {
        let rows = self.inner.variance(sequence_number).map_err(to_py_err)?;
        serde_json::to_string(&rows).map_err(json_err)
    }

    fn kanban_json(&self) -> PyResult<String> {
        self.inner
            .kanban()
            .map_err(to_py_err)?
            .to_json()
            .map_err(json_err)
    }

    fn gantt_json(&self) -> PyResult<String> {
        self.inner
            .gantt()
            .map_err(to_py_err)?
            .to_json()
            .map_err(json_err)
    }

    fn progress_percentage(&self) -> PyResult<u8> {
        self.inner.progress_percentage().map_err(to_py_err)
    }

    fn __repr__(&self) -> String {
        format!("Project(id={:?})", self.inner.id())
    }
}

/// The plancore Python module.
#[pymodule]
fn plancore(m: &Bound<'_, PyModule>) -> PyResult<()> {
    let py = m.py();
    m.add_class::<PyProject>()?;

    m.add("SelfDependency", py.get_type_bound::<SelfDependency>())?;
    m.add("CircularDependency", py.get_type_bound::<CircularDependency>())?;
    m.add("DuplicateDependency", py.get_type_bound::<DuplicateDependency>())?;
    m.add("GraphNotAcyclic", py.get_type_bound::<GraphNotAcyclic>())?;
    m.add("InvalidDuration", py.get_type_bound::<InvalidDuration>())?;
    m.add("TaskNotFound", py.get_type_bound::<TaskNotFound>())?;
    m.add(
        "BaselineSequenceConflict",
        py.get_type_bound::<BaselineSequenceConflict>(),
    )?;
    m.add("DuplicateTask", py.get_type_bound::<DuplicateTask>())?;
    m.add("InvalidProgress", py.get_type_bound::<InvalidProgress>())?;
    m.add("InvalidParent", py.get_type_bound::<InvalidParent>())?;
    m.add(
        "DuplicateDependencyId",
        py.get_type_bound::<DuplicateDependencyId>(),
    )?;
    m.add("DependencyNotFound", py.get_type_bound::<DependencyNotFound>())?;
    m.add("DuplicateAssignment", py.get_type_bound::<DuplicateAssignment>())?;
    m.add("AssignmentNotFound", py.get_type_bound::<AssignmentNotFound>())?;
    m.add("InvalidAllocation", py.get_type_bound::<InvalidAllocation>())?;
    m.add("DateOutOfRange", py.get_type_bound::<DateOutOfRange>())?;
    m.add("BaselineNotFound", py.get_type_bound::<BaselineNotFound>())?;
    m.add("ProjectMismatch", py.get_type_bound::<ProjectMismatch>())?;
    m.add("StaleSchedule", py.get_type_bound::<StaleSchedule>())?;
    m.add("ProjectNotFound", py.get_type_bound::<ProjectNotFound>())?;
    m.add("DuplicateProject", py.get_type_bound::<DuplicateProject>())?;
    m.add("InvalidConfig", py.get_type_bound::<InvalidConfig>())?;
    m.add("Poisoned", py.get_type_bound::<Poisoned>())?;

    Ok(())
}
