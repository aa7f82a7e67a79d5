//! Project façade and the portfolio of open projects.
//!
//! A [`Project`] owns one [`ProjectGraph`], its published [`Schedule`] and its
//! [`BaselineLedger`] behind a single `RwLock`. Mutations, scheduler runs and
//! baseline creation take the write lock, so they are serialized per
//! project; queries take the read lock and run concurrently. A schedule is
//! built off to the side and published with one pointer swap, so readers
//! only ever see a complete result.

use chrono::{NaiveDate, Utc};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::baseline::{Baseline, BaselineError, BaselineLedger, TaskVariance};
use crate::config::{ConfigError, EngineConfig};
use crate::critical_path::{CriticalPathScheduler, CriticalPathSchedulerError, Schedule};
use crate::graph::{GraphError, ProjectGraph};
use crate::models::{
    Assignment, Dependency, DependencyKind, DependencyUpdate, Task, TaskStatus, TaskUpdate,
};
use crate::views::{GanttChart, KanbanBoard};
use crate::{log_changes, log_checks};

/// Flat classification of every failure the engine reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    SelfDependency,
    CircularDependency,
    DuplicateDependency,
    DuplicateDependencyId,
    GraphNotAcyclic,
    InvalidDuration,
    TaskNotFound,
    BaselineSequenceConflict,
    DuplicateTask,
    InvalidProgress,
    InvalidParent,
    DependencyNotFound,
    DuplicateAssignment,
    AssignmentNotFound,
    InvalidAllocation,
    DateOutOfRange,
    BaselineNotFound,
    ProjectMismatch,
    StaleSchedule,
    ProjectNotFound,
    DuplicateProject,
    InvalidConfig,
    Poisoned,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::SelfDependency => "SelfDependency",
            ErrorKind::CircularDependency => "CircularDependency",
            ErrorKind::DuplicateDependency => "DuplicateDependency",
            ErrorKind::DuplicateDependencyId => "DuplicateDependencyId",
            ErrorKind::GraphNotAcyclic => "GraphNotAcyclic",
            ErrorKind::InvalidDuration => "InvalidDuration",
            ErrorKind::TaskNotFound => "TaskNotFound",
            ErrorKind::BaselineSequenceConflict => "BaselineSequenceConflict",
            ErrorKind::DuplicateTask => "DuplicateTask",
            ErrorKind::InvalidProgress => "InvalidProgress",
            ErrorKind::InvalidParent => "InvalidParent",
            ErrorKind::DependencyNotFound => "DependencyNotFound",
            ErrorKind::DuplicateAssignment => "DuplicateAssignment",
            ErrorKind::AssignmentNotFound => "AssignmentNotFound",
            ErrorKind::InvalidAllocation => "InvalidAllocation",
            ErrorKind::DateOutOfRange => "DateOutOfRange",
            ErrorKind::BaselineNotFound => "BaselineNotFound",
            ErrorKind::ProjectMismatch => "ProjectMismatch",
            ErrorKind::StaleSchedule => "StaleSchedule",
            ErrorKind::ProjectNotFound => "ProjectNotFound",
            ErrorKind::DuplicateProject => "DuplicateProject",
            ErrorKind::InvalidConfig => "InvalidConfig",
            ErrorKind::Poisoned => "Poisoned",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Schedule(#[from] CriticalPathSchedulerError),
    #[error(transparent)]
    Baseline(#[from] BaselineError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Project not found: {0}")]
    ProjectNotFound(String),
    #[error("Project already open: {0}")]
    DuplicateProject(String),
    #[error("State of project {0} was poisoned by a panicking writer")]
    Poisoned(String),
}

impl ProjectError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectError::Graph(err) => match err {
                GraphError::TaskNotFound(_) => ErrorKind::TaskNotFound,
                GraphError::DuplicateTask(_) => ErrorKind::DuplicateTask,
                GraphError::SelfDependency(_) => ErrorKind::SelfDependency,
                GraphError::CircularDependency { .. } => ErrorKind::CircularDependency,
                GraphError::DuplicateDependency { .. } => ErrorKind::DuplicateDependency,
                GraphError::DuplicateDependencyId(_) => ErrorKind::DuplicateDependencyId,
                GraphError::DependencyNotFound(_) => ErrorKind::DependencyNotFound,
                GraphError::InvalidProgress { .. } => ErrorKind::InvalidProgress,
                GraphError::InvalidParent { .. } => ErrorKind::InvalidParent,
                GraphError::DuplicateAssignment { .. } => ErrorKind::DuplicateAssignment,
                GraphError::AssignmentNotFound { .. } => ErrorKind::AssignmentNotFound,
                GraphError::InvalidAllocation { .. } => ErrorKind::InvalidAllocation,
            },
            ProjectError::Schedule(err) => match err {
                CriticalPathSchedulerError::GraphNotAcyclic(_) => ErrorKind::GraphNotAcyclic,
                CriticalPathSchedulerError::InvalidDuration { .. } => ErrorKind::InvalidDuration,
                CriticalPathSchedulerError::TaskNotFound(_) => ErrorKind::TaskNotFound,
                CriticalPathSchedulerError::DateOutOfRange(_) => ErrorKind::DateOutOfRange,
            },
            ProjectError::Baseline(err) => match err {
                BaselineError::SequenceConflict { .. } => ErrorKind::BaselineSequenceConflict,
                BaselineError::ProjectMismatch { .. } => ErrorKind::ProjectMismatch,
                BaselineError::NotFound { .. } => ErrorKind::BaselineNotFound,
                BaselineError::StaleSchedule(_) => ErrorKind::StaleSchedule,
            },
            ProjectError::Config(_) => ErrorKind::InvalidConfig,
            ProjectError::ProjectNotFound(_) => ErrorKind::ProjectNotFound,
            ProjectError::DuplicateProject(_) => ErrorKind::DuplicateProject,
            ProjectError::Poisoned(_) => ErrorKind::Poisoned,
        }
    }
}

#[derive(Debug)]
struct ProjectState {
    graph: ProjectGraph,
    schedule: Option<Arc<Schedule>>,
    baselines: BaselineLedger,
}

#[derive(Debug)]
pub struct Project {
    id: String,
    project_start: NaiveDate,
    config: EngineConfig,
    state: RwLock<ProjectState>,
}

impl Project {
    /// Open an empty project. Fails if `config` does not validate.
    pub fn new(
        id: impl Into<String>,
        project_start: NaiveDate,
        config: EngineConfig,
    ) -> Result<Self, ProjectError> {
        config.validate()?;
        let id = id.into();
        Ok(Self {
            state: RwLock::new(ProjectState {
                graph: ProjectGraph::new(id.clone()),
                schedule: None,
                baselines: BaselineLedger::new(id.clone()),
            }),
            id,
            project_start,
            config,
        })
    }

    /// Build a project from stored tasks, dependencies and baselines.
    pub fn load(
        id: impl Into<String>,
        project_start: NaiveDate,
        config: EngineConfig,
        tasks: Vec<Task>,
        dependencies: Vec<Dependency>,
        baselines: Vec<Baseline>,
    ) -> Result<Self, ProjectError> {
        config.validate()?;
        let id = id.into();
        let state = ProjectState {
            graph: ProjectGraph::load(id.clone(), tasks, dependencies)?,
            schedule: None,
            baselines: BaselineLedger::restore(id.clone(), baselines)?,
        };
        log_changes!(
            config.verbosity,
            project = %id,
            tasks = state.graph.task_count(),
            edges = state.graph.dependency_count(),
            baselines = state.baselines.len(),
            "project loaded"
        );

        let project = Self {
            id,
            project_start,
            config,
            state: RwLock::new(state),
        };
        if project.config.auto_recompute {
            let mut guard = project.write()?;
            project.refresh(&mut guard);
        }
        Ok(project)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project_start(&self) -> NaiveDate {
        self.project_start
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, ProjectState>, ProjectError> {
        self.state
            .read()
            .map_err(|_| ProjectError::Poisoned(self.id.clone()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ProjectState>, ProjectError> {
        self.state
            .write()
            .map_err(|_| ProjectError::Poisoned(self.id.clone()))
    }

    fn scheduler(&self) -> CriticalPathScheduler {
        CriticalPathScheduler::new(self.project_start, self.config.critical_path_config())
    }

    /// Compute a schedule and publish it. On error nothing is published.
    fn publish(&self, state: &mut ProjectState) -> Result<Arc<Schedule>, CriticalPathSchedulerError> {
        let schedule = Arc::new(self.scheduler().schedule(&state.graph)?);
        state.schedule = Some(Arc::clone(&schedule));
        Ok(schedule)
    }

    /// Best-effort recompute after a structural change.
    fn refresh(&self, state: &mut ProjectState) {
        if let Err(err) = self.publish(state) {
            log_checks!(
                self.config.verbosity,
                project = %self.id,
                error = %err,
                "recompute failed, previous schedule left in place"
            );
        }
    }

    /// Run one graph mutation under the write lock.
    fn mutate<T>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut ProjectGraph) -> Result<T, GraphError>,
    ) -> Result<T, ProjectError> {
        let mut guard = self.write()?;
        let state = &mut *guard;
        let before = state.graph.revision();

        match f(&mut state.graph) {
            Ok(value) => {
                let structural = state.graph.revision() != before;
                log_changes!(
                    self.config.verbosity,
                    project = %self.id,
                    op,
                    structural,
                    "mutation applied"
                );
                if structural && self.config.auto_recompute {
                    self.refresh(state);
                }
                Ok(value)
            }
            Err(err) => {
                log_checks!(
                    self.config.verbosity,
                    project = %self.id,
                    op,
                    error = %err,
                    "mutation rejected"
                );
                Err(err.into())
            }
        }
    }

    pub fn add_task(&self, task: Task) -> Result<(), ProjectError> {
        self.mutate("add_task", |graph| graph.add_task(task))
    }

    pub fn remove_task(&self, id: &str) -> Result<Task, ProjectError> {
        let policy = self.config.subtask_policy;
        self.mutate("remove_task", |graph| graph.remove_task(id, policy))
    }

    /// Apply `update`; returns whether it touched scheduling inputs.
    pub fn update_task(&self, id: &str, update: TaskUpdate) -> Result<bool, ProjectError> {
        self.mutate("update_task", |graph| graph.update_task(id, update))
    }

    pub fn update_progress(&self, id: &str, progress: u8) -> Result<(), ProjectError> {
        let update = TaskUpdate {
            progress: Some(progress),
            ..Default::default()
        };
        self.mutate("update_progress", |graph| graph.update_task(id, update))
            .map(|_| ())
    }

    pub fn update_status(&self, id: &str, status: TaskStatus) -> Result<(), ProjectError> {
        let update = TaskUpdate {
            status: Some(status),
            ..Default::default()
        };
        self.mutate("update_status", |graph| graph.update_task(id, update))
            .map(|_| ())
    }

    /// Move a card to `status` at position `kanban_order`.
    pub fn move_kanban(
        &self,
        id: &str,
        status: TaskStatus,
        kanban_order: i32,
    ) -> Result<(), ProjectError> {
        let update = TaskUpdate {
            status: Some(status),
            kanban_order: Some(kanban_order),
            ..Default::default()
        };
        self.mutate("move_kanban", |graph| graph.update_task(id, update))
            .map(|_| ())
    }

    /// Add `predecessor -> successor`; returns the new dependency id.
    pub fn add_dependency(
        &self,
        predecessor: &str,
        successor: &str,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Result<String, ProjectError> {
        self.mutate("add_dependency", |graph| {
            graph.connect(predecessor, successor, kind, lag_days)
        })
    }

    /// Add a dependency record that already carries its storage id.
    pub fn insert_dependency(&self, dependency: Dependency) -> Result<(), ProjectError> {
        self.mutate("insert_dependency", |graph| graph.add_dependency(dependency))
    }

    pub fn remove_dependency(
        &self,
        predecessor: &str,
        successor: &str,
    ) -> Result<Dependency, ProjectError> {
        self.mutate("remove_dependency", |graph| {
            graph.remove_dependency(predecessor, successor)
        })
    }

    pub fn remove_dependency_by_id(&self, dependency_id: &str) -> Result<Dependency, ProjectError> {
        self.mutate("remove_dependency", |graph| {
            graph.remove_dependency_by_id(dependency_id)
        })
    }

    pub fn update_dependency(
        &self,
        predecessor: &str,
        successor: &str,
        update: DependencyUpdate,
    ) -> Result<(), ProjectError> {
        self.mutate("update_dependency", |graph| {
            graph.update_dependency(predecessor, successor, update)
        })
    }

    pub fn assign(&self, task_id: &str, assignment: Assignment) -> Result<(), ProjectError> {
        self.mutate("assign", |graph| graph.assign(task_id, assignment))
    }

    pub fn unassign(&self, task_id: &str, member_id: &str) -> Result<Assignment, ProjectError> {
        self.mutate("unassign", |graph| graph.unassign(task_id, member_id))
    }

    /// Reschedule now and publish the result.
    ///
    /// On failure the previously published schedule stays in place.
    pub fn recompute(&self) -> Result<Arc<Schedule>, ProjectError> {
        let mut guard = self.write()?;
        match self.publish(&mut guard) {
            Ok(schedule) => Ok(schedule),
            Err(err) => {
                log_checks!(
                    self.config.verbosity,
                    project = %self.id,
                    error = %err,
                    "recompute failed"
                );
                Err(err.into())
            }
        }
    }

    /// Last published schedule, which may predate recent changes.
    pub fn schedule(&self) -> Result<Option<Arc<Schedule>>, ProjectError> {
        Ok(self.read()?.schedule.clone())
    }

    /// Whether the graph changed structurally since the last publish.
    pub fn is_schedule_stale(&self) -> Result<bool, ProjectError> {
        let state = self.read()?;
        Ok(state
            .schedule
            .as_ref()
            .map_or(true, |s| s.is_stale_for(&state.graph)))
    }

    /// Snapshot the current schedule and cost state as the next baseline.
    ///
    /// Reschedules first when the published schedule is missing or stale.
    /// Every task is then stamped with its baseline values.
    pub fn create_baseline(
        &self,
        label: Option<String>,
        created_by: Option<String>,
    ) -> Result<Arc<Baseline>, ProjectError> {
        let mut guard = self.write()?;
        let state = &mut *guard;

        let fresh = state
            .schedule
            .as_ref()
            .filter(|s| !s.is_stale_for(&state.graph))
            .cloned();
        let schedule = match fresh {
            Some(schedule) => schedule,
            None => self.publish(state)?,
        };

        let sequence_number = state.baselines.next_sequence();
        let label = label.unwrap_or_else(|| self.config.default_baseline_label(sequence_number));
        let baseline = Baseline::capture(
            &state.graph,
            &schedule,
            sequence_number,
            label,
            created_by,
            Utc::now(),
        )?;
        let stamps = baseline.stamps();
        let recorded = state.baselines.record(baseline)?;
        state.graph.stamp_baselines(stamps);

        log_changes!(
            self.config.verbosity,
            project = %self.id,
            sequence = sequence_number,
            label = %recorded.label,
            "baseline created"
        );
        Ok(recorded)
    }

    /// Baselines ascending by sequence number.
    pub fn list_baselines(&self) -> Result<Vec<Arc<Baseline>>, ProjectError> {
        Ok(self.read()?.baselines.list().to_vec())
    }

    pub fn baseline(&self, sequence_number: u32) -> Result<Arc<Baseline>, ProjectError> {
        let state = self.read()?;
        state
            .baselines
            .get(sequence_number)
            .cloned()
            .ok_or_else(|| {
                BaselineError::NotFound {
                    project: self.id.clone(),
                    sequence_number,
                }
                .into()
            })
    }

    /// Compare baseline `sequence_number` with the current tasks and schedule.
    pub fn variance(&self, sequence_number: u32) -> Result<Vec<TaskVariance>, ProjectError> {
        let baseline = self.baseline(sequence_number)?;
        let state = self.read()?;
        Ok(baseline.variance(&state.graph, state.schedule.as_deref()))
    }

    pub fn kanban(&self) -> Result<KanbanBoard, ProjectError> {
        Ok(KanbanBoard::build(&self.read()?.graph))
    }

    pub fn gantt(&self) -> Result<GanttChart, ProjectError> {
        let state = self.read()?;
        Ok(GanttChart::build(&state.graph, state.schedule.as_deref()))
    }

    pub fn progress_percentage(&self) -> Result<u8, ProjectError> {
        Ok(self.read()?.graph.progress_percentage())
    }

    pub fn task(&self, id: &str) -> Result<Option<Task>, ProjectError> {
        Ok(self.read()?.graph.task(id).cloned())
    }

    /// Run `f` against the graph under the read lock.
    pub fn with_graph<R>(&self, f: impl FnOnce(&ProjectGraph) -> R) -> Result<R, ProjectError> {
        Ok(f(&self.read()?.graph))
    }
}

/// Registry of open projects. Projects share nothing with each other.
#[derive(Debug)]
pub struct Portfolio {
    config: EngineConfig,
    projects: RwLock<FxHashMap<String, Arc<Project>>>,
}

impl Portfolio {
    pub fn new(config: EngineConfig) -> Result<Self, ProjectError> {
        config.validate()?;
        Ok(Self {
            config,
            projects: RwLock::new(FxHashMap::default()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Open an empty project.
    pub fn open(&self, id: &str, project_start: NaiveDate) -> Result<Arc<Project>, ProjectError> {
        self.insert(Project::new(id, project_start, self.config.clone())?)
    }

    /// Open a project from stored records.
    pub fn load(
        &self,
        id: &str,
        project_start: NaiveDate,
        tasks: Vec<Task>,
        dependencies: Vec<Dependency>,
        baselines: Vec<Baseline>,
    ) -> Result<Arc<Project>, ProjectError> {
        if self.contains(id)? {
            return Err(ProjectError::DuplicateProject(id.to_string()));
        }
        let project = Project::load(
            id,
            project_start,
            self.config.clone(),
            tasks,
            dependencies,
            baselines,
        )?;
        self.insert(project)
    }

    fn insert(&self, project: Project) -> Result<Arc<Project>, ProjectError> {
        let mut projects = self.write()?;
        if projects.contains_key(project.id()) {
            return Err(ProjectError::DuplicateProject(project.id().to_string()));
        }
        let project = Arc::new(project);
        projects.insert(project.id().to_string(), Arc::clone(&project));
        log_changes!(self.config.verbosity, project = %project.id(), "project opened");
        Ok(project)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Project>, ProjectError> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| ProjectError::ProjectNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> Result<bool, ProjectError> {
        Ok(self.read()?.contains_key(id))
    }

    /// Close a project. Its graph, schedule and baselines go with it once
    /// the last outstanding handle is dropped.
    pub fn close(&self, id: &str) -> Result<Arc<Project>, ProjectError> {
        let removed = self
            .write()?
            .remove(id)
            .ok_or_else(|| ProjectError::ProjectNotFound(id.to_string()))?;
        log_changes!(self.config.verbosity, project = id, "project closed");
        Ok(removed)
    }

    /// Open project ids, sorted.
    pub fn ids(&self) -> Result<Vec<String>, ProjectError> {
        let mut ids: Vec<String> = self.read()?.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn len(&self) -> Result<usize, ProjectError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, ProjectError> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, FxHashMap<String, Arc<Project>>>, ProjectError> {
        self.projects
            .read()
            .map_err(|_| ProjectError::Poisoned("portfolio".to_string()))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, FxHashMap<String, Arc<Project>>>, ProjectError> {
        self.projects
            .write()
            .map_err(|_| ProjectError::Poisoned("portfolio".to_string()))
    }
}
