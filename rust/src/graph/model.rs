//! In-memory task/dependency graph for one project.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::SubtaskPolicy;
use crate::models::{
    Assignment, Dependency, DependencyKind, DependencyUpdate, Task, TaskBaseline, TaskId,
    TaskUpdate,
};

use super::validate;
use super::GraphError;

/// Tasks and dependencies of one project.
///
/// Every mutation validates first and only then commits, so a returned error
/// always means the graph is exactly as it was before the call. The edge set
/// is kept acyclic, free of self edges and unique per ordered task pair.
#[derive(Clone, Debug, Default)]
pub struct ProjectGraph {
    project_id: String,
    tasks: FxHashMap<TaskId, Task>,
    /// predecessor -> successor -> edge
    outgoing: FxHashMap<TaskId, FxHashMap<TaskId, Dependency>>,
    /// successor -> predecessors
    incoming: FxHashMap<TaskId, FxHashSet<TaskId>>,
    /// storage id -> (predecessor, successor)
    dependency_ids: FxHashMap<String, (TaskId, TaskId)>,
    edge_count: usize,
    /// Bumped by every change that invalidates computed schedule fields.
    revision: u64,
}

impl ProjectGraph {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Default::default()
        }
    }

    /// Build a graph from records supplied by the storage layer.
    ///
    /// Tasks are inserted first so parent links and edges may reference tasks
    /// in any order; edges then go through the same validation as
    /// [`add_dependency`](Self::add_dependency).
    pub fn load(
        project_id: impl Into<String>,
        tasks: impl IntoIterator<Item = Task>,
        dependencies: impl IntoIterator<Item = Dependency>,
    ) -> Result<Self, GraphError> {
        let mut graph = Self::new(project_id);

        for task in tasks {
            if graph.tasks.contains_key(&task.id) {
                return Err(GraphError::DuplicateTask(task.id));
            }
            check_progress(&task.id, task.progress)?;
            graph.tasks.insert(task.id.clone(), task);
        }

        let parent_links: Vec<(TaskId, TaskId)> = graph
            .tasks
            .values()
            .filter_map(|t| t.parent_id.clone().map(|p| (t.id.clone(), p)))
            .collect();
        for (task, parent) in &parent_links {
            validate::check_parent(&graph, task, parent)?;
        }

        for dep in dependencies {
            graph.add_dependency(dep)?;
        }
        Ok(graph)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Structural revision; changes whenever the schedule must be recomputed.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn contains_task(&self, id: &str) -> bool {
        self.tasks.contains_key(id)
    }

    /// Tasks in arbitrary order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn dependency(&self, predecessor: &str, successor: &str) -> Option<&Dependency> {
        self.outgoing.get(predecessor)?.get(successor)
    }

    pub fn has_dependency(&self, predecessor: &str, successor: &str) -> bool {
        self.dependency(predecessor, successor).is_some()
    }

    /// All edges ordered by (predecessor, successor).
    pub fn dependencies(&self) -> Vec<&Dependency> {
        let mut deps: Vec<&Dependency> = self.outgoing.values().flat_map(|m| m.values()).collect();
        deps.sort_by(|a, b| {
            a.predecessor
                .cmp(&b.predecessor)
                .then_with(|| a.successor.cmp(&b.successor))
        });
        deps
    }

    /// Outgoing edges of `id`.
    pub fn successors_of<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Dependency> + 'a {
        self.outgoing.get(id).into_iter().flat_map(|m| m.values())
    }

    /// Incoming edges of `id`.
    pub fn predecessors_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Dependency> + 'a {
        self.incoming
            .get(id)
            .into_iter()
            .flat_map(move |preds| preds.iter().filter_map(move |p| self.dependency(p, id)))
    }

    /// Direct subtasks of `id` in id order.
    pub fn subtasks_of(&self, id: &str) -> Vec<&Task> {
        let mut children: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| t.parent_id.as_deref() == Some(id))
            .collect();
        children.sort_by(|a, b| a.id.cmp(&b.id));
        children
    }

    /// Mean task progress, rounded; 0 for an empty project.
    pub fn progress_percentage(&self) -> u8 {
        if self.tasks.is_empty() {
            return 0;
        }
        let total: u64 = self.tasks.values().map(|t| u64::from(t.progress)).sum();
        (total as f64 / self.tasks.len() as f64).round() as u8
    }

    pub fn add_task(&mut self, task: Task) -> Result<(), GraphError> {
        if self.tasks.contains_key(&task.id) {
            return Err(GraphError::DuplicateTask(task.id));
        }
        check_progress(&task.id, task.progress)?;
        if let Some(parent) = &task.parent_id {
            validate::check_parent(self, &task.id, parent)?;
        }

        self.tasks.insert(task.id.clone(), task);
        self.revision += 1;
        Ok(())
    }

    /// Remove a task together with every edge touching it.
    ///
    /// Subtasks of the removed task are handled per `policy`: `Reparent`
    /// moves them to the removed task's parent, `Orphan` makes them top level.
    pub fn remove_task(&mut self, id: &str, policy: SubtaskPolicy) -> Result<Task, GraphError> {
        let removed = self
            .tasks
            .remove(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.to_string()))?;

        if let Some(successors) = self.outgoing.remove(id) {
            for (succ, dep) in &successors {
                self.dependency_ids.remove(&dep.id);
                if let Some(preds) = self.incoming.get_mut(succ) {
                    preds.remove(id);
                    if preds.is_empty() {
                        self.incoming.remove(succ);
                    }
                }
            }
            self.edge_count -= successors.len();
        }
        if let Some(preds) = self.incoming.remove(id) {
            for pred in &preds {
                if let Some(out) = self.outgoing.get_mut(pred) {
                    if let Some(dep) = out.remove(id) {
                        self.dependency_ids.remove(&dep.id);
                        self.edge_count -= 1;
                    }
                    if out.is_empty() {
                        self.outgoing.remove(pred);
                    }
                }
            }
        }

        let new_parent = match policy {
            SubtaskPolicy::Reparent => removed.parent_id.clone(),
            SubtaskPolicy::Orphan => None,
        };
        for task in self.tasks.values_mut() {
            if task.parent_id.as_deref() == Some(id) {
                task.parent_id = new_parent.clone();
            }
        }

        self.revision += 1;
        Ok(removed)
    }

    /// Apply an explicit field update. Returns whether the update was structural.
    pub fn update_task(&mut self, id: &str, update: TaskUpdate) -> Result<bool, GraphError> {
        if !self.tasks.contains_key(id) {
            return Err(GraphError::TaskNotFound(id.to_string()));
        }
        if let Some(progress) = update.progress {
            check_progress(id, progress)?;
        }
        if let Some(Some(parent)) = &update.parent_id {
            validate::check_parent(self, id, parent)?;
        }

        let structural = update.is_structural();
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| GraphError::TaskNotFound(id.to_string()))?;

        if let Some(v) = update.title {
            task.title = v;
        }
        if let Some(v) = update.description {
            task.description = v;
        }
        if let Some(v) = update.status {
            task.status = v;
        }
        if let Some(v) = update.kanban_order {
            task.kanban_order = v;
        }
        if let Some(v) = update.start_date {
            task.start_date = v;
        }
        if let Some(v) = update.end_date {
            task.end_date = v;
        }
        if let Some(v) = update.duration_days {
            task.duration_days = Some(v);
        }
        if let Some(v) = update.progress {
            task.progress = v;
        }
        if let Some(v) = update.priority {
            task.priority = v;
        }
        if let Some(v) = update.parent_id {
            task.parent_id = v;
        }
        if let Some(v) = update.estimated_hours {
            task.estimated_hours = v;
        }
        if let Some(v) = update.actual_hours {
            task.actual_hours = v;
        }
        if let Some(v) = update.estimated_cost {
            task.estimated_cost = v;
        }
        if let Some(v) = update.actual_cost {
            task.actual_cost = v;
        }

        if structural {
            self.revision += 1;
        }
        Ok(structural)
    }

    /// Insert an edge after checking it against the graph invariants.
    pub fn add_dependency(&mut self, dep: Dependency) -> Result<(), GraphError> {
        validate::check_new_edge(self, &dep.predecessor, &dep.successor)?;
        if self.dependency_ids.contains_key(&dep.id) {
            return Err(GraphError::DuplicateDependencyId(dep.id));
        }

        self.dependency_ids.insert(
            dep.id.clone(),
            (dep.predecessor.clone(), dep.successor.clone()),
        );
        self.incoming
            .entry(dep.successor.clone())
            .or_default()
            .insert(dep.predecessor.clone());
        self.outgoing
            .entry(dep.predecessor.clone())
            .or_default()
            .insert(dep.successor.clone(), dep);
        self.edge_count += 1;
        self.revision += 1;
        Ok(())
    }

    /// Convenience wrapper around [`add_dependency`](Self::add_dependency);
    /// returns the generated edge id.
    pub fn connect(
        &mut self,
        predecessor: &str,
        successor: &str,
        kind: DependencyKind,
        lag_days: i64,
    ) -> Result<String, GraphError> {
        let dep = Dependency::new(predecessor, successor, kind, lag_days);
        let id = dep.id.clone();
        self.add_dependency(dep)?;
        Ok(id)
    }

    pub fn remove_dependency(
        &mut self,
        predecessor: &str,
        successor: &str,
    ) -> Result<Dependency, GraphError> {
        let removed = self
            .outgoing
            .get_mut(predecessor)
            .and_then(|out| out.remove(successor))
            .ok_or_else(|| {
                GraphError::DependencyNotFound(format!("{predecessor} -> {successor}"))
            })?;

        self.dependency_ids.remove(&removed.id);
        if self.outgoing.get(predecessor).is_some_and(|out| out.is_empty()) {
            self.outgoing.remove(predecessor);
        }
        if let Some(preds) = self.incoming.get_mut(successor) {
            preds.remove(predecessor);
            if preds.is_empty() {
                self.incoming.remove(successor);
            }
        }
        self.edge_count -= 1;
        self.revision += 1;
        Ok(removed)
    }

    /// Remove an edge by the id the storage layer knows it under.
    pub fn remove_dependency_by_id(&mut self, dependency_id: &str) -> Result<Dependency, GraphError> {
        let (pred, succ) = self
            .dependency_ids
            .get(dependency_id)
            .cloned()
            .ok_or_else(|| GraphError::DependencyNotFound(dependency_id.to_string()))?;
        self.remove_dependency(&pred, &succ)
    }

    /// Change the kind and/or lag of an existing edge.
    pub fn update_dependency(
        &mut self,
        predecessor: &str,
        successor: &str,
        update: DependencyUpdate,
    ) -> Result<(), GraphError> {
        let dep = self
            .outgoing
            .get_mut(predecessor)
            .and_then(|out| out.get_mut(successor))
            .ok_or_else(|| {
                GraphError::DependencyNotFound(format!("{predecessor} -> {successor}"))
            })?;

        let mut changed = false;
        if let Some(kind) = update.kind {
            changed |= dep.kind != kind;
            dep.kind = kind;
        }
        if let Some(lag) = update.lag_days {
            changed |= dep.lag_days != lag;
            dep.lag_days = lag;
        }
        if changed {
            self.revision += 1;
        }
        Ok(())
    }

    /// Record a team member allocation on a task (one record per member).
    pub fn assign(&mut self, task_id: &str, assignment: Assignment) -> Result<(), GraphError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;
        if assignment.allocation_percentage > 100 {
            return Err(GraphError::InvalidAllocation {
                task: task_id.to_string(),
                percentage: assignment.allocation_percentage,
            });
        }
        if task
            .assignments
            .iter()
            .any(|a| a.team_member_id == assignment.team_member_id)
        {
            return Err(GraphError::DuplicateAssignment {
                task: task_id.to_string(),
                member: assignment.team_member_id,
            });
        }
        task.assignments.push(assignment);
        Ok(())
    }

    pub fn unassign(&mut self, task_id: &str, member_id: &str) -> Result<Assignment, GraphError> {
        let task = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| GraphError::TaskNotFound(task_id.to_string()))?;
        let pos = task
            .assignments
            .iter()
            .position(|a| a.team_member_id == member_id)
            .ok_or_else(|| GraphError::AssignmentNotFound {
                task: task_id.to_string(),
                member: member_id.to_string(),
            })?;
        Ok(task.assignments.remove(pos))
    }

    /// Overwrite per-task baseline values. Only the snapshotter calls this.
    pub(crate) fn stamp_baselines(&mut self, stamps: FxHashMap<TaskId, TaskBaseline>) {
        for (id, stamp) in stamps {
            if let Some(task) = self.tasks.get_mut(&id) {
                task.baseline = Some(stamp);
            }
        }
    }
}

fn check_progress(task: &str, progress: u8) -> Result<(), GraphError> {
    if progress > 100 {
        return Err(GraphError::InvalidProgress {
            task: task.to_string(),
            progress,
        });
    }
    Ok(())
}
