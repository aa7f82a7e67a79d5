//! Dense integer ids for task id strings.
//!
//! The scheduler copies a graph into vectors indexed by these ids. Ids are
//! assigned in sorted string order, so the same task set always maps the
//! same way and pass output is reproducible.

use rustc_hash::FxHashMap;

/// Index into the scheduler's per-task vectors.
pub type TaskIdInt = u32;

#[derive(Debug, Clone, Default)]
pub struct TaskIdInterner {
    by_name: FxHashMap<String, TaskIdInt>,
    names: Vec<String>,
}

impl TaskIdInterner {
    /// Number every distinct id in ascending string order.
    pub fn from_sorted<'a>(ids: impl IntoIterator<Item = &'a str>) -> Self {
        let mut names: Vec<String> = ids.into_iter().map(str::to_owned).collect();
        names.sort_unstable();
        names.dedup();

        let by_name = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), idx as TaskIdInt))
            .collect();
        Self { by_name, names }
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<TaskIdInt> {
        self.by_name.get(name).copied()
    }

    #[inline]
    pub fn resolve(&self, id: TaskIdInt) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
