use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::error::{ClientError, Result};
use crate::task::{Task, TaskId};

/// In-memory ordered collection of task records, kept in sync with the
/// backend by the controller.
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole collection. Later duplicates of an id win.
    #[tracing::instrument(skip(self, tasks))]
    pub fn load(&mut self, tasks: Vec<Task>) {
        self.tasks.clear();
        for task in tasks {
            self.add(task);
        }
        debug!(count = self.tasks.len(), "loaded task store");
    }

    /// Appends a record, or replaces it in place if the id is already held.
    pub fn add(&mut self, task: Task) {
        if let Some(existing) = self.get_mut(task.id) {
            trace!(id = %task.id, "add replaced existing record");
            *existing = task;
        } else {
            self.tasks.push(task);
        }
    }

    /// Overwrites the record held under `id`. The new record must carry the
    /// same id.
    pub fn replace(&mut self, id: TaskId, task: Task) -> Result<()> {
        if task.id != id {
            return Err(ClientError::IdMismatch {
                requested: id,
                returned: task.id,
            });
        }
        let slot = self.get_mut(id).ok_or(ClientError::NotFound(id))?;
        *slot = task;
        Ok(())
    }

    pub fn remove(&mut self, id: TaskId) -> Result<Task> {
        let idx = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(ClientError::NotFound(id))?;
        Ok(self.tasks.remove(idx))
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|t| t.completed).count()
    }

    /// Distinct categories in the store, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.tasks
            .iter()
            .map(|t| t.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
