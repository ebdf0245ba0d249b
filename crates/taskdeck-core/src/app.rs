use tracing::{debug, info, instrument, warn};

use crate::backend::TaskBackend;
use crate::error::{ClientError, Result};
use crate::filter::{FilterCriteria, Selection, SortKey, Tab, derive_display};
use crate::render::Progress;
use crate::store::TaskStore;
use crate::task::{Priority, Task, TaskDraft, TaskId};
use crate::ui::Confirm;

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted(Task),
    Cancelled,
}

/// Application state and the only mutation entry point: the store, the
/// current filter criteria and the task being edited, plus the backend the
/// store is synced against.
#[derive(Debug)]
pub struct App<B> {
    backend: B,
    store: TaskStore,
    criteria: FilterCriteria,
    editing: Option<TaskId>,
}

impl<B: TaskBackend> App<B> {
    pub fn new(backend: B) -> Self {
        Self::with_criteria(backend, FilterCriteria::default())
    }

    pub fn with_criteria(backend: B, criteria: FilterCriteria) -> Self {
        Self {
            backend,
            store: TaskStore::new(),
            criteria,
            editing: None,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn editing(&self) -> Option<TaskId> {
        self.editing
    }

    /// The display sequence for the current store and criteria.
    pub fn display(&self) -> Vec<Task> {
        derive_display(self.store.tasks(), &self.criteria)
    }

    pub fn progress(&self) -> Progress {
        Progress::from_tasks(self.store.tasks())
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.criteria.tab = tab;
    }

    pub fn set_category(&mut self, category: Selection<String>) {
        self.criteria.category = category;
    }

    pub fn set_priority_filter(&mut self, priority: Selection<Priority>) {
        self.criteria.priority = priority;
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.criteria.search = search.into();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.criteria.sort = sort;
    }

    #[instrument(skip(self))]
    pub async fn refresh(&mut self) -> Result<()> {
        let tasks = self
            .backend
            .list()
            .await
            .inspect_err(|err| warn!(error = %err, "failed to load tasks"))?;
        self.store.load(tasks);
        info!(count = self.store.len(), "tasks loaded");
        Ok(())
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn create(&mut self, mut draft: TaskDraft) -> Result<Task> {
        draft.title = draft.title.trim().to_string();
        draft.category = draft.category.trim().to_string();
        draft.validate()?;

        let created = self
            .backend
            .create(&draft)
            .await
            .inspect_err(|err| warn!(error = %err, "failed to create task"))?;
        self.store.add(created.clone());
        info!(id = %created.id, "task created");
        Ok(created)
    }

    /// Selects a task for editing and returns its current fields.
    pub fn begin_edit(&mut self, id: TaskId) -> Result<TaskDraft> {
        let task = self.store.get(id).ok_or(ClientError::NotFound(id))?;
        self.editing = Some(id);
        debug!(%id, "editing task");
        Ok(TaskDraft::from(task))
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Sends the edited fields for the selected task. On failure the store
    /// and the selection are left as they were.
    #[instrument(skip(self, draft))]
    pub async fn submit_edit(&mut self, draft: TaskDraft) -> Result<Task> {
        let id = self.editing.ok_or(ClientError::NoEditTarget)?;
        draft.validate()?;
        let current = self.store.get(id).ok_or(ClientError::NotFound(id))?;
        let outgoing = draft.merged_into(current);

        let updated = self
            .backend
            .update(&outgoing)
            .await
            .inspect_err(|err| warn!(%id, error = %err, "failed to update task"))?;
        self.store
            .replace(id, updated.clone())
            .inspect_err(|err| warn!(%id, error = %err, "backend returned a different task"))?;
        self.editing = None;
        info!(%id, "task updated");
        Ok(updated)
    }

    /// Flips `completed` locally, then persists the full record. The flip is
    /// rolled back if the backend rejects it.
    #[instrument(skip(self))]
    pub async fn toggle(&mut self, id: TaskId) -> Result<Task> {
        let task = self.store.get_mut(id).ok_or(ClientError::NotFound(id))?;
        task.completed = !task.completed;
        let outgoing = task.clone();

        let persisted = match self.backend.update(&outgoing).await {
            Ok(confirmed) => self
                .store
                .replace(id, confirmed.clone())
                .map(|()| confirmed),
            Err(err) => Err(err),
        };

        match persisted {
            Ok(confirmed) => {
                info!(%id, completed = confirmed.completed, "task toggled");
                Ok(confirmed)
            }
            Err(err) => {
                warn!(%id, error = %err, "failed to toggle task; rolling back");
                if let Some(task) = self.store.get_mut(id) {
                    task.completed = !outgoing.completed;
                }
                Err(err)
            }
        }
    }

    #[instrument(skip(self, confirm))]
    pub async fn delete(&mut self, id: TaskId, confirm: &mut dyn Confirm) -> Result<DeleteOutcome> {
        let title = self
            .store
            .get(id)
            .map(|t| t.title.clone())
            .ok_or(ClientError::NotFound(id))?;

        if !confirm.confirm(&format!("Delete task {id} \"{title}\"?")) {
            debug!(%id, "delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        self.backend
            .delete(id)
            .await
            .inspect_err(|err| warn!(%id, error = %err, "failed to delete task"))?;
        let removed = self.store.remove(id)?;
        if self.editing == Some(id) {
            self.editing = None;
        }
        info!(%id, "task deleted");
        Ok(DeleteOutcome::Deleted(removed))
    }

    pub async fn health(&self) -> Result<String> {
        self.backend.health().await
    }
}
