use std::sync::Arc;

use chrono::{DateTime, Utc};
use todo_api::v1::TodoStatus;
use uuid::Uuid;

use crate::{
    clock::Clock,
    error::{Result, ServiceError},
    item::{TodoItem, TodoPatch},
    store::ItemStore,
};

const OPEN_STATUSES: &[TodoStatus] = &[TodoStatus::NotDone, TodoStatus::PastDue];

/// Lifecycle rules for todo items. Each call reads the clock once.
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn ItemStore>,
    clock: Arc<dyn Clock>,
}

impl TaskService {
    pub fn new(store: Arc<dyn ItemStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn create(
        &self,
        description: impl Into<String>,
        due_time: DateTime<Utc>,
    ) -> Result<TodoItem> {
        let now = self.clock.now();
        let draft = TodoItem::draft(description, due_time, now)?;
        Ok(self.store.insert(draft)?)
    }

    /// Without `include_completed`, `Done` items are left out.
    pub fn list_all(&self, include_completed: bool) -> Result<Vec<TodoItem>> {
        let statuses: &[TodoStatus] = if include_completed { &[] } else { OPEN_STATUSES };
        Ok(self.store.list_by_status(statuses)?)
    }

    pub fn get_by_id(&self, id: Uuid) -> Result<TodoItem> {
        self.store.get(id)?.ok_or(ServiceError::NotFound(id))
    }

    pub fn update(&self, id: Uuid, patch: TodoPatch) -> Result<TodoItem> {
        let now = self.clock.now();
        let mut item = self.get_by_id(id)?;
        item.apply(patch, now)?;
        self.store.save(&item)?;
        Ok(item)
    }

    pub fn update_description(
        &self,
        id: Uuid,
        description: impl Into<String>,
    ) -> Result<TodoItem> {
        self.update(
            id,
            TodoPatch {
                description: Some(description.into()),
                due_time: None,
            },
        )
    }

    pub fn update_due_time(&self, id: Uuid, due_time: DateTime<Utc>) -> Result<TodoItem> {
        self.update(
            id,
            TodoPatch {
                description: None,
                due_time: Some(due_time),
            },
        )
    }

    pub fn mark_done(&self, id: Uuid) -> Result<TodoItem> {
        let now = self.clock.now();
        let mut item = self.get_by_id(id)?;
        item.mark_done(now)?;
        self.store.save(&item)?;
        Ok(item)
    }

    /// Also persists when the item is already `NotDone`.
    pub fn mark_not_done(&self, id: Uuid) -> Result<TodoItem> {
        let mut item = self.get_by_id(id)?;
        item.mark_not_done()?;
        self.store.save(&item)?;
        Ok(item)
    }
}
