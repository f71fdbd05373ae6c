//! The todo item entity and its lifecycle rules.
//!
//! Status moves `NotDone <-> Done` through user operations and
//! `NotDone -> PastDue` through the sweep. `PastDue` is terminal, so every
//! mutation on such an item is rejected. `completion_time` is set exactly when
//! the status is `Done`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_api::v1::{Todo, TodoStatus};
use uuid::Uuid;

use crate::error::{Result, ServiceError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    pub id: Uuid,
    pub description: String,
    pub status: TodoStatus,
    pub creation_time: DateTime<Utc>,
    pub due_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
}

/// A validated item that has not been given an id by the store yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTodoItem {
    pub description: String,
    pub creation_time: DateTime<Utc>,
    pub due_time: DateTime<Utc>,
}

impl NewTodoItem {
    pub fn into_item(self, id: Uuid) -> TodoItem {
        TodoItem {
            id,
            description: self.description,
            status: TodoStatus::NotDone,
            creation_time: self.creation_time,
            due_time: self.due_time,
            completion_time: None,
        }
    }
}

/// Edits applied together by [`TodoItem::apply`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub description: Option<String>,
    pub due_time: Option<DateTime<Utc>>,
}

impl TodoItem {
    pub fn draft(
        description: impl Into<String>,
        due_time: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<NewTodoItem> {
        let description = description.into();
        validate_description(&description)?;
        validate_due_time(due_time, now)?;

        Ok(NewTodoItem {
            description,
            creation_time: now,
            due_time,
        })
    }

    pub fn ensure_mutable(&self) -> Result<()> {
        if self.status == TodoStatus::PastDue {
            return Err(ServiceError::invalid_state(
                "cannot modify a past-due item",
            ));
        }

        Ok(())
    }

    /// Validates the whole patch before touching any field.
    pub fn apply(&mut self, patch: TodoPatch, now: DateTime<Utc>) -> Result<()> {
        self.ensure_mutable()?;

        if patch.due_time.is_some() && self.status != TodoStatus::NotDone {
            return Err(ServiceError::invalid_state(
                "due time can only change while the item is not done",
            ));
        }
        if let Some(description) = &patch.description {
            validate_description(description)?;
        }
        if let Some(due_time) = patch.due_time {
            validate_due_time(due_time, now)?;
        }

        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(due_time) = patch.due_time {
            self.due_time = due_time;
        }

        Ok(())
    }

    pub fn mark_done(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.ensure_mutable()?;
        self.status = TodoStatus::Done;
        self.completion_time = Some(now);
        Ok(())
    }

    pub fn mark_not_done(&mut self) -> Result<()> {
        self.ensure_mutable()?;
        self.status = TodoStatus::NotDone;
        self.completion_time = None;
        Ok(())
    }

    pub fn mark_past_due(&mut self) {
        debug_assert_eq!(self.status, TodoStatus::NotDone);
        debug_assert!(self.completion_time.is_none());
        self.status = TodoStatus::PastDue;
    }
}

impl From<TodoItem> for Todo {
    fn from(item: TodoItem) -> Self {
        Todo {
            id: item.id,
            description: item.description,
            status: item.status,
            creation_time: item.creation_time,
            due_time: item.due_time,
            completion_time: item.completion_time,
        }
    }
}

fn validate_description(description: &str) -> Result<()> {
    if description.trim().is_empty() {
        return Err(ServiceError::invalid_argument(
            "description must not be empty",
        ));
    }

    Ok(())
}

fn validate_due_time(due_time: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if due_time <= now {
        return Err(ServiceError::invalid_argument(
            "due time must be in the future",
        ));
    }

    Ok(())
}
