use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use todo_api::v1::TodoStatus;
use uuid::Uuid;

use crate::{
    error::StoreError,
    item::{NewTodoItem, TodoItem},
};

/// Record storage used by the service and the sweeper.
pub trait ItemStore: Send + Sync {
    /// Persists a new item under a freshly assigned id.
    fn insert(&self, item: NewTodoItem) -> Result<TodoItem, StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<TodoItem>, StoreError>;

    /// Items whose status is in `statuses`. An empty slice matches everything.
    fn list_by_status(&self, statuses: &[TodoStatus]) -> Result<Vec<TodoItem>, StoreError>;

    /// Items with the given status and a due time strictly before `before`.
    fn list_due_before(
        &self,
        status: TodoStatus,
        before: DateTime<Utc>,
    ) -> Result<Vec<TodoItem>, StoreError>;

    /// Upserts each item by id. Not atomic across items.
    fn save_all(&self, items: &[TodoItem]) -> Result<(), StoreError>;

    fn save(&self, item: &TodoItem) -> Result<(), StoreError> {
        self.save_all(std::slice::from_ref(item))
    }
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    items: Mutex<HashMap<Uuid, TodoItem>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => eyre::bail!(err),
        };
        let data: DataOwned = ron::de::from_reader(file)?;

        match data {
            DataOwned::V1 { items } => Ok(Self::from_v1(items)),
        }
    }

    fn from_v1(items: HashMap<Uuid, TodoItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Writes a sibling `.tmp` file and renames it over `path`, so the
    /// previous snapshot stays intact until the new one is complete.
    pub fn persist(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        let items = self.lock()?.clone();
        let data = DataBorrowed::V1 { items: &items };

        let tmp = tmp_path(path);
        let file = fs::File::create(&tmp)?;
        let mut ron = ron::Serializer::new(&file, Some(Default::default()))?;
        data.serialize(&mut ron)?;
        drop(ron);
        file.sync_all()?;
        fs::rename(&tmp, path)?;

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, TodoItem>>, StoreError> {
        self.items.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl ItemStore for MemoryStore {
    fn insert(&self, item: NewTodoItem) -> Result<TodoItem, StoreError> {
        let mut items = self.lock()?;

        let mut id = Uuid::new_v4();
        while items.contains_key(&id) {
            id = Uuid::new_v4();
        }

        let item = item.into_item(id);
        items.insert(id, item.clone());
        Ok(item)
    }

    fn get(&self, id: Uuid) -> Result<Option<TodoItem>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn list_by_status(&self, statuses: &[TodoStatus]) -> Result<Vec<TodoItem>, StoreError> {
        let items = self.lock()?;
        Ok(items
            .values()
            .filter(|item| statuses.is_empty() || statuses.contains(&item.status))
            .cloned()
            .collect())
    }

    fn list_due_before(
        &self,
        status: TodoStatus,
        before: DateTime<Utc>,
    ) -> Result<Vec<TodoItem>, StoreError> {
        let items = self.lock()?;
        Ok(items
            .values()
            .filter(|item| item.status == status && item.due_time < before)
            .cloned()
            .collect())
    }

    fn save_all(&self, batch: &[TodoItem]) -> Result<(), StoreError> {
        let mut items = self.lock()?;
        for item in batch {
            items.insert(item.id, item.clone());
        }
        Ok(())
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[derive(Serialize)]
enum DataBorrowed<'a> {
    V1 { items: &'a HashMap<Uuid, TodoItem> },
}

#[derive(Deserialize)]
enum DataOwned {
    V1 { items: HashMap<Uuid, TodoItem> },
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn insert(store: &MemoryStore, description: &str, status: TodoStatus) -> TodoItem {
        let draft = TodoItem::draft(description, now() + Duration::hours(1), now()).unwrap();
        let mut item = store.insert(draft).unwrap();
        item.status = status;
        store.save(&item).unwrap();
        item
    }

    fn descriptions(mut items: Vec<TodoItem>) -> Vec<String> {
        items.sort_by(|a, b| a.description.cmp(&b.description));
        items.into_iter().map(|item| item.description).collect()
    }

    #[test]
    fn insert_assigns_distinct_ids() {
        let store = MemoryStore::new();
        let a = insert(&store, "a", TodoStatus::NotDone);
        let b = insert(&store, "b", TodoStatus::NotDone);

        assert_ne!(a.id, b.id);
        assert_eq!(store.get(a.id).unwrap(), Some(a));
        assert_eq!(store.len().unwrap(), 2);
    }

    #[test]
    fn get_missing_is_none() {
        let store = MemoryStore::new();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn list_by_status_filters_and_empty_set_matches_all() {
        let store = MemoryStore::new();
        insert(&store, "a", TodoStatus::NotDone);
        insert(&store, "b", TodoStatus::Done);
        insert(&store, "c", TodoStatus::PastDue);

        let open = store
            .list_by_status(&[TodoStatus::NotDone, TodoStatus::PastDue])
            .unwrap();
        assert_eq!(descriptions(open), ["a", "c"]);

        let all = store.list_by_status(&[]).unwrap();
        assert_eq!(descriptions(all), ["a", "b", "c"]);
    }

    #[test]
    fn list_due_before_is_strict() {
        let store = MemoryStore::new();
        let item = insert(&store, "a", TodoStatus::NotDone);

        let hits = store
            .list_due_before(TodoStatus::NotDone, item.due_time)
            .unwrap();
        assert!(hits.is_empty());

        let hits = store
            .list_due_before(TodoStatus::NotDone, item.due_time + Duration::seconds(1))
            .unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store
            .list_due_before(TodoStatus::Done, item.due_time + Duration::seconds(1))
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn persist_and_load_keep_items() {
        let path = std::env::temp_dir().join(format!("todo-store-{}.ron", Uuid::new_v4()));
        let store = MemoryStore::new();
        let a = insert(&store, "a", TodoStatus::NotDone);
        let b = insert(&store, "b", TodoStatus::Done);

        store.persist(&path).unwrap();
        let loaded = MemoryStore::load(&path).unwrap();

        assert_eq!(loaded.get(a.id).unwrap(), Some(a));
        assert_eq!(loaded.get(b.id).unwrap(), Some(b));
        assert_eq!(loaded.len().unwrap(), 2);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn leftover_tmp_file_does_not_affect_load() {
        let path = std::env::temp_dir().join(format!("todo-store-{}.ron", Uuid::new_v4()));
        let store = MemoryStore::new();
        let a = insert(&store, "a", TodoStatus::NotDone);
        store.persist(&path).unwrap();

        // an interrupted flush leaves a truncated temp file behind
        fs::write(tmp_path(&path), "").unwrap();

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.get(a.id).unwrap(), Some(a.clone()));

        insert(&store, "b", TodoStatus::Done);
        store.persist(&path).unwrap();
        assert_eq!(MemoryStore::load(&path).unwrap().len().unwrap(), 2);
        assert!(!tmp_path(&path).exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn failed_persist_keeps_previous_snapshot() {
        let path = std::env::temp_dir().join(format!("todo-store-{}.ron", Uuid::new_v4()));
        let store = MemoryStore::new();
        let a = insert(&store, "a", TodoStatus::NotDone);
        store.persist(&path).unwrap();

        // a directory in the temp file's place makes the next write fail
        fs::create_dir(tmp_path(&path)).unwrap();
        insert(&store, "b", TodoStatus::NotDone);
        assert!(store.persist(&path).is_err());

        let loaded = MemoryStore::load(&path).unwrap();
        assert_eq!(loaded.len().unwrap(), 1);
        assert_eq!(loaded.get(a.id).unwrap(), Some(a));

        let _ = fs::remove_dir(tmp_path(&path));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_is_empty() {
        let path = std::env::temp_dir().join(format!("todo-missing-{}.ron", Uuid::new_v4()));
        let store = MemoryStore::load(&path).unwrap();
        assert!(store.is_empty().unwrap());
    }
}
