//! SQLite-backed task store.
//!
//! # Invariants
//! - Rows are keyed by `(owner, id)`; one owner never sees another's rows.
//! - `list` returns rows in creation order (`position ASC`).
//! - SQLite failures surface as `StoreError::StoreUnavailable`.

use crate::db::{open_db, open_db_in_memory};
use crate::model::item::{Item, ItemId, NewItem};
use crate::model::session::Identity;
use crate::store::{StoreError, StoreResult, TaskStore};
use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

const TASK_SELECT_SQL: &str = "SELECT
    id,
    description,
    done,
    date,
    time
FROM tasks";

/// `TaskStore` persisted in one SQLite database.
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection that already went through `db::open_*`.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `query` against the connection on tokio's blocking pool.
    async fn run<T, F>(&self, operation: &'static str, query: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || query(&conn.lock()))
            .await
            .map_err(|err| {
                warn!(
                    "event=store_{operation} module=store status=error backend=sqlite cause=join"
                );
                StoreError::unavailable(format!("sqlite {operation} task did not finish: {err}"))
            })?
    }
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn list(&self, identity: &Identity) -> StoreResult<Vec<Item>> {
        let owner = identity.as_str().to_string();
        self.run("list", move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{TASK_SELECT_SQL} WHERE owner = ?1 ORDER BY position ASC, id ASC;"
            ))?;
            let mut rows = stmt.query([owner.as_str()])?;
            let mut items = Vec::new();
            while let Some(row) = rows.next()? {
                items.push(parse_task_row(row)?);
            }
            debug!(
                "event=store_list module=store status=ok backend=sqlite count={}",
                items.len()
            );
            Ok(items)
        })
        .await
    }

    async fn create(&self, identity: &Identity, item: &NewItem) -> StoreResult<ItemId> {
        let owner = identity.as_str().to_string();
        let item = item.clone();
        self.run("create", move |conn| {
            let id = ItemId::new(Uuid::new_v4().to_string());
            conn.execute(
                "INSERT INTO tasks (owner, id, description, done, date, time, position)
                 VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6,
                    (SELECT COALESCE(MAX(position), 0) + 1 FROM tasks WHERE owner = ?1)
                 );",
                params![
                    owner.as_str(),
                    id.as_str(),
                    item.description.as_str(),
                    item.done,
                    item.date.as_str(),
                    item.time.as_str(),
                ],
            )?;
            Ok(id)
        })
        .await
    }

    async fn update(&self, identity: &Identity, item: &Item) -> StoreResult<()> {
        let owner = identity.as_str().to_string();
        let item = item.clone();
        self.run("update", move |conn| {
            let changed = conn.execute(
                "UPDATE tasks
                 SET
                    description = ?1,
                    done = ?2,
                    date = ?3,
                    time = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE owner = ?5 AND id = ?6;",
                params![
                    item.description.as_str(),
                    item.done,
                    item.date.as_str(),
                    item.time.as_str(),
                    owner.as_str(),
                    item.id.as_str(),
                ],
            )?;

            if changed == 0 {
                return Err(StoreError::NotFound(item.id));
            }
            Ok(())
        })
        .await
    }

    async fn delete(&self, identity: &Identity, id: &ItemId) -> StoreResult<()> {
        let owner = identity.as_str().to_string();
        let id = id.clone();
        self.run("delete", move |conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE owner = ?1 AND id = ?2;",
                params![owner.as_str(), id.as_str()],
            )?;
            if changed == 0 {
                debug!(
                    "event=store_delete module=store status=noop backend=sqlite item_id={id}"
                );
            }
            Ok(())
        })
        .await
    }
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Item> {
    let id: String = row.get("id")?;
    let done = match row.get::<_, i64>("done")? {
        0 => false,
        1 => true,
        other => {
            warn!("event=store_list module=store status=error item_id={id} done={other}");
            return Err(StoreError::unavailable(format!(
                "invalid done value `{other}` in tasks.done"
            )));
        }
    };

    Ok(Item {
        id: ItemId::new(id),
        description: row.get("description")?,
        done,
        date: row.get("date")?,
        time: row.get("time")?,
    })
}

#[cfg(test)]
mod tests {
    use super::SqliteTaskStore;
    use crate::model::item::{ItemId, NewItem};
    use crate::model::session::Identity;
    use crate::store::{StoreError, TaskStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn create_then_list_preserves_insertion_order() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let user = Identity::new("u1");

        let first = store
            .create(&user, &NewItem::new("Meeting", "2024-05-01", "10:00"))
            .await
            .unwrap();
        let second = store
            .create(&user, &NewItem::new("Call mom", "2024-05-02", "09:00"))
            .await
            .unwrap();

        let items = store.list(&user).await.unwrap();
        let ids: Vec<_> = items.iter().map(|item| item.id.clone()).collect();
        assert_eq!(ids, vec![first, second]);
        assert!(items.iter().all(|item| !item.done));
    }

    #[tokio::test]
    async fn update_replaces_fields_and_reports_missing_rows() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let user = Identity::new("u1");
        let id = store
            .create(&user, &NewItem::new("Meeting", "2024-05-01", "10:00"))
            .await
            .unwrap();

        let mut item = store.list(&user).await.unwrap().remove(0);
        item.done = true;
        item.time = "11:00".to_string();
        store.update(&user, &item).await.unwrap();

        let reloaded = store.list(&user).await.unwrap().remove(0);
        assert_eq!(reloaded.id, id);
        assert!(reloaded.done);
        assert_eq!(reloaded.time, "11:00");

        let other_user = Identity::new("u2");
        let err = store.update(&other_user, &item).await.unwrap_err();
        assert_eq!(err, StoreError::NotFound(id));
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_scoped_by_owner() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let alice = Identity::new("alice");
        let bob = Identity::new("bob");
        let id = store
            .create(&alice, &NewItem::new("a", "", ""))
            .await
            .unwrap();

        store.delete(&bob, &id).await.unwrap();
        assert_eq!(store.list(&alice).await.unwrap().len(), 1);

        store.delete(&alice, &id).await.unwrap();
        store.delete(&alice, &id).await.unwrap();
        store.delete(&alice, &ItemId::new("never-existed")).await.unwrap();
        assert!(store.list(&alice).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn shared_store_serves_spawned_tasks() {
        let store = Arc::new(SqliteTaskStore::open_in_memory().unwrap());
        let user = Identity::new("u1");

        let mut handles = Vec::new();
        for n in 0..4 {
            let store = Arc::clone(&store);
            let user = user.clone();
            handles.push(tokio::spawn(async move {
                store
                    .create(&user, &NewItem::new(format!("task {n}"), "", ""))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.list(&user).await.unwrap().len(), 4);
    }
}
