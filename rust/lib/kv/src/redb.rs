use std::path::Path;
use std::sync::Arc;

use ::redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;

use crate::error::{storage, KVError};
use crate::traits::KVStore;

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("lumigram");

/// RedbStore is a KVStore backed by redb, a pure-Rust embedded database.
///
/// Every write is its own transaction; `batch_set` groups several writes
/// into one so a post and its index entries land together.
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create a redb database at the given path.
    pub fn open(path: &Path) -> Result<Self, KVError> {
        let db = Database::create(path).map_err(storage)?;

        // Create the table up front so read transactions never miss it.
        let write_txn = db.begin_write().map_err(storage)?;
        {
            let _table = write_txn.open_table(TABLE).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;

        debug!(path = %path.display(), "opened redb store");
        Ok(Self { db: Arc::new(db) })
    }
}

impl KVStore for RedbStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;
        let value = table.get(key).map_err(storage)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        self.batch_set(&[(key, value)])
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            table.remove(key).map_err(storage)?;
        }
        write_txn.commit().map_err(storage)
    }

    fn batch_set(&self, entries: &[(&str, &[u8])]) -> Result<(), KVError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut table = write_txn.open_table(TABLE).map_err(storage)?;
            for (key, value) in entries {
                table.insert(*key, *value).map_err(storage)?;
            }
        }
        write_txn.commit().map_err(storage)
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(TABLE).map_err(storage)?;

        let mut results = Vec::new();
        for entry in table.range(prefix..).map_err(storage)? {
            let (key, value) = entry.map_err(storage)?;
            let key = key.value().to_string();
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key, value.value().to_vec()));
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, RedbStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbStore::open(&dir.path().join("feed.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn set_then_get() {
        let (_dir, store) = open_temp();
        store.set("post:p1", b"{\"id\":\"p1\"}").unwrap();
        assert_eq!(store.get("post:p1").unwrap(), Some(b"{\"id\":\"p1\"}".to_vec()));
        assert_eq!(store.get("post:p2").unwrap(), None);
    }

    #[test]
    fn delete_removes_key_and_tolerates_missing() {
        let (_dir, store) = open_temp();
        store.set("favorite:u1:p1", b"1").unwrap();
        store.delete("favorite:u1:p1").unwrap();
        assert_eq!(store.get("favorite:u1:p1").unwrap(), None);
        store.delete("favorite:u1:p1").unwrap();
    }

    #[test]
    fn scan_stops_at_prefix_boundary() {
        let (_dir, store) = open_temp();
        store
            .batch_set(&[
                ("favorite:u1:p1", b"a".as_slice()),
                ("favorite:u1:p2", b"b".as_slice()),
                ("favorite:u2:p1", b"c".as_slice()),
                ("post:p1", b"d".as_slice()),
            ])
            .unwrap();

        let keys: Vec<String> = store
            .scan("favorite:u1:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec!["favorite:u1:p1", "favorite:u1:p2"]);
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feed.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.set("post:p1", b"x").unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get("post:p1").unwrap(), Some(b"x".to_vec()));
    }
}
