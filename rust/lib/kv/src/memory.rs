use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::error::KVError;
use crate::traits::KVStore;

/// MemoryKV keeps every entry in a process-local ordered map.
///
/// Used for tests and for running the feed without a database file.
#[derive(Default)]
pub struct MemoryKV {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryKV {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KVStore for MemoryKV {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KVError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), KVError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), KVError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn batch_set(&self, batch: &[(&str, &[u8])]) -> Result<(), KVError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in batch {
            entries.insert((*key).to_string(), value.to_vec());
        }
        Ok(())
    }

    fn scan(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>, KVError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_is_sorted_and_prefix_bounded() {
        let kv = MemoryKV::new();
        kv.set("post:b", b"2").unwrap();
        kv.set("post:a", b"1").unwrap();
        kv.set("postscript", b"x").unwrap();
        kv.set("favorite:u1:a", b"f").unwrap();

        let got = kv.scan("post:").unwrap();
        assert_eq!(
            got,
            vec![
                ("post:a".to_string(), b"1".to_vec()),
                ("post:b".to_string(), b"2".to_vec()),
            ]
        );
    }

    #[test]
    fn delete_and_len() {
        let kv = MemoryKV::new();
        assert!(kv.is_empty());
        kv.set("favorite:u1:p1", b"1").unwrap();
        assert_eq!(kv.len(), 1);
        kv.delete("favorite:u1:p1").unwrap();
        kv.delete("favorite:u1:p1").unwrap();
        assert!(kv.is_empty());
    }
}
