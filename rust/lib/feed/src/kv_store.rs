use async_trait::async_trait;
use lumigram_kv::{KVError, KVStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::FeedError;
use crate::model::{FavoriteRecord, Page, PageCursor, Post};
use crate::source::{paginate, require_user, FavoriteStore, RemoteFeedSource};

const POST_PREFIX: &str = "post:";
const FAVORITE_PREFIX: &str = "favorite:";

/// Remote store backed by any [`KVStore`].
///
/// Posts live at `post:{id}`, favorites at `favorite:{user_id}:{post_id}`,
/// both as JSON. Ids inside favorite keys are escaped so a `:` in either
/// part cannot collide with another user's or post's key.
pub struct KvFeedStore<K: KVStore> {
    kv: K,
}

impl<K: KVStore> KvFeedStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Write posts in one batch. Existing ids are overwritten.
    pub fn insert_posts(&self, posts: &[Post]) -> Result<(), FeedError> {
        let encoded: Vec<(String, Vec<u8>)> = posts
            .iter()
            .map(|p| encode(p).map(|bytes| (post_key(&p.id), bytes)))
            .collect::<Result<_, _>>()?;
        let entries: Vec<(&str, &[u8])> = encoded
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
            .collect();
        self.kv.batch_set(&entries)?;
        debug!(count = posts.len(), "stored posts");
        Ok(())
    }

    pub fn post_count(&self) -> Result<usize, FeedError> {
        Ok(self.kv.scan(POST_PREFIX)?.len())
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }
}

fn post_key(id: &str) -> String {
    format!("{}{}", POST_PREFIX, id)
}

fn favorite_prefix(user_id: &str) -> String {
    format!("{}{}:", FAVORITE_PREFIX, escape_key_part(user_id))
}

fn favorite_key(user_id: &str, post_id: &str) -> String {
    format!("{}{}", favorite_prefix(user_id), escape_key_part(post_id))
}

// `%` first, so escaped output never contains a bare separator.
fn escape_key_part(part: &str) -> String {
    part.replace('%', "%25").replace(':', "%3A")
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FeedError> {
    serde_json::to_vec(value).map_err(|e| KVError::Serialization(e.to_string()).into())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FeedError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
impl<K: KVStore> RemoteFeedSource for KvFeedStore<K> {
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page, FeedError> {
        // Full scan, decode and sort per page, run inline on the caller's
        // task. O(N) in stored posts and blocking on disk-backed stores.
        let mut posts = self
            .kv
            .scan(POST_PREFIX)?
            .iter()
            .map(|(_, v)| decode::<Post>(v))
            .collect::<Result<Vec<_>, _>>()?;
        posts.sort_by(Post::feed_order);
        paginate(&posts, cursor, page_size)
    }
}

#[async_trait]
impl<K: KVStore> FavoriteStore for KvFeedStore<K> {
    async fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRecord>, FeedError> {
        require_user(user_id)?;
        let mut records = Vec::new();
        for (_, v) in self.kv.scan(&favorite_prefix(user_id))? {
            let record: FavoriteRecord = decode(&v)?;
            if record.user_id == user_id {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn get_favorite(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<FavoriteRecord>, FeedError> {
        require_user(user_id)?;
        match self.kv.get(&favorite_key(user_id, post_id))? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put_favorite(&self, record: FavoriteRecord) -> Result<(), FeedError> {
        require_user(&record.user_id)?;
        let key = favorite_key(&record.user_id, &record.post_id);
        self.kv.set(&key, &encode(&record)?)?;
        Ok(())
    }

    async fn delete_favorite(&self, user_id: &str, post_id: &str) -> Result<(), FeedError> {
        require_user(user_id)?;
        self.kv.delete(&favorite_key(user_id, post_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::generate_posts;
    use lumigram_kv::{MemoryKV, RedbStore};
    use tempfile::TempDir;

    async fn drain<S: RemoteFeedSource>(source: &S, page_size: usize) -> Vec<String> {
        let mut ids = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        loop {
            let page = source.fetch_page(cursor.as_ref(), page_size).await.unwrap();
            ids.extend(page.posts.iter().map(|p| p.id.clone()));
            if page.posts.len() < page_size {
                return ids;
            }
            cursor = page.cursor;
        }
    }

    #[tokio::test]
    async fn pages_through_posts_in_memory_kv() {
        let store = KvFeedStore::new(MemoryKV::new());
        store.insert_posts(&generate_posts(7)).unwrap();
        assert_eq!(store.post_count().unwrap(), 7);

        let ids = drain(&store, 3).await;
        assert_eq!(ids.len(), 7);
        assert_eq!(ids.first().map(String::as_str), Some("post-0007"));
        assert_eq!(ids.last().map(String::as_str), Some("post-0001"));
    }

    #[tokio::test]
    async fn favorites_round_trip_through_redb() {
        let dir = TempDir::new().unwrap();
        let kv = RedbStore::open(&dir.path().join("feed.redb")).unwrap();
        let store = KvFeedStore::new(kv);

        store.put_favorite(FavoriteRecord::new("u1", "p1")).await.unwrap();
        store.put_favorite(FavoriteRecord::new("u1", "p2")).await.unwrap();
        store.put_favorite(FavoriteRecord::new("u10", "p3")).await.unwrap();

        let listed = store.list_favorites("u1").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|r| r.post_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);

        store.delete_favorite("u1", "p1").await.unwrap();
        assert!(store.get_favorite("u1", "p1").await.unwrap().is_none());
        assert!(store.get_favorite("u1", "p2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn separator_in_ids_does_not_collide() {
        let store = KvFeedStore::new(MemoryKV::new());

        store.put_favorite(FavoriteRecord::new("alice:x", "p1")).await.unwrap();
        assert!(store.list_favorites("alice").await.unwrap().is_empty());
        let listed = store.list_favorites("alice:x").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].post_id, "p1");

        store.put_favorite(FavoriteRecord::new("a", "b:c")).await.unwrap();
        assert!(store.get_favorite("a:b", "c").await.unwrap().is_none());
        store.put_favorite(FavoriteRecord::new("a:b", "c")).await.unwrap();
        store.delete_favorite("a:b", "c").await.unwrap();
        let kept = store.get_favorite("a", "b:c").await.unwrap().unwrap();
        assert_eq!((kept.user_id.as_str(), kept.post_id.as_str()), ("a", "b:c"));
    }

    #[tokio::test]
    async fn escaped_ids_round_trip() {
        let store = KvFeedStore::new(MemoryKV::new());
        store.put_favorite(FavoriteRecord::new("u%3A1", "p:%2")).await.unwrap();
        assert!(store.get_favorite("u:1", "p:%2").await.unwrap().is_none());

        let listed = store.list_favorites("u%3A1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].post_id, "p:%2");
    }

    #[tokio::test]
    async fn corrupt_value_is_remote_failure() {
        let store = KvFeedStore::new(MemoryKV::new());
        store.kv().set("post:broken", b"not json").unwrap();
        let err = store.fetch_page(None, 5).await.unwrap_err();
        assert_eq!(err.error_code(), crate::error::error_code::REMOTE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_user_rejected() {
        let store = KvFeedStore::new(MemoryKV::new());
        assert_eq!(
            store.get_favorite("", "p1").await.unwrap_err(),
            FeedError::NotAuthenticated
        );
    }
}
