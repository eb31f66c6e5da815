use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration};
use tokio::sync::Semaphore;
use tracing::debug;

use crate::error::FeedError;
use crate::model::{FavoriteRecord, Page, PageCursor, Post};
use crate::source::{paginate, require_user, FavoriteStore, RemoteFeedSource};

/// Process-local remote store.
///
/// Serves both the post feed and favorite relationships. Availability can be
/// switched off, writes can be made to fail, and a gate can park every call
/// until the test releases it, so interleavings are reproducible.
pub struct InMemoryStore {
    posts: RwLock<Vec<Post>>,
    favorites: Mutex<BTreeMap<(String, String), FavoriteRecord>>,
    online: AtomicBool,
    failing_writes: AtomicUsize,
    gate: Mutex<Option<Arc<Semaphore>>>,
    fetches: AtomicUsize,
    parked: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_posts(Vec::new())
    }

    pub fn with_posts(mut posts: Vec<Post>) -> Self {
        posts.sort_by(Post::feed_order);
        Self {
            posts: RwLock::new(posts),
            favorites: Mutex::new(BTreeMap::new()),
            online: AtomicBool::new(true),
            failing_writes: AtomicUsize::new(0),
            gate: Mutex::new(None),
            fetches: AtomicUsize::new(0),
            parked: AtomicUsize::new(0),
        }
    }

    pub fn insert_post(&self, post: Post) {
        let mut posts = self.posts.write().unwrap_or_else(PoisonError::into_inner);
        posts.retain(|p| p.id != post.id);
        let at = posts
            .binary_search_by(|p| Post::feed_order(p, &post))
            .unwrap_or_else(|i| i);
        posts.insert(at, post);
    }

    /// When offline every call fails with `RemoteUnavailable`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Fail the next `n` favorite writes.
    pub fn fail_next_writes(&self, n: usize) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    /// Park every subsequent call until [`release`](Self::release) or
    /// [`open`](Self::open).
    pub fn hold(&self) {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(gate);
    }

    /// Let `n` parked (or future) calls through, oldest first.
    pub fn release(&self, n: usize) {
        if let Some(gate) = self.gate.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            gate.add_permits(n);
        }
    }

    /// Remove the gate and wake everything parked on it.
    pub fn open(&self) {
        if let Some(gate) = self.gate.lock().unwrap_or_else(PoisonError::into_inner).take() {
            gate.close();
        }
    }

    /// Calls currently waiting at the gate.
    pub fn parked(&self) -> usize {
        self.parked.load(Ordering::SeqCst)
    }

    /// Number of `fetch_page` calls received.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn has_favorite(&self, user_id: &str, post_id: &str) -> bool {
        self.favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&(user_id.to_string(), post_id.to_string()))
    }

    pub fn favorite_count(&self) -> usize {
        self.favorites.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn pass_gate(&self) {
        let gate = self.gate.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let Some(gate) = gate else { return };

        self.parked.fetch_add(1, Ordering::SeqCst);
        // A closed gate means everything goes through.
        if let Ok(permit) = gate.acquire().await {
            permit.forget();
        }
        self.parked.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), FeedError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FeedError::RemoteUnavailable("store offline".into()))
        }
    }

    fn check_write(&self) -> Result<(), FeedError> {
        self.check_online()?;
        let failed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(FeedError::RemoteUnavailable("write rejected".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFeedSource for InMemoryStore {
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page, FeedError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;
        self.check_online()?;

        let posts = self.posts.read().unwrap_or_else(PoisonError::into_inner);
        let page = paginate(&posts, cursor, page_size)?;
        debug!(returned = page.posts.len(), page_size, "memory fetch_page");
        Ok(page)
    }
}

#[async_trait]
impl FavoriteStore for InMemoryStore {
    async fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRecord>, FeedError> {
        require_user(user_id)?;
        self.pass_gate().await;
        self.check_online()?;
        Ok(self
            .favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_favorite(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<FavoriteRecord>, FeedError> {
        require_user(user_id)?;
        self.pass_gate().await;
        self.check_online()?;
        Ok(self
            .favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(user_id.to_string(), post_id.to_string()))
            .cloned())
    }

    async fn put_favorite(&self, record: FavoriteRecord) -> Result<(), FeedError> {
        require_user(&record.user_id)?;
        self.pass_gate().await;
        self.check_write()?;
        self.favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((record.user_id.clone(), record.post_id.clone()), record);
        Ok(())
    }

    async fn delete_favorite(&self, user_id: &str, post_id: &str) -> Result<(), FeedError> {
        require_user(user_id)?;
        self.pass_gate().await;
        self.check_write()?;
        self.favorites
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(user_id.to_string(), post_id.to_string()));
        Ok(())
    }
}

/// `count` synthetic posts, `post-0001` oldest and `post-{count}` newest,
/// one minute apart.
pub fn generate_posts(count: usize) -> Vec<Post> {
    let base = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
    (1..=count)
        .map(|i| {
            let id = format!("post-{:04}", i);
            Post {
                image: format!("https://images.lumigram.app/{}.jpg", id),
                caption: format!("Photo #{}", i),
                created_by: format!("user-{}", i % 3 + 1),
                created_at: base + Duration::minutes(i as i64),
                id,
            }
        })
        .collect()
}

/// Shorthand used by tests: a post at `secs` past the epoch.
#[cfg(test)]
pub(crate) fn post_at(id: &str, secs: i64) -> Post {
    Post {
        id: id.to_string(),
        image: format!("https://images.lumigram.app/{}.jpg", id),
        caption: String::new(),
        created_by: "user-1".into(),
        created_at: DateTime::from_timestamp(secs, 0).unwrap_or_default(),
    }
}
