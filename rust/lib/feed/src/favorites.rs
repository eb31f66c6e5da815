use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lumigram_flux::StateStore;
use tracing::{debug, info, warn};

use crate::error::FeedError;
use crate::model::FavoriteRecord;
use crate::source::FavoriteStore;
use crate::state::FavoriteSet;

/// Result of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Favorited,
    Unfavorited,
    /// A toggle for the same post was already in flight; nothing was sent.
    Suppressed,
}

struct Membership {
    set: FavoriteSet,
    /// Bumped on every session change. Remote results carrying an older
    /// epoch are dropped.
    epoch: u64,
}

/// The signed-in user's favorite set, kept in step with the remote store.
///
/// The remote store is authoritative. A toggle reads the remote record,
/// writes the opposite, and only then touches the local set, so a failed
/// round trip leaves local state exactly as it was.
pub struct FavoriteSyncEngine {
    store: Arc<dyn FavoriteStore>,
    states: Arc<StateStore>,
    inner: Mutex<Membership>,
    in_flight: Mutex<HashSet<String>>,
}

impl FavoriteSyncEngine {
    pub fn new(store: Arc<dyn FavoriteStore>, states: Arc<StateStore>) -> Self {
        let engine = Self {
            store,
            states,
            inner: Mutex::new(Membership {
                set: FavoriteSet::default(),
                epoch: 0,
            }),
            in_flight: Mutex::new(HashSet::new()),
        };
        engine.publish(&engine.lock().set);
        engine
    }

    pub fn snapshot(&self) -> FavoriteSet {
        self.lock().set.clone()
    }

    pub fn is_favorite(&self, post_id: &str) -> bool {
        self.lock().set.has(post_id)
    }

    pub fn is_in_flight(&self, post_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(post_id)
    }

    /// Read every favorite of `user_id` and make it the local set.
    ///
    /// Best effort: a failed read yields an empty set for the user. A result
    /// that arrives after [`clear`](Self::clear) is returned but not applied.
    pub async fn load_initial_membership(&self, user_id: &str) -> FavoriteSet {
        if user_id.is_empty() {
            return FavoriteSet::default();
        }
        let epoch = self.lock().epoch;

        let set = match self.store.list_favorites(user_id).await {
            Ok(records) => FavoriteSet {
                user_id: Some(user_id.to_string()),
                post_ids: records.into_iter().map(|r| r.post_id).collect(),
            },
            Err(e) => {
                warn!(user_id, code = e.error_code(), error = %e, "favorite load failed");
                FavoriteSet::for_user(user_id)
            }
        };

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(user_id, "session changed during favorite load, dropping result");
            return set;
        }
        inner.set = set.clone();
        info!(user_id, count = set.len(), "loaded favorites");
        self.publish(&inner.set);
        set
    }

    /// Flip membership of `post_id` for `user_id`, confirm-first.
    ///
    /// Returns `Suppressed` without touching the store when a toggle for the
    /// same post is still in flight.
    pub async fn toggle(&self, user_id: &str, post_id: &str) -> Result<ToggleOutcome, FeedError> {
        if user_id.is_empty() {
            return Err(FeedError::NotAuthenticated);
        }
        let Some(_claim) = InFlight::claim(&self.in_flight, post_id) else {
            debug!(post_id, "toggle already in flight");
            return Ok(ToggleOutcome::Suppressed);
        };
        let epoch = self.lock().epoch;

        let added = self.write_through(user_id, post_id).await.map_err(|e| {
            warn!(user_id, post_id, code = e.error_code(), error = %e, "toggle failed");
            FeedError::ToggleFailed {
                post_id: post_id.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!(post_id, "session changed during toggle, local set untouched");
        } else {
            if inner.set.user_id.is_none() {
                inner.set.user_id = Some(user_id.to_string());
            }
            if inner.set.user_id.as_deref() == Some(user_id) {
                if added {
                    inner.set.post_ids.insert(post_id.to_string());
                } else {
                    inner.set.post_ids.remove(post_id);
                }
                self.publish(&inner.set);
            }
        }

        debug!(user_id, post_id, added, "toggle confirmed");
        Ok(if added {
            ToggleOutcome::Favorited
        } else {
            ToggleOutcome::Unfavorited
        })
    }

    /// Forget the current user's set. Loads and toggles still in flight
    /// will not apply their results.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.set = FavoriteSet::default();
        self.publish(&inner.set);
    }

    // Returns true when the post ended up favorited.
    async fn write_through(&self, user_id: &str, post_id: &str) -> Result<bool, FeedError> {
        match self.store.get_favorite(user_id, post_id).await? {
            Some(_) => {
                self.store.delete_favorite(user_id, post_id).await?;
                Ok(false)
            }
            None => {
                self.store
                    .put_favorite(FavoriteRecord::new(user_id, post_id))
                    .await?;
                Ok(true)
            }
        }
    }

    fn publish(&self, set: &FavoriteSet) {
        self.states.set(FavoriteSet::PATH, set.clone());
    }

    fn lock(&self) -> MutexGuard<'_, Membership> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a post as having a toggle in flight until dropped.
struct InFlight<'a> {
    posts: &'a Mutex<HashSet<String>>,
    post_id: String,
}

impl<'a> InFlight<'a> {
    fn claim(posts: &'a Mutex<HashSet<String>>, post_id: &str) -> Option<Self> {
        let inserted = posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(post_id.to_string());
        inserted.then(|| Self {
            posts,
            post_id: post_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.post_id);
    }
}
