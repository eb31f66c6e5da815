use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lumigram_flux::StateStore;
use tracing::{debug, info, warn};

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::fallback::FallbackDataProvider;
use crate::model::{Page, Post};
use crate::source::RemoteFeedSource;
use crate::state::{FeedOrigin, FeedPhase, FeedState};

/// What a pagination call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Remote posts were applied; `added` excludes duplicates.
    Loaded { added: usize },
    /// The placeholder dataset was substituted.
    Fallback,
    /// The call was not valid in the current phase and did nothing.
    Skipped,
    /// The fetch failed. Appends stay retryable.
    Failed,
    /// A newer refresh superseded this fetch; its result was dropped.
    Stale,
}

struct Inner {
    feed: FeedState,
    /// Bumped by every initial load and refresh.
    generation: u64,
}

/// Feed loading state machine.
///
/// Owns the [`FeedState`] and publishes it at [`FeedState::PATH`] on every
/// transition. The lock is never held across a fetch; each fetch remembers
/// the generation it started under and its result is dropped if a refresh
/// bumped the generation meanwhile.
pub struct PaginationController {
    source: Arc<dyn RemoteFeedSource>,
    fallback: FallbackDataProvider,
    page_size: usize,
    fallback_enabled: bool,
    states: Arc<StateStore>,
    inner: Mutex<Inner>,
}

impl PaginationController {
    pub fn new(
        source: Arc<dyn RemoteFeedSource>,
        fallback: FallbackDataProvider,
        config: &FeedConfig,
        states: Arc<StateStore>,
    ) -> Self {
        let controller = Self {
            source,
            fallback,
            page_size: config.page_size.max(1),
            fallback_enabled: config.fallback_enabled,
            states,
            inner: Mutex::new(Inner {
                feed: FeedState::default(),
                generation: 0,
            }),
        };
        controller.publish(&controller.lock().feed);
        controller
    }

    pub fn state(&self) -> FeedState {
        self.lock().feed.clone()
    }

    pub fn phase(&self) -> FeedPhase {
        self.lock().feed.phase
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Initial load. Only valid from `Idle`.
    pub async fn start(&self) -> LoadOutcome {
        let generation = {
            let mut inner = self.lock();
            if inner.feed.phase != FeedPhase::Idle {
                debug!(phase = ?inner.feed.phase, "start ignored");
                return LoadOutcome::Skipped;
            }
            inner.generation += 1;
            inner.feed.phase = FeedPhase::LoadingInitial;
            self.publish(&inner.feed);
            inner.generation
        };
        self.load_first_page(generation).await
    }

    /// Drop everything loaded so far and load the first page again.
    /// Valid from any phase; supersedes any fetch in flight.
    pub async fn refresh(&self) -> LoadOutcome {
        let generation = {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.feed = FeedState {
                phase: FeedPhase::Refreshing,
                ..FeedState::default()
            };
            self.publish(&inner.feed);
            inner.generation
        };
        self.load_first_page(generation).await
    }

    /// Fetch the page after the cursor. Only valid from `Ready`; a call
    /// while another append is in flight does nothing.
    pub async fn load_more(&self) -> LoadOutcome {
        let (generation, cursor) = {
            let mut inner = self.lock();
            if inner.feed.phase != FeedPhase::Ready {
                debug!(phase = ?inner.feed.phase, "load_more ignored");
                return LoadOutcome::Skipped;
            }
            inner.feed.phase = FeedPhase::LoadingMore;
            self.publish(&inner.feed);
            (inner.generation, inner.feed.cursor.clone())
        };

        let result = self.source.fetch_page(cursor.as_ref(), self.page_size).await;

        let mut inner = self.lock();
        if inner.generation != generation || inner.feed.phase != FeedPhase::LoadingMore {
            debug!(generation, current = inner.generation, "discarding stale page");
            return LoadOutcome::Stale;
        }

        match result {
            Ok(page) => {
                let fetched = page.posts.len();
                let Page { posts, cursor } = page;
                let added = append_unique(&mut inner.feed.items, posts);
                if cursor.is_some() {
                    inner.feed.cursor = cursor;
                }
                inner.feed.end_reached = fetched < self.page_size;
                inner.feed.phase = if inner.feed.end_reached {
                    FeedPhase::Exhausted
                } else {
                    FeedPhase::Ready
                };
                info!(fetched, added, total = inner.feed.items.len(), "appended page");
                self.publish(&inner.feed);
                LoadOutcome::Loaded { added }
            }
            Err(e) => {
                warn!(code = e.error_code(), error = %e, "load more failed");
                inner.feed.phase = FeedPhase::Ready;
                self.publish(&inner.feed);
                LoadOutcome::Failed
            }
        }
    }

    async fn load_first_page(&self, generation: u64) -> LoadOutcome {
        let result = self.source.fetch_page(None, self.page_size).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "discarding stale first page");
            return LoadOutcome::Stale;
        }

        let outcome = match result {
            Ok(page) if !page.posts.is_empty() => {
                let fetched = page.posts.len();
                let mut items = Vec::with_capacity(fetched);
                let added = append_unique(&mut items, page.posts);
                let end_reached = fetched < self.page_size;
                inner.feed = FeedState {
                    items,
                    cursor: page.cursor,
                    end_reached,
                    phase: if end_reached {
                        FeedPhase::Exhausted
                    } else {
                        FeedPhase::Ready
                    },
                    origin: FeedOrigin::Remote,
                };
                info!(fetched, end_reached, "loaded first page");
                LoadOutcome::Loaded { added }
            }
            Ok(_) => {
                info!("remote feed is empty");
                self.settle_without_remote(&mut inner.feed, None)
            }
            Err(e) => self.settle_without_remote(&mut inner.feed, Some(e)),
        };
        self.publish(&inner.feed);
        outcome
    }

    /// First page came back empty or failed: show placeholder data if
    /// allowed, otherwise an empty feed.
    fn settle_without_remote(&self, feed: &mut FeedState, error: Option<FeedError>) -> LoadOutcome {
        if let Some(e) = &error {
            warn!(code = e.error_code(), error = %e, "initial load failed");
        }

        if self.fallback_enabled {
            *feed = FeedState {
                items: self.fallback.snapshot(),
                cursor: None,
                end_reached: true,
                phase: FeedPhase::Exhausted,
                origin: FeedOrigin::Fallback,
            };
            info!(count = feed.items.len(), "showing fallback feed");
            return LoadOutcome::Fallback;
        }

        *feed = FeedState {
            end_reached: true,
            phase: if error.is_some() {
                FeedPhase::Failed
            } else {
                FeedPhase::Exhausted
            },
            ..FeedState::default()
        };
        match error {
            Some(_) => LoadOutcome::Failed,
            None => LoadOutcome::Loaded { added: 0 },
        }
    }

    fn publish(&self, feed: &FeedState) {
        self.states.set(FeedState::PATH, feed.clone());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Append posts whose ids are not already present. Returns how many landed.
fn append_unique(items: &mut Vec<Post>, incoming: Vec<Post>) -> usize {
    let mut seen: HashSet<String> = items.iter().map(|p| p.id.clone()).collect();
    let before = items.len();
    for post in incoming {
        if seen.insert(post.id.clone()) {
            items.push(post);
        }
    }
    items.len() - before
}
