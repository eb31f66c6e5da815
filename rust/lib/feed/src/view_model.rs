use std::sync::{Arc, Mutex, PoisonError, Weak};

use lumigram_flux::{StateStore, SubscriptionId};
use tracing::debug;

use crate::error::FeedError;
use crate::favorites::{FavoriteSyncEngine, ToggleOutcome};
use crate::pagination::{LoadOutcome, PaginationController};
use crate::session::SessionProvider;
use crate::state::{FavoriteSet, FavoritesView, FeedCard, FeedState, FeedView};

/// Composes feed state and favorite membership into what the presentation
/// layer renders, and routes its commands to the owning components.
pub struct FeedViewModel {
    pagination: Arc<PaginationController>,
    favorites: Arc<FavoriteSyncEngine>,
    session: Arc<dyn SessionProvider>,
    states: Arc<StateStore>,
    // Held across read-compose-write so an older composition never lands
    // after a newer one.
    republishing: Arc<Mutex<()>>,
}

impl FeedViewModel {
    pub fn new(
        pagination: Arc<PaginationController>,
        favorites: Arc<FavoriteSyncEngine>,
        session: Arc<dyn SessionProvider>,
        states: Arc<StateStore>,
    ) -> Self {
        Self {
            pagination,
            favorites,
            session,
            states,
            republishing: Arc::new(Mutex::new(())),
        }
    }

    pub fn pagination(&self) -> &Arc<PaginationController> {
        &self.pagination
    }

    pub fn favorites(&self) -> &Arc<FavoriteSyncEngine> {
        &self.favorites
    }

    pub fn snapshot(&self) -> FeedView {
        compose_feed(&self.pagination.state(), &self.favorites.snapshot())
    }

    pub fn favorites_view(&self) -> FavoritesView {
        compose_favorites(&self.pagination.state(), &self.favorites.snapshot())
    }

    /// Republish [`FeedView`] and [`FavoritesView`] whenever the feed state
    /// or the favorite set changes, starting with the current values.
    pub fn bind(&self) -> [SubscriptionId; 2] {
        let subscribe = |path: &str| {
            let weak = Arc::downgrade(&self.states);
            let guard = self.republishing.clone();
            self.states
                .subscribe(path, move |_, _| republish(&weak, &guard))
        };
        let ids = [subscribe(FeedState::PATH), subscribe(FavoriteSet::PATH)];

        republish(&Arc::downgrade(&self.states), &self.republishing);
        ids
    }

    // ====================================================================
    // Commands
    // ====================================================================

    /// Initial feed load, with the signed-in user's favorites loaded
    /// alongside.
    pub async fn start(&self) -> LoadOutcome {
        let user = self.session.current_user();
        let membership = async {
            if let Some(user) = &user {
                self.favorites.load_initial_membership(user).await;
            }
        };
        let (outcome, ()) = tokio::join!(self.pagination.start(), membership);
        outcome
    }

    pub async fn request_load_more(&self) -> LoadOutcome {
        self.pagination.load_more().await
    }

    pub async fn request_refresh(&self) -> LoadOutcome {
        self.pagination.refresh().await
    }

    pub async fn request_toggle(&self, post_id: &str) -> Result<ToggleOutcome, FeedError> {
        let Some(user) = self.session.current_user() else {
            debug!(post_id, "toggle without a session");
            return Err(FeedError::NotAuthenticated);
        };
        self.favorites.toggle(&user, post_id).await
    }

    /// The session provider's user changed: drop the old favorites and load
    /// the new user's, if any.
    pub async fn session_changed(&self) -> FavoriteSet {
        self.favorites.clear();
        match self.session.current_user() {
            Some(user) => self.favorites.load_initial_membership(&user).await,
            None => FavoriteSet::default(),
        }
    }
}

fn republish(states: &Weak<StateStore>, guard: &Mutex<()>) {
    let Some(states) = states.upgrade() else { return };
    let _serial = guard.lock().unwrap_or_else(PoisonError::into_inner);
    let feed = states
        .get_cloned::<FeedState>(FeedState::PATH)
        .unwrap_or_default();
    let favorites = states
        .get_cloned::<FavoriteSet>(FavoriteSet::PATH)
        .unwrap_or_default();
    states.set(FeedView::PATH, compose_feed(&feed, &favorites));
    states.set(FavoritesView::PATH, compose_favorites(&feed, &favorites));
}

pub fn compose_feed(state: &FeedState, favorites: &FavoriteSet) -> FeedView {
    FeedView {
        items: state
            .items
            .iter()
            .map(|post| FeedCard {
                post: post.clone(),
                is_favorite: favorites.has(&post.id),
            })
            .collect(),
        phase: state.phase,
        is_loading_initial: state.is_loading_initial(),
        is_loading_more: state.is_loading_more(),
        is_refreshing: state.is_refreshing(),
        end_reached: state.end_reached,
        origin: state.origin,
    }
}

/// Loaded posts the user has favorited, in feed order.
pub fn compose_favorites(state: &FeedState, favorites: &FavoriteSet) -> FavoritesView {
    FavoritesView {
        user_id: favorites.user_id.clone(),
        items: state
            .items
            .iter()
            .filter(|post| favorites.has(&post.id))
            .map(|post| FeedCard {
                post: post.clone(),
                is_favorite: true,
            })
            .collect(),
    }
}
