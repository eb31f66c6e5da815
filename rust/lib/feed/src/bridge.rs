//! Flux wiring for the feed engine.
//!
//! `register_handlers` maps each command path to the view model or to the
//! per-card gesture state. The bus should be built with
//! [`Flux::with_store`] over the same store the components publish to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use lumigram_flux::{Flux, StateStore};
use tracing::{debug, warn};

use crate::config::FeedConfig;
use crate::gesture::{CardGesture, GestureCommand, GestureDisambiguator};
use crate::request::*;
use crate::state::caption_path;
use crate::view_model::FeedViewModel;

/// Handler context: the view model plus gesture state of mounted cards.
pub struct FeedContext {
    pub view_model: Arc<FeedViewModel>,
    gestures: Mutex<HashMap<String, CardGesture>>,
    disambiguator: GestureDisambiguator,
}

impl FeedContext {
    pub fn new(view_model: Arc<FeedViewModel>, config: &FeedConfig) -> Self {
        Self {
            view_model,
            gestures: Mutex::new(HashMap::new()),
            disambiguator: GestureDisambiguator::new(config.double_tap_window()),
        }
    }

    /// Gesture state of a mounted card.
    pub fn card(&self, post_id: &str) -> Option<CardGesture> {
        self.gestures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(post_id)
            .copied()
    }

    pub fn mounted_cards(&self) -> usize {
        self.gestures.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn press(&self, req: &CardPressReq) -> Option<GestureCommand> {
        self.gestures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(req.post_id.clone())
            .or_default()
            .apply(&self.disambiguator, req.event, req.at)
    }

    fn unmount(&self, post_id: &str) -> bool {
        self.gestures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(post_id)
            .is_some()
    }
}

/// Register all feed handlers with a Flux instance.
pub fn register_handlers(flux: &Flux, ctx: Arc<FeedContext>) {
    // feed/start
    {
        let ctx = ctx.clone();
        flux.on(StartFeedReq::PATH, move |_, _, _| {
            let ctx = ctx.clone();
            async move {
                let outcome = ctx.view_model.start().await;
                debug!(?outcome, "feed started");
            }
        });
    }

    // feed/load-more
    {
        let ctx = ctx.clone();
        flux.on(LoadMoreReq::PATH, move |_, _, _| {
            let ctx = ctx.clone();
            async move {
                let outcome = ctx.view_model.request_load_more().await;
                debug!(?outcome, "load more");
            }
        });
    }

    // feed/refresh
    {
        let ctx = ctx.clone();
        flux.on(RefreshReq::PATH, move |_, _, _| {
            let ctx = ctx.clone();
            async move {
                let outcome = ctx.view_model.request_refresh().await;
                debug!(?outcome, "refresh");
            }
        });
    }

    // favorite/toggle
    {
        let ctx = ctx.clone();
        flux.on(ToggleFavoriteReq::PATH, move |path, payload, _| {
            let ctx = ctx.clone();
            async move {
                let Some(req) = payload.downcast_ref::<ToggleFavoriteReq>() else {
                    warn!(path = %path, "unexpected payload");
                    return;
                };
                toggle(&ctx, &req.post_id).await;
            }
        });
    }

    // card/press
    {
        let ctx = ctx.clone();
        flux.on(CardPressReq::PATH, move |path, payload, store: Arc<StateStore>| {
            let ctx = ctx.clone();
            async move {
                let Some(req) = payload.downcast_ref::<CardPressReq>() else {
                    warn!(path = %path, "unexpected payload");
                    return;
                };
                match ctx.press(req) {
                    Some(GestureCommand::DoubleTap) => toggle(&ctx, &req.post_id).await,
                    Some(GestureCommand::RevealCaption) => {
                        store.set(&caption_path(&req.post_id), true)
                    }
                    Some(GestureCommand::HideCaption) => {
                        store.set(&caption_path(&req.post_id), false)
                    }
                    None => {}
                }
            }
        });
    }

    // card/unmount
    {
        let ctx = ctx.clone();
        flux.on(CardUnmountReq::PATH, move |path, payload, store: Arc<StateStore>| {
            let ctx = ctx.clone();
            async move {
                let Some(req) = payload.downcast_ref::<CardUnmountReq>() else {
                    warn!(path = %path, "unexpected payload");
                    return;
                };
                if ctx.unmount(&req.post_id) {
                    store.remove(&caption_path(&req.post_id));
                }
            }
        });
    }

    // session/changed
    flux.on(SessionChangedReq::PATH, move |_, _, _| {
        let ctx = ctx.clone();
        async move {
            let set = ctx.view_model.session_changed().await;
            debug!(user_id = ?set.user_id, favorites = set.len(), "session changed");
        }
    });
}

// Toggle failures are logged, never surfaced to the presentation layer.
async fn toggle(ctx: &FeedContext, post_id: &str) {
    match ctx.view_model.request_toggle(post_id).await {
        Ok(outcome) => debug!(post_id, ?outcome, "toggle"),
        Err(e) => warn!(post_id, code = e.error_code(), error = %e, "toggle rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use crate::fallback::FallbackDataProvider;
    use crate::favorites::FavoriteSyncEngine;
    use crate::gesture::PressEvent;
    use crate::memory::{generate_posts, InMemoryStore};
    use crate::pagination::PaginationController;
    use crate::session::SessionHandle;
    use crate::state::FeedView;

    fn setup() -> (Flux, Arc<FeedContext>, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::with_posts(generate_posts(3)));
        let states = Arc::new(StateStore::new());
        let config = FeedConfig::default();
        let pagination = Arc::new(PaginationController::new(
            store.clone(),
            FallbackDataProvider::new(),
            &config,
            states.clone(),
        ));
        let favorites = Arc::new(FavoriteSyncEngine::new(store.clone(), states.clone()));
        let vm = Arc::new(FeedViewModel::new(
            pagination,
            favorites,
            Arc::new(SessionHandle::signed_in("u1")),
            states.clone(),
        ));
        vm.bind();

        let flux = Flux::with_store(states);
        let ctx = Arc::new(FeedContext::new(vm, &config));
        register_handlers(&flux, ctx.clone());
        (flux, ctx, store)
    }

    fn press(post_id: &str, event: PressEvent, at: Instant) -> CardPressReq {
        CardPressReq {
            post_id: post_id.into(),
            event,
            at,
        }
    }

    #[tokio::test]
    async fn all_command_paths_are_routed() {
        let (flux, _, _) = setup();
        for path in [
            StartFeedReq::PATH,
            LoadMoreReq::PATH,
            RefreshReq::PATH,
            ToggleFavoriteReq::PATH,
            CardPressReq::PATH,
            CardUnmountReq::PATH,
            SessionChangedReq::PATH,
        ] {
            assert!(flux.has_handler(path), "{} not routed", path);
        }
    }

    #[tokio::test]
    async fn double_tap_toggles_favorite() {
        let (flux, _, store) = setup();
        flux.emit(StartFeedReq::PATH, StartFeedReq).await;

        let t0 = Instant::now();
        flux.emit(CardPressReq::PATH, press("post-0002", PressEvent::Press, t0))
            .await;
        assert!(!store.has_favorite("u1", "post-0002"));
        flux.emit(
            CardPressReq::PATH,
            press("post-0002", PressEvent::Press, t0 + Duration::from_millis(150)),
        )
        .await;
        assert!(store.has_favorite("u1", "post-0002"));

        let view = flux.get_cloned::<FeedView>(FeedView::PATH).unwrap();
        assert!(view.items.iter().any(|c| c.post.id == "post-0002" && c.is_favorite));
    }

    #[tokio::test]
    async fn long_press_shows_caption_and_unmount_forgets_card() {
        let (flux, ctx, store) = setup();
        let path = caption_path("post-0001");
        let t0 = Instant::now();

        flux.emit(CardPressReq::PATH, press("post-0001", PressEvent::LongPressStart, t0))
            .await;
        assert_eq!(flux.get_cloned::<bool>(&path), Some(true));
        assert_eq!(ctx.card("post-0001").map(|c| c.caption_visible), Some(true));

        flux.emit(
            CardPressReq::PATH,
            press("post-0001", PressEvent::LongPressEnd, t0 + Duration::from_secs(1)),
        )
        .await;
        assert_eq!(flux.get_cloned::<bool>(&path), Some(false));

        flux.emit(
            CardUnmountReq::PATH,
            CardUnmountReq {
                post_id: "post-0001".into(),
            },
        )
        .await;
        assert_eq!(ctx.mounted_cards(), 0);
        assert!(flux.get(&path).is_none());
        assert_eq!(store.favorite_count(), 0);
    }

    #[tokio::test]
    async fn wrong_payload_is_ignored() {
        let (flux, _, store) = setup();
        flux.emit(ToggleFavoriteReq::PATH, "post-0001".to_string()).await;
        assert_eq!(store.favorite_count(), 0);
    }
}
