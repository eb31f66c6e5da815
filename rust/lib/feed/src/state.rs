//! Snapshots published on the state bus.
//!
//! Each type carries the bus path it is stored at. Owners replace the whole
//! value on every change; readers never mutate what they receive.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::{PageCursor, Post};

/// Pagination state machine phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedPhase {
    #[default]
    Idle,
    LoadingInitial,
    Ready,
    LoadingMore,
    Refreshing,
    Exhausted,
    /// Initial load failed and fallback data is disabled.
    Failed,
}

/// Where the loaded items came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedOrigin {
    #[default]
    Remote,
    Fallback,
}

/// Feed loading state, owned by the pagination controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedState {
    /// Reverse-chronological, no duplicate ids.
    pub items: Vec<Post>,
    pub cursor: Option<PageCursor>,
    pub end_reached: bool,
    pub phase: FeedPhase,
    pub origin: FeedOrigin,
}

impl FeedState {
    pub const PATH: &'static str = "feed/state";

    pub fn is_loading_initial(&self) -> bool {
        self.phase == FeedPhase::LoadingInitial
    }

    pub fn is_loading_more(&self) -> bool {
        self.phase == FeedPhase::LoadingMore
    }

    pub fn is_refreshing(&self) -> bool {
        self.phase == FeedPhase::Refreshing
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.items.iter().any(|p| p.id == post_id)
    }
}

/// Post ids the current user has favorited.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteSet {
    pub user_id: Option<String>,
    pub post_ids: BTreeSet<String>,
}

impl FavoriteSet {
    pub const PATH: &'static str = "favorites/set";

    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: Some(user_id.to_string()),
            post_ids: BTreeSet::new(),
        }
    }

    pub fn has(&self, post_id: &str) -> bool {
        self.post_ids.contains(post_id)
    }

    pub fn len(&self) -> usize {
        self.post_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.post_ids.is_empty()
    }
}

/// A post as rendered in a feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCard {
    #[serde(flatten)]
    pub post: Post,
    pub is_favorite: bool,
}

/// Home feed view model, stored at `feed/view`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedView {
    pub items: Vec<FeedCard>,
    pub phase: FeedPhase,
    pub is_loading_initial: bool,
    pub is_loading_more: bool,
    pub is_refreshing: bool,
    pub end_reached: bool,
    pub origin: FeedOrigin,
}

impl FeedView {
    pub const PATH: &'static str = "feed/view";
}

/// Favorites tab: loaded posts the user has favorited, in feed order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesView {
    pub user_id: Option<String>,
    pub items: Vec<FeedCard>,
}

impl FavoritesView {
    pub const PATH: &'static str = "favorites/view";
}

/// Bus path of a card's caption visibility flag.
pub fn caption_path(post_id: &str) -> String {
    format!("card/{}/caption", post_id)
}
