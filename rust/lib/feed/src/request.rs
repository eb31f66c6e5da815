//! Command requests accepted on the state bus.

use std::time::Instant;

use crate::gesture::PressEvent;

/// Begin the initial feed load and membership load.
#[derive(Debug, Clone, Default)]
pub struct StartFeedReq;

impl StartFeedReq {
    pub const PATH: &'static str = "feed/start";
}

/// Fetch the next page (scrolled near the end).
#[derive(Debug, Clone, Default)]
pub struct LoadMoreReq;

impl LoadMoreReq {
    pub const PATH: &'static str = "feed/load-more";
}

/// Pull-to-refresh.
#[derive(Debug, Clone, Default)]
pub struct RefreshReq;

impl RefreshReq {
    pub const PATH: &'static str = "feed/refresh";
}

/// Flip favorite membership of a post for the signed-in user.
#[derive(Debug, Clone)]
pub struct ToggleFavoriteReq {
    pub post_id: String,
}

impl ToggleFavoriteReq {
    pub const PATH: &'static str = "favorite/toggle";
}

/// Raw press event on a feed card.
#[derive(Debug, Clone)]
pub struct CardPressReq {
    pub post_id: String,
    pub event: PressEvent,
    pub at: Instant,
}

impl CardPressReq {
    pub const PATH: &'static str = "card/press";
}

/// A card scrolled out of the list; its gesture state goes with it.
#[derive(Debug, Clone)]
pub struct CardUnmountReq {
    pub post_id: String,
}

impl CardUnmountReq {
    pub const PATH: &'static str = "card/unmount";
}

/// The session provider's user changed (sign in, sign out, switch).
#[derive(Debug, Clone, Default)]
pub struct SessionChangedReq;

impl SessionChangedReq {
    pub const PATH: &'static str = "session/changed";
}
