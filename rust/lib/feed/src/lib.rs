//! Lumigram feed engine.
//!
//! Loads a remote, reverse-chronological photo feed page by page, keeps the
//! signed-in user's favorites in step with the remote store, and turns raw
//! press events on a card into feed commands.
//!
//! Components, leaf first:
//!
//! - [`source`]: remote store traits ([`RemoteFeedSource`], [`FavoriteStore`])
//! - [`fallback`]: placeholder posts shown when the remote feed is empty or down
//! - [`pagination`]: initial load / load more / refresh state machine
//! - [`favorites`]: per-user favorite set with confirm-first toggles
//! - [`gesture`]: double-tap and long-press classification
//! - [`view_model`]: composes the above into the rendered feed view
//! - [`bridge`]: wires the command surface onto the Flux bus

pub mod bridge;
pub mod config;
pub mod error;
pub mod fallback;
pub mod favorites;
pub mod gesture;
pub mod kv_store;
pub mod memory;
pub mod model;
pub mod pagination;
pub mod request;
pub mod session;
pub mod source;
pub mod state;
pub mod view_model;

pub use bridge::{register_handlers, FeedContext};
pub use config::{ConfigError, FeedConfig};
pub use error::FeedError;
pub use fallback::FallbackDataProvider;
pub use favorites::{FavoriteSyncEngine, ToggleOutcome};
pub use gesture::{CardGesture, GestureCommand, GestureDisambiguator, GestureWindow, PressEvent};
pub use kv_store::KvFeedStore;
pub use memory::{generate_posts, InMemoryStore};
pub use model::{FavoriteRecord, Page, PageCursor, Post};
pub use pagination::{LoadOutcome, PaginationController};
pub use session::{SessionHandle, SessionProvider};
pub use source::{FavoriteStore, RemoteFeedSource};
pub use state::{FavoriteSet, FavoritesView, FeedCard, FeedOrigin, FeedPhase, FeedState, FeedView};
pub use view_model::FeedViewModel;
