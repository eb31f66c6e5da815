//! Flux: path-addressed state bus for the feed client.
//!
//! Rust owns the feed state; the presentation layer only renders it.
//!
//! # Three Primitives
//!
//! - `get(path)`: read the latest snapshot at a path (Arc, no copy)
//! - `emit(path, payload)`: send a command request to its handler(s)
//! - `subscribe(pattern)`: observe state changes under a pattern
//!
//! # Paths
//!
//! - Feed: `feed/state`, `feed/view`
//! - Favorites: `favorites/set`, `favorites/view`
//! - Per card: `card/{post_id}/caption`
//!
//! Patterns use MQTT-style wildcards: `+` matches one level, a trailing
//! `#` matches any remaining levels.

pub mod app;
pub mod pattern;
pub mod router;
pub mod store;
pub mod value;

pub use app::Flux;
pub use router::{BoxFuture, Router};
pub use store::{ChangeHandler, StateStore};
pub use value::{StateValue, SubscriptionId};
