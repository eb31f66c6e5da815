//! Feed records: posts, page cursors, favorite relationships.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name of the only feed query: all posts, newest first.
pub const FEED_QUERY: &str = "posts/created_at_desc";

/// An image post. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// Image URI or storage key.
    pub image: String,
    pub caption: String,
    pub created_by: String,
    /// Used for ordering only.
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Feed order: newest first, ties broken by id ascending.
    pub fn feed_order(a: &Post, b: &Post) -> Ordering {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

/// Opaque resume token: the position of the last post a query returned.
///
/// A cursor is only meaningful to the query that produced it; stores reject
/// cursors carrying another query name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    query: String,
    created_at: DateTime<Utc>,
    post_id: String,
}

impl PageCursor {
    /// Cursor positioned on `post` within the feed query.
    pub fn after(post: &Post) -> Self {
        Self::for_query(FEED_QUERY, post)
    }

    pub fn for_query(query: &str, post: &Post) -> Self {
        Self {
            query: query.to_string(),
            created_at: post.created_at,
            post_id: post.id.clone(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Whether `post` sorts strictly after the cursor position.
    pub fn admits(&self, post: &Post) -> bool {
        post.created_at < self.created_at
            || (post.created_at == self.created_at && post.id > self.post_id)
    }
}

/// One page of a feed query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub posts: Vec<Post>,
    /// Position of the last post; `None` for an empty page.
    pub cursor: Option<PageCursor>,
}

/// A user favorited a post. At most one per (user_id, post_id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRecord {
    pub user_id: String,
    pub post_id: String,
    pub added_at: DateTime<Utc>,
}

impl FavoriteRecord {
    /// A record stamped with the current time.
    pub fn new(user_id: &str, post_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            post_id: post_id.to_string(),
            added_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, secs: i64) -> Post {
        Post {
            id: id.into(),
            image: format!("https://cdn.example/{}.jpg", id),
            caption: String::new(),
            created_by: "u1".into(),
            created_at: DateTime::from_timestamp(secs, 0).unwrap(),
        }
    }

    #[test]
    fn feed_order_is_newest_first_then_id() {
        let mut posts = vec![post("b", 10), post("c", 20), post("a", 10), post("d", 5)];
        posts.sort_by(Post::feed_order);
        let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn cursor_admits_only_later_positions() {
        let cursor = PageCursor::after(&post("b", 10));
        assert!(!cursor.admits(&post("c", 20)));
        assert!(!cursor.admits(&post("a", 10)));
        assert!(!cursor.admits(&post("b", 10)));
        assert!(cursor.admits(&post("bb", 10)));
        assert!(cursor.admits(&post("a", 9)));
        assert_eq!(cursor.query(), FEED_QUERY);
    }

    #[test]
    fn post_serializes_camel_case() {
        let json = serde_json::to_value(post("p1", 0)).unwrap();
        assert_eq!(json["createdBy"], "u1");
        assert!(json.get("createdAt").is_some());
    }
}
