use async_trait::async_trait;

use crate::error::FeedError;
use crate::model::{FavoriteRecord, Page, PageCursor, Post, FEED_QUERY};

/// Paged, reverse-chronological read access to the post collection.
#[async_trait]
pub trait RemoteFeedSource: Send + Sync {
    /// Fetch up to `page_size` posts strictly after `cursor`, or from the
    /// top of the feed when `cursor` is `None`.
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page, FeedError>;
}

/// Per-user favorite relationships held by the remote store.
///
/// Every call rejects an empty user id with `NotAuthenticated`.
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn list_favorites(&self, user_id: &str) -> Result<Vec<FavoriteRecord>, FeedError>;

    async fn get_favorite(
        &self,
        user_id: &str,
        post_id: &str,
    ) -> Result<Option<FavoriteRecord>, FeedError>;

    /// Upsert on (user_id, post_id).
    async fn put_favorite(&self, record: FavoriteRecord) -> Result<(), FeedError>;

    /// Deleting an absent record succeeds.
    async fn delete_favorite(&self, user_id: &str, post_id: &str) -> Result<(), FeedError>;
}

/// Cut one page out of posts already sorted by [`Post::feed_order`].
pub(crate) fn paginate(
    sorted: &[Post],
    cursor: Option<&PageCursor>,
    page_size: usize,
) -> Result<Page, FeedError> {
    if let Some(c) = cursor {
        if c.query() != FEED_QUERY {
            return Err(FeedError::InvalidCursor(c.query().to_string()));
        }
    }

    let posts: Vec<Post> = sorted
        .iter()
        .filter(|p| cursor.map_or(true, |c| c.admits(p)))
        .take(page_size)
        .cloned()
        .collect();
    let cursor = posts.last().map(PageCursor::after);
    Ok(Page { posts, cursor })
}

pub(crate) fn require_user(user_id: &str) -> Result<(), FeedError> {
    if user_id.is_empty() {
        return Err(FeedError::NotAuthenticated);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn posts(n: i64) -> Vec<Post> {
        let mut v: Vec<Post> = (0..n)
            .map(|i| Post {
                id: format!("p{:02}", i),
                image: String::new(),
                caption: String::new(),
                created_by: "u1".into(),
                created_at: DateTime::from_timestamp(1_000 + i, 0).unwrap(),
            })
            .collect();
        v.sort_by(Post::feed_order);
        v
    }

    #[test]
    fn paginate_walks_the_whole_feed() {
        let all = posts(7);
        let first = paginate(&all, None, 3).unwrap();
        assert_eq!(first.posts.len(), 3);
        assert_eq!(first.posts[0].id, "p06");

        let second = paginate(&all, first.cursor.as_ref(), 3).unwrap();
        assert_eq!(second.posts[0].id, "p03");

        let third = paginate(&all, second.cursor.as_ref(), 3).unwrap();
        assert_eq!(third.posts.len(), 1);

        let done = paginate(&all, third.cursor.as_ref(), 3).unwrap();
        assert!(done.posts.is_empty());
        assert!(done.cursor.is_none());
    }

    #[test]
    fn paginate_rejects_foreign_cursor() {
        let all = posts(2);
        let foreign = PageCursor::for_query("posts/by_author", &all[0]);
        let err = paginate(&all, Some(&foreign), 3).unwrap_err();
        assert_eq!(err, FeedError::InvalidCursor("posts/by_author".into()));
    }

    #[test]
    fn require_user_rejects_empty() {
        assert_eq!(require_user(""), Err(FeedError::NotAuthenticated));
        assert!(require_user("u1").is_ok());
    }
}
