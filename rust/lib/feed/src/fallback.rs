use std::sync::Arc;

use chrono::DateTime;

use crate::model::Post;

const PLACEHOLDER_AUTHOR: &str = "lumigram";

// (id, image, caption, created_at seconds)
const PLACEHOLDER_POSTS: &[(&str, &str, &str, i64)] = &[
    (
        "placeholder-1",
        "https://images.lumigram.app/placeholder/golden-retriever.jpg",
        "Golden hour with a golden retriever",
        1_704_067_200,
    ),
    (
        "placeholder-2",
        "https://images.lumigram.app/placeholder/corgi-beach.jpg",
        "Corgi meets the ocean for the first time",
        1_704_063_600,
    ),
    (
        "placeholder-3",
        "https://images.lumigram.app/placeholder/husky-snow.jpg",
        "Snow day",
        1_704_060_000,
    ),
    (
        "placeholder-4",
        "https://images.lumigram.app/placeholder/beagle-nap.jpg",
        "",
        1_704_056_400,
    ),
    (
        "placeholder-5",
        "https://images.lumigram.app/placeholder/shiba-stare.jpg",
        "Judging you politely",
        1_704_052_800,
    ),
];

/// Static placeholder feed shown when the remote feed is empty or
/// unreachable. Constant for the life of the provider; never merged with
/// remote posts.
#[derive(Debug, Clone)]
pub struct FallbackDataProvider {
    posts: Arc<[Post]>,
}

impl FallbackDataProvider {
    /// The built-in placeholder dataset.
    pub fn new() -> Self {
        let posts = PLACEHOLDER_POSTS
            .iter()
            .map(|&(id, image, caption, secs)| Post {
                id: id.to_string(),
                image: image.to_string(),
                caption: caption.to_string(),
                created_by: PLACEHOLDER_AUTHOR.to_string(),
                created_at: DateTime::from_timestamp(secs, 0).unwrap_or_default(),
            })
            .collect();
        Self::with_posts(posts)
    }

    pub fn with_posts(mut posts: Vec<Post>) -> Self {
        posts.sort_by(Post::feed_order);
        Self {
            posts: posts.into(),
        }
    }

    pub fn snapshot(&self) -> Vec<Post> {
        self.posts.to_vec()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Default for FallbackDataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::post_at;

    #[test]
    fn builtin_dataset_is_ordered_and_stable() {
        let provider = FallbackDataProvider::new();
        let first = provider.snapshot();
        assert_eq!(first.len(), PLACEHOLDER_POSTS.len());
        assert!(first
            .windows(2)
            .all(|w| Post::feed_order(&w[0], &w[1]).is_lt()));
        assert_eq!(provider.snapshot(), first);
        assert_eq!(provider.clone().snapshot(), first);
    }

    #[test]
    fn custom_posts_are_sorted() {
        let provider = FallbackDataProvider::with_posts(vec![post_at("old", 1), post_at("new", 2)]);
        let ids: Vec<String> = provider.snapshot().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert!(!provider.is_empty());
    }
}
