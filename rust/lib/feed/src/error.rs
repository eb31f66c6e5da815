use lumigram_kv::KVError;
use thiserror::Error;

/// Stable error codes. Log pipelines and the presentation layer match on
/// these, never on the message text.
pub mod error_code {
    pub const REMOTE_UNAVAILABLE: &str = "REMOTE_UNAVAILABLE";
    pub const NOT_AUTHENTICATED: &str = "NOT_AUTHENTICATED";
    pub const TOGGLE_FAILED: &str = "TOGGLE_FAILED";
    pub const INVALID_CURSOR: &str = "INVALID_CURSOR";
}

/// Errors reported by the feed engine and its remote collaborators.
///
/// None of these is fatal: load failures fall back to placeholder data,
/// append failures are retried on the next request, and toggle failures
/// leave the favorite set as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Network or backend failure.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A user-scoped call was made without a session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The favorite read-then-write round trip failed.
    #[error("toggle failed for post {post_id}: {reason}")]
    ToggleFailed { post_id: String, reason: String },

    /// A cursor was presented to a query other than the one that issued it.
    #[error("cursor issued by query {0:?}")]
    InvalidCursor(String),
}

impl FeedError {
    pub fn error_code(&self) -> &'static str {
        match self {
            FeedError::RemoteUnavailable(_) => error_code::REMOTE_UNAVAILABLE,
            FeedError::NotAuthenticated => error_code::NOT_AUTHENTICATED,
            FeedError::ToggleFailed { .. } => error_code::TOGGLE_FAILED,
            FeedError::InvalidCursor(_) => error_code::INVALID_CURSOR,
        }
    }
}

impl From<KVError> for FeedError {
    fn from(e: KVError) -> Self {
        FeedError::RemoteUnavailable(e.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::RemoteUnavailable(format!("decode: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_mapping() {
        assert_eq!(
            FeedError::RemoteUnavailable("x".into()).error_code(),
            "REMOTE_UNAVAILABLE"
        );
        assert_eq!(FeedError::NotAuthenticated.error_code(), "NOT_AUTHENTICATED");
        assert_eq!(
            FeedError::ToggleFailed {
                post_id: "p1".into(),
                reason: "x".into()
            }
            .error_code(),
            "TOGGLE_FAILED"
        );
        assert_eq!(FeedError::InvalidCursor("q".into()).error_code(), "INVALID_CURSOR");
    }

    #[test]
    fn kv_errors_become_remote_unavailable() {
        let err: FeedError = KVError::Storage("disk full".into()).into();
        assert_eq!(
            err,
            FeedError::RemoteUnavailable("storage error: disk full".into())
        );
    }

    #[test]
    fn toggle_failed_message_names_post() {
        let err = FeedError::ToggleFailed {
            post_id: "p7".into(),
            reason: "remote unavailable: offline".into(),
        };
        assert_eq!(
            err.to_string(),
            "toggle failed for post p7: remote unavailable: offline"
        );
    }
}
