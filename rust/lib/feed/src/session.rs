use std::sync::{PoisonError, RwLock};

/// Source of the signed-in user. `None` disables favorites; the feed stays
/// readable.
pub trait SessionProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// Session provider with explicit sign in and sign out.
#[derive(Debug, Default)]
pub struct SessionHandle {
    user: RwLock<Option<String>>,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user_id: &str) -> Self {
        let handle = Self::new();
        handle.sign_in(user_id);
        handle
    }

    pub fn sign_in(&self, user_id: &str) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id.to_string());
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for SessionHandle {
    fn current_user(&self) -> Option<String> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|u| !u.is_empty())
    }
}
