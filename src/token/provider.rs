use std::sync::{PoisonError, RwLock};

use super::TokenPair;

/// Durable storage for the access/refresh credential pair.
///
/// Implementations must never fail loudly: storage errors are logged and
/// swallowed, and a missing credential is reported as `None`.
pub trait TokenProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;

    fn refresh_token(&self) -> Option<String>;

    fn set_access_token(&self, token: String);

    fn set_refresh_token(&self, token: String);

    fn clear_all(&self);

    fn snapshot(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
        }
    }
}

/// Process-local provider. Credentials vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryTokenProvider {
    pair: RwLock<TokenPair>,
}

impl MemoryTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            pair: RwLock::new(TokenPair::new(access_token, refresh_token)),
        }
    }
}

impl TokenProvider for MemoryTokenProvider {
    fn access_token(&self) -> Option<String> {
        let pair = self.pair.read().unwrap_or_else(PoisonError::into_inner);
        pair.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        let pair = self.pair.read().unwrap_or_else(PoisonError::into_inner);
        pair.refresh_token.clone()
    }

    fn set_access_token(&self, token: String) {
        let mut pair = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        pair.access_token = Some(token);
    }

    fn set_refresh_token(&self, token: String) {
        let mut pair = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        pair.refresh_token = Some(token);
    }

    fn clear_all(&self) {
        let mut pair = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        *pair = TokenPair::default();
    }
}
