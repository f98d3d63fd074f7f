//! Deciding whether a failed call means "refresh the access token and retry".

use crate::errors::Error;

/// Strategy for recognising an expired or invalid access credential.
pub trait ExpiryClassifier: Send + Sync {
    fn is_expired_credential(&self, error: &Error) -> bool;
}

impl<F> ExpiryClassifier for F
where
    F: Fn(&Error) -> bool + Send + Sync,
{
    fn is_expired_credential(&self, error: &Error) -> bool {
        self(error)
    }
}

pub const DEFAULT_EXPIRY_KEYWORDS: &[&str] = &["expired", "invalid token", "unauthorized"];

/// Treats a 401 as expired when its message mentions one of `keywords`.
///
/// A 401 with an empty message also counts as expired unless
/// `empty_message_is_expired` is switched off. That default assumes an
/// ambiguous 401 is worth one refresh, which can hide a 401 that no refresh
/// would fix.
#[derive(Clone, Debug)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
    empty_message_is_expired: bool,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
            empty_message_is_expired: true,
        }
    }

    pub fn empty_message_is_expired(mut self, enabled: bool) -> Self {
        self.empty_message_is_expired = enabled;
        self
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_EXPIRY_KEYWORDS)
    }
}

impl ExpiryClassifier for KeywordClassifier {
    fn is_expired_credential(&self, error: &Error) -> bool {
        if error.status() != Some(401) {
            return false;
        }
        let message = error.message().trim().to_lowercase();
        if message.is_empty() {
            return self.empty_message_is_expired;
        }
        self.keywords.iter().any(|k| message.contains(k.as_str()))
    }
}
