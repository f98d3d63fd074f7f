use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use super::{TokenPair, TokenProvider};

/// Persists the credential pair as a small JSON document.
///
/// Reads are served from memory; every write rewrites the whole file. I/O
/// failures only produce a warning, so the in-memory copy stays
/// authoritative for the life of the process.
#[derive(Debug)]
pub struct FileTokenProvider {
    path: PathBuf,
    pair: RwLock<TokenPair>,
}

impl FileTokenProvider {
    /// Open (or lazily create) the token file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let pair = load(&path);
        Self {
            path,
            pair: RwLock::new(pair),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The write lock is held through the file write so the file never
    /// lags behind memory.
    fn update(&self, apply: impl FnOnce(&mut TokenPair)) {
        let mut pair = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut pair);
        persist(&self.path, &pair);
    }
}

impl TokenProvider for FileTokenProvider {
    fn access_token(&self) -> Option<String> {
        let pair = self.pair.read().unwrap_or_else(PoisonError::into_inner);
        pair.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        let pair = self.pair.read().unwrap_or_else(PoisonError::into_inner);
        pair.refresh_token.clone()
    }

    fn set_access_token(&self, token: String) {
        self.update(|pair| pair.access_token = Some(token));
    }

    fn set_refresh_token(&self, token: String) {
        self.update(|pair| pair.refresh_token = Some(token));
    }

    fn clear_all(&self) {
        let mut pair = self.pair.write().unwrap_or_else(PoisonError::into_inner);
        *pair = TokenPair::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "tokens.cleared"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove token file"),
        }
    }
}

fn load(path: &Path) -> TokenPair {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TokenPair::default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read token file");
            return TokenPair::default();
        }
    };
    serde_json::from_str(&contents).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "token file is not valid JSON; ignoring");
        TokenPair::default()
    })
}

fn persist(path: &Path, pair: &TokenPair) {
    let json = match serde_json::to_vec(pair) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "failed to encode tokens");
            return;
        }
    };
    // Write to a sibling file first so a crash never leaves half a document.
    let tmp = path.with_extension("tmp");
    let result = std::fs::write(&tmp, json).and_then(|_| std::fs::rename(&tmp, path));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "failed to persist tokens");
    }
}
