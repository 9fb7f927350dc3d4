use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::session::SessionStore;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The current code under edit.
///
/// Every replacement is mirrored to the session store when one is attached.
/// Mirroring is best-effort: a failed write never fails the replacement.
#[derive(Debug, Default)]
pub struct SourceText {
    text: Mutex<String>,
    session: Option<SessionStore>,
}

impl SourceText {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
            session: None,
        }
    }

    pub fn with_session(mut self, store: SessionStore) -> Self {
        self.session = Some(store);
        self
    }

    pub fn snapshot(&self) -> String {
        lock(&self.text).clone()
    }

    pub fn replace(&self, text: impl Into<String>) {
        let text = text.into();
        if let Some(store) = &self.session
            && !store.save_code(&text)
        {
            debug!("source text not mirrored to session");
        }
        *lock(&self.text) = text;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_replace_and_snapshot() {
        let source = SourceText::new("a");
        assert_eq!(source.snapshot(), "a");
        source.replace("b");
        assert_eq!(source.snapshot(), "b");
    }

    #[test]
    fn test_replace_mirrors_to_session() {
        let dir = tempdir().unwrap();
        let store = SessionStore::in_dir(dir.path());
        let source = SourceText::new("a").with_session(store.clone());
        source.replace("print('hi')");
        assert_eq!(store.code().as_deref(), Some("print('hi')"));
    }

    #[test]
    fn test_replace_survives_mirror_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let source =
            SourceText::new("a").with_session(SessionStore::new(blocker.join("session.json")));
        source.replace("b");
        assert_eq!(source.snapshot(), "b");
    }
}
