use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::session::Session;

use super::SessionStore;

/// In-process session store for tests and ephemeral hosts.
///
/// Clones share the underlying slot, so a test can keep one handle and
/// hand another to the manager, then inspect what was persisted.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Session>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().unwrap().clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.slot.lock().unwrap() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::TokenSet;

    #[test]
    fn test_clones_share_the_slot() {
        let store = MemoryStore::new();
        let other = store.clone();

        let session = Session::new(
            None,
            TokenSet::new("access-1".to_string(), "refresh-1".to_string()),
        );
        store.save(&session).unwrap();
        assert_eq!(other.load().unwrap(), Some(session));

        other.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
