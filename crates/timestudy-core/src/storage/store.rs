//! The session store contract and an in-memory implementation.

use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::session::{SessionId, SessionKind, StoredSession};

/// Durable list of finalized sessions, keyed by identifier.
///
/// `put` is an upsert: writing a record whose id already exists replaces the
/// stored record together with all of its intervals or laps.
pub trait SessionStore {
    fn put(&mut self, record: &StoredSession) -> Result<SessionId>;

    fn get(&self, id: &SessionId) -> Result<Option<StoredSession>>;

    /// Sessions of one kind, oldest start first.
    fn list(&self, kind: SessionKind) -> Result<Vec<StoredSession>>;

    /// Removes the session and everything recorded under it.
    ///
    /// # Errors
    /// Returns [`CoreError::NotFound`] if no session has this id.
    fn delete(&mut self, id: &SessionId) -> Result<()>;

    fn delete_all(&mut self) -> Result<()>;
}

/// Store kept entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<SessionId, StoredSession>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn put(&mut self, record: &StoredSession) -> Result<SessionId> {
        let id = record.id().clone();
        self.records.insert(id.clone(), record.clone());
        Ok(id)
    }

    fn get(&self, id: &SessionId) -> Result<Option<StoredSession>> {
        Ok(self.records.get(id).cloned())
    }

    fn list(&self, kind: SessionKind) -> Result<Vec<StoredSession>> {
        let mut sessions: Vec<StoredSession> = self
            .records
            .values()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            a.started_at()
                .cmp(&b.started_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(sessions)
    }

    fn delete(&mut self, id: &SessionId) -> Result<()> {
        match self.records.remove(id) {
            Some(_) => Ok(()),
            None => Err(CoreError::not_found(format!("session {id}"))),
        }
    }

    fn delete_all(&mut self) -> Result<()> {
        self.records.clear();
        Ok(())
    }
}
