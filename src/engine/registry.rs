use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::activity::next_activity;
use crate::event::{EngineEvent, EventKind};
use crate::model::{Session, SessionId};

/// Authoritative map of session id to session summary.
/// Entries are created on first sight of an id and never removed here.
/// Sessions are shared with published snapshots and copied on write.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Arc<Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the registry-side effects of one event, regardless of focus.
    pub fn observe(&mut self, event: &EngineEvent, now: DateTime<Utc>) -> &Session {
        let entry = self
            .sessions
            .entry(event.session_id.clone())
            .or_insert_with(|| Arc::new(Session::new(event.session_id.clone())));
        let session = Arc::make_mut(entry);

        session.activity = next_activity(session.activity, &event.kind);
        session.last_event_at = Some(now);

        match &event.kind {
            EventKind::SessionStatus { status } => session.status = *status,
            EventKind::UsageUpdate { usage } => session.add_usage(usage),
            EventKind::SessionIdResolved {
                resolved_backend_id,
            } => session.resolved_backend_id = Some(resolved_backend_id.clone()),
            EventKind::Compaction => session.compaction_count += 1,
            _ => {}
        }

        session
    }

    /// Zero the token counters of one session (explicit session clear).
    pub fn clear_usage(&mut self, id: &SessionId) -> bool {
        match self.sessions.get_mut(id).map(Arc::make_mut) {
            Some(session) => {
                session.total_input_tokens = 0;
                session.total_output_tokens = 0;
                session.total_cache_creation_tokens = 0;
                session.total_cache_read_tokens = 0;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id).map(Arc::as_ref)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values().map(Arc::as_ref)
    }

    /// Handles for a snapshot; no session is deep-copied.
    pub fn shared(&self) -> Vec<Arc<Session>> {
        self.sessions.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
