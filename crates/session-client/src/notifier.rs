//! Session lifecycle events
//!
//! The client announces two things to the rest of the application: the
//! credentials were renewed, or the session is gone and the user has to sign
//! in again. Each event is a full snapshot, so a consumer that receives the
//! same event twice ends up in the same state.
//!
//! Consumers either register a callback (invoked synchronously, in
//! registration order) or subscribe to a broadcast channel. A callback that
//! panics is logged and skipped; it never affects the session outcome.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use session_auth::CredentialPair;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Buffered events per broadcast subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Fired once per successful refresh with the stored pair after the update
    TokenRefreshed(CredentialPair),
    /// Fired once per terminal refresh failure; credentials are already cleared
    TokenExpired,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::TokenRefreshed(_) => "token_refreshed",
            SessionEvent::TokenExpired => "token_expired",
        }
    }
}

/// Handle returned by `register`, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

pub struct SessionNotifier {
    listeners: Mutex<Vec<(SubscriberId, Listener)>>,
    next_id: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionNotifier {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    pub fn register<F>(&self, listener: F) -> SubscriberId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(listener)));
        debug!(subscriber = id.0, "session listener registered");
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        before != listeners.len()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        info!(event = event.name(), "session event");
        // Snapshot so a listener may register/unregister without deadlocking
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                error!(event = event.name(), "session listener panicked");
            }
        }
        // No receivers is fine
        let _ = self.events.send(event);
    }
}

impl Default for SessionNotifier {
    fn default() -> Self {
        Self::new()
    }
}
