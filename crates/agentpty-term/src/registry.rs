//! Process-wide set of live PTY handles
//!
//! Sessions add themselves on spawn and remove themselves on dispose or
//! exit. On application shutdown the host calls [`SessionRegistry::terminate_all`]
//! so no child outlives it.

use crate::pty::PtyHandle;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

static GLOBAL: LazyLock<SessionRegistry> = LazyLock::new(SessionRegistry::new);

/// Registry of live session handles, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    handles: Arc<Mutex<HashMap<Uuid, Arc<dyn PtyHandle>>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    #[must_use]
    pub fn global() -> &'static SessionRegistry {
        &GLOBAL
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<dyn PtyHandle>>> {
        self.handles.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Track a live handle.
    pub fn insert(&self, id: Uuid, handle: Arc<dyn PtyHandle>) {
        self.lock().insert(id, handle);
    }

    /// Stop tracking a handle. Returns whether it was present.
    pub fn remove(&self, id: &Uuid) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Whether `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of tracked handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Kill every tracked handle and clear the registry.
    ///
    /// A handle that fails to die is logged and skipped. Returns the number
    /// of handles killed successfully.
    pub fn terminate_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        if drained.is_empty() {
            return 0;
        }

        let total = drained.len();
        let mut killed = 0;
        for (id, handle) in drained {
            match handle.kill() {
                Ok(()) => killed += 1,
                Err(e) => warn!(session_id = %id, error = %e, "Failed to terminate session"),
            }
        }
        info!(killed, total, "Terminated live sessions");
        killed
    }
}
