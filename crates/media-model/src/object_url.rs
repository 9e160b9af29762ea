//! Revocable handles onto in-memory byte buffers.
//!
//! An [`ObjectUrl`] stands in for a temporary `blob:` URL. The registry keeps
//! the bytes alive until the handle is revoked, so every handle must be
//! revoked exactly once. A missed revoke leaks the buffer. A second revoke is
//! reported and ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const URL_SCHEME_PREFIX: &str = "blob:blurfade/";

/// A temporary, revocable handle onto registered bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

/// Bytes registered behind an object URL.
#[derive(Debug, Clone)]
pub struct ObjectData {
    pub bytes: Arc<[u8]>,
    pub mime: String,
}

/// Process-wide table of live object URLs.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<ObjectUrl, ObjectData>>,
}

impl ObjectUrl {
    /// Wrap an existing URL string without registering it.
    pub fn from_raw(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes and hand out a fresh URL.
    pub fn create(&self, bytes: impl Into<Arc<[u8]>>, mime: impl Into<String>) -> ObjectUrl {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let url = ObjectUrl(format!("{URL_SCHEME_PREFIX}{id}"));
        let data = ObjectData {
            bytes: bytes.into(),
            mime: mime.into(),
        };
        tracing::trace!(url = %url, bytes = data.bytes.len(), "Object URL created");
        self.lock().insert(url.clone(), data);
        url
    }

    /// Look up the bytes behind a live URL.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<ObjectData> {
        self.lock().get(url).cloned()
    }

    /// Release a URL. Returns `false` if it was already revoked or unknown.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.lock().remove(url).is_some();
        if removed {
            tracing::trace!(url = %url, "Object URL revoked");
        } else {
            tracing::warn!(url = %url, "Revoke of an object URL that is not live");
        }
        removed
    }

    pub fn is_live(&self, url: &ObjectUrl) -> bool {
        self.lock().contains_key(url)
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObjectUrl, ObjectData>> {
        // A poisoned map is still structurally valid.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
