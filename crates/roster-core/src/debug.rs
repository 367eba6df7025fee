//! Last request/response introspection
//!
//! The [`DebugRecorder`] holds a single [`DebugSnapshot`] describing the most
//! recent outbound request and inbound response. The request pipeline replaces
//! it on every attempt; observers registered with [`DebugRecorder::subscribe`]
//! are told about each replacement synchronously.
//!
//! The recorder is best-effort. When several calls are in flight the snapshot
//! reflects whichever wrote last.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Maximum number of characters kept from a response body
pub const MAX_BODY_SNIPPET_CHARS: usize = 500;

/// Value recorded in place of the Authorization header
pub const REDACTED_AUTHORIZATION: &str = "Bearer [redacted]";

/// Redacted trace of an outbound request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestTrace {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub sent_at: DateTime<Utc>,
}

impl RequestTrace {
    /// Build a trace, redacting the Authorization header
    pub fn new(url: impl Into<String>, method: impl Into<String>, headers: &HashMap<String, String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: redact_headers(headers),
            sent_at: Utc::now(),
        }
    }
}

/// Trace of an inbound response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTrace {
    pub status: u16,
    /// First [`MAX_BODY_SNIPPET_CHARS`] characters of the body
    pub body_snippet: String,
    pub received_at: DateTime<Utc>,
}

impl ResponseTrace {
    /// Build a trace, truncating the body
    pub fn new(status: u16, body: &str) -> Self {
        Self {
            status,
            body_snippet: truncate_snippet(body),
            received_at: Utc::now(),
        }
    }
}

/// The most recent request/response pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestTrace>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseTrace>,
}

impl DebugSnapshot {
    /// Snapshot taken before the network call goes out
    pub fn preflight(request: RequestTrace) -> Self {
        Self {
            request: Some(request),
            response: None,
        }
    }

    /// Snapshot taken once a response has been read
    pub fn completed(request: RequestTrace, response: ResponseTrace) -> Self {
        Self {
            request: Some(request),
            response: Some(response),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.request.is_none() && self.response.is_none()
    }
}

/// Copy headers into a sorted map, masking the Authorization value
pub fn redact_headers(headers: &HashMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            if name.eq_ignore_ascii_case("authorization") {
                (name.clone(), REDACTED_AUTHORIZATION.to_string())
            } else {
                (name.clone(), value.clone())
            }
        })
        .collect()
}

/// Truncate a body to [`MAX_BODY_SNIPPET_CHARS`] characters
pub fn truncate_snippet(body: &str) -> String {
    body.chars().take(MAX_BODY_SNIPPET_CHARS).collect()
}

type Observer = Arc<dyn Fn(&DebugSnapshot) + Send + Sync>;

#[derive(Default)]
struct RecorderState {
    snapshot: DebugSnapshot,
    observers: Vec<(u64, Observer)>,
    next_id: u64,
}

/// Holder of the current [`DebugSnapshot`]
///
/// Construct one per application with [`DebugRecorder::new`] and share the
/// `Arc` with the [`ApiClient`](crate::http::ApiClient) and any observers.
#[derive(Default)]
pub struct DebugRecorder {
    state: Mutex<RecorderState>,
}

impl DebugRecorder {
    /// Create an empty recorder
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current snapshot
    pub fn read(&self) -> DebugSnapshot {
        self.lock().snapshot.clone()
    }

    /// Replace the snapshot and notify every registered observer
    ///
    /// Observers run on the calling thread before `write` returns. The lock is
    /// released first, so an observer may read, subscribe or unsubscribe.
    pub fn write(&self, next: DebugSnapshot) {
        let observers: Vec<Observer> = {
            let mut state = self.lock();
            state.snapshot = next.clone();
            state.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };

        for observer in observers {
            observer(&next);
        }
    }

    /// Register an observer
    ///
    /// The returned [`Subscription`] removes it again. Dropping the
    /// subscription without calling [`Subscription::unsubscribe`] leaves the
    /// observer registered for the lifetime of the recorder.
    pub fn subscribe<F>(self: &Arc<Self>, observer: F) -> Subscription
    where
        F: Fn(&DebugSnapshot) + Send + Sync + 'static,
    {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.observers.push((id, Arc::new(observer)));

        Subscription {
            id,
            recorder: Arc::downgrade(self),
        }
    }

    /// Number of registered observers
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn remove(&self, id: u64) -> bool {
        let mut state = self.lock();
        let before = state.observers.len();
        state.observers.retain(|(observer_id, _)| *observer_id != id);
        state.observers.len() != before
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        // A panicking observer never runs under the lock, so the state is intact
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for DebugRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugRecorder")
            .field("snapshot", &self.read())
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// Handle returned by [`DebugRecorder::subscribe`]
#[derive(Debug)]
#[must_use = "dropping a Subscription keeps the observer registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    recorder: Weak<DebugRecorder>,
}

impl Subscription {
    /// Remove the observer; returns false if it was already gone
    pub fn unsubscribe(self) -> bool {
        match self.recorder.upgrade() {
            Some(recorder) => recorder.remove(self.id),
            None => false,
        }
    }
}
