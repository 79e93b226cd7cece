//! Session manager: issues session ids, owns each session's outbound
//! channel, and retires idle sessions.
//!
//! Each session has exactly one writer: the task that drains its outbound
//! channel. Concurrent tool-call completions push frames onto the channel
//! and the writer serializes them onto the wire in completion order

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::RngCore;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Idle timeout after which a session with no traffic is closed.
pub const IDLE_TIMEOUT: Duration = Duration::minutes(30);

/// Bound on the outbound frame channel; a slow consumer backpressures the
/// writer before it would OOM the process.
const CHANNEL_CAPACITY: usize = 256;

/// The negotiated MCP protocol version, set once `initialize` completes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Open,
    Ready,
    Closed,
}

struct SessionRecord {
    created_at: DateTime<Utc>,
    last_activity: parking_lot::Mutex<DateTime<Utc>>,
    outbound: mpsc::Sender<Value>,
    state: parking_lot::Mutex<SessionState>,
    protocol_version: parking_lot::Mutex<Option<String>>,
    cancellation: CancellationToken,
    /// Set once a `GET /sse` reader attaches.
    /// Distinguishes a real streaming session (async delivery over the
    /// channel) from a hybrid-transport session with no reader, whose
    /// responses must be returned inline on the POST instead.
    attached: parking_lot::Mutex<bool>,
}

/// Session metadata snapshot returned to callers that don't need direct
/// channel access (debug endpoint, readiness checks).
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub state: SessionState,
    pub protocol_version: Option<String>,
}

/// Tracks open MCP streaming sessions.
///
/// Reads (lookup on every message) vastly outnumber writes (open/close),
/// so `DashMap` is used as the sharded-lock equivalent of a reader-writer map.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<DashMap<String, SessionRecord>>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self { sessions: Arc::new(DashMap::new()) }
    }

    /// Allocate a session and its outbound channel. Returns the session id
    /// and the receiving half for the caller's writer task to drain.
    pub fn open(&self) -> (String, mpsc::Receiver<Value>) {
        let id = generate_session_id();
        let rx = self.insert_session(id.clone());
        (id, rx)
    }

    /// Register an ephemeral session for the hybrid transport, which has
    /// no persistent stream of its own.
    /// The returned receiver is drained exactly once by the caller.
    pub fn open_ephemeral(&self) -> (String, mpsc::Receiver<Value>) {
        self.open()
    }

    /// Debug-mode escape hatch: register a session under a caller-chosen
    /// id instead of a generated one, so an unregistered id a debug
    /// client presents can still route through a best-effort ephemeral
    /// channel.
    pub fn open_with_id(&self, id: String) -> mpsc::Receiver<Value> {
        self.insert_session(id)
    }

    fn insert_session(&self, id: String) -> mpsc::Receiver<Value> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let now = Utc::now();
        self.sessions.insert(
            id,
            SessionRecord {
                created_at: now,
                last_activity: parking_lot::Mutex::new(now),
                outbound: tx,
                state: parking_lot::Mutex::new(SessionState::Open),
                protocol_version: parking_lot::Mutex::new(None),
                cancellation: CancellationToken::new(),
                attached: parking_lot::Mutex::new(false),
            },
        );
        crate::telemetry::session_opened();
        rx
    }

    /// Registers the outbound channel as attached to a live reader. Returns `false` if the session is unknown or
    /// already attached.
    pub fn mark_attached(&self, session_id: &str) -> bool {
        match self.sessions.get(session_id) {
            Some(record) => {
                let mut attached = record.attached.lock();
                if *attached {
                    false
                } else {
                    *attached = true;
                    true
                }
            }
            None => false,
        }
    }

    pub fn is_attached(&self, session_id: &str) -> bool {
        self.sessions.get(session_id).map(|r| *r.attached.lock()).unwrap_or(false)
    }

    /// Mark a session as ready to accept `tools/call`.
    pub fn mark_ready(&self, session_id: &str, protocol_version: String) {
        if let Some(record) = self.sessions.get(session_id) {
            *record.state.lock() = SessionState::Ready;
            *record.protocol_version.lock() = Some(protocol_version);
            self.touch(session_id);
        }
    }

    pub fn is_ready(&self, session_id: &str) -> bool {
        self.sessions.get(session_id).map(|r| matches!(*r.state.lock(), SessionState::Ready)).unwrap_or(false)
    }

    pub fn exists(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn protocol_version(&self, session_id: &str) -> Option<String> {
        self.sessions.get(session_id).and_then(|r| r.protocol_version.lock().clone())
    }

    /// Push a frame onto a session's outbound channel, blocking until the
    /// channel accepts it. Returns `Err` if the session has already closed.
    pub async fn deliver(&self, session_id: &str, frame: Value) -> Result<(), ()> {
        let sender = {
            let record = self.sessions.get(session_id).ok_or(())?;
            record.outbound.clone()
        };
        self.touch(session_id);
        sender.send(frame).await.map_err(|_| ())
    }

    /// A cancellation token that fires when this session closes, so
    /// in-flight tool calls bound to it can propagate cancellation to
    /// their upstream HTTP requests.
    pub fn cancellation_token(&self, session_id: &str) -> Option<CancellationToken> {
        self.sessions.get(session_id).map(|r| r.cancellation.clone())
    }

    pub fn touch(&self, session_id: &str) {
        if let Some(record) = self.sessions.get(session_id) {
            *record.last_activity.lock() = Utc::now();
        }
    }

    pub fn close(&self, session_id: &str) {
        if let Some((_, record)) = self.sessions.remove(session_id) {
            record.cancellation.cancel();
            crate::telemetry::session_closed();
        }
    }

    pub fn info(&self, session_id: &str) -> Option<SessionInfo> {
        self.sessions.get(session_id).map(|r| SessionInfo {
            id: session_id.to_string(),
            created_at: r.created_at,
            last_activity: *r.last_activity.lock(),
            state: r.state.lock().clone(),
            protocol_version: r.protocol_version.lock().clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Cancel and release every open session. Called on process shutdown
    pub fn close_all(&self) {
        for entry in self.sessions.iter() {
            entry.cancellation.cancel();
        }
        self.sessions.clear();
    }

    /// Background reaper: sweeps sessions idle past `IDLE_TIMEOUT` every
    /// minute. Spawned once at startup alongside the HTTP server.
    pub async fn run_idle_reaper(self) {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            ticker.tick().await;
            let now = Utc::now();
            let expired: Vec<String> = self
                .sessions
                .iter()
                .filter(|entry| now - *entry.last_activity.lock() > IDLE_TIMEOUT)
                .map(|entry| entry.key().clone())
                .collect();
            for session_id in expired {
                tracing::info!(session_id = %session_id, "closing idle session");
                self.close(&session_id);
            }
        }
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// URL-safe, >=16 bytes of entropy session id.
fn generate_session_id() -> String {
    let mut bytes = [0u8; 24];
    rand::rng().fill_bytes(&mut bytes);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

#[cfg(test)]
mod tests;
