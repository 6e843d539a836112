// Data-over-sound SDK boundary
//
// Provides:
// - The `ChirpSdk` trait every transport backend implements
// - SDK state / event types and the bounded event channel
// - `SdkManager`, the idempotent lifecycle wrapper used by the controller
// - Backends: in-memory loopback and zenoh

mod loopback;
mod manager;
mod zenoh_backend;

use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::SdkCredentials;

pub use loopback::{LoopbackHandle, LoopbackLog, LoopbackOp, LoopbackSdk};
pub use manager::SdkManager;
pub use zenoh_backend::ZenohChirp;

/// SDK state, owned by the backend and mirrored by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SdkState {
    NotInitialized,
    Initializing,
    Initialized,
    Starting,
    Running,
    Stopping,
    Sending,
    Error,
}

impl std::fmt::Display for SdkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Notifications delivered by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    StateChanged { old: SdkState, new: SdkState },
    DataReceived(Vec<u8>),
    DataSent(Vec<u8>),
}

#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    #[error("SDK credentials are incomplete")]
    MissingCredentials,

    #[error("SDK is not initialized")]
    NotInitialized,

    #[error("SDK is not running (state: {0})")]
    NotRunning(SdkState),

    #[error("SDK is already initialized")]
    AlreadyInitialized,

    #[error("Zenoh error: {0}")]
    Zenoh(String),

    #[error("SDK failure: {0}")]
    Backend(String),
}

/// Sending half of the event channel, handed to a backend while subscribed
#[derive(Debug, Clone)]
pub struct EventSink(mpsc::Sender<SdkEvent>);

impl EventSink {
    /// Deliver without blocking; events are dropped when the channel is full
    pub fn emit(&self, event: SdkEvent) {
        if let Err(e) = self.0.try_send(event) {
            warn!("Dropping SDK event: {}", e);
        }
    }
}

/// Bounded channel between a backend and the controller
pub fn event_channel(capacity: usize) -> (EventSink, mpsc::Receiver<SdkEvent>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSink(tx), rx)
}

/// Data-over-sound SDK, treated as an opaque capability
///
/// Backends report state changes and data through the sink set with
/// `set_event_sink`; at most one sink is held at a time.
#[allow(async_fn_in_trait)]
pub trait ChirpSdk {
    async fn init(&mut self, credentials: &SdkCredentials) -> Result<(), SdkError>;
    async fn start(&mut self) -> Result<(), SdkError>;
    async fn stop(&mut self) -> Result<(), SdkError>;
    async fn send_data(&mut self, payload: &[u8]) -> Result<(), SdkError>;
    fn set_event_sink(&mut self, sink: Option<EventSink>);
    fn state(&self) -> SdkState;
}

/// Backend state plus the current sink, shared with background tasks
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<Mutex<StateInner>>);

#[derive(Debug)]
struct StateInner {
    state: SdkState,
    sink: Option<EventSink>,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(Arc::new(Mutex::new(StateInner {
            state: SdkState::NotInitialized,
            sink: None,
        })))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StateInner> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn get(&self) -> SdkState {
        self.lock().state
    }

    pub(crate) fn set_sink(&self, sink: Option<EventSink>) {
        self.lock().sink = sink;
    }

    /// Move to `new` and notify the sink, if any
    pub(crate) fn transition(&self, new: SdkState) {
        let mut inner = self.lock();
        let old = inner.state;
        if old == new {
            return;
        }
        inner.state = new;
        debug!("SDK state: {} => {}", old, new);
        if let Some(sink) = &inner.sink {
            sink.emit(SdkEvent::StateChanged { old, new });
        }
    }

    /// Move to `new` only if currently in `expected`
    pub(crate) fn transition_from(&self, expected: SdkState, new: SdkState) -> bool {
        if self.get() != expected {
            return false;
        }
        self.transition(new);
        true
    }

    pub(crate) fn emit(&self, event: SdkEvent) {
        if let Some(sink) = &self.lock().sink {
            sink.emit(event);
        }
    }
}
