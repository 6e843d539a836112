// In-memory SDK backend
//
// Transmits instantly and, with echo enabled, hears its own payloads.
// Records every call and can be told to fail the next call of a given kind.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::{ChirpSdk, EventSink, SdkError, SdkEvent, SdkState, SharedState};
use crate::config::SdkCredentials;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopbackOp {
    Init,
    Start,
    Stop,
    Send,
}

#[derive(Debug, Clone, Default)]
pub struct LoopbackLog {
    pub init_calls: usize,
    pub start_calls: usize,
    pub stop_calls: usize,
    pub sent: Vec<Vec<u8>>,
    pub last_credentials: Option<SdkCredentials>,
}

#[derive(Debug, Default)]
struct Shared {
    log: LoopbackLog,
    failure: Option<(LoopbackOp, String)>,
}

/// Inspection handle that stays valid after the SDK is moved into a manager
#[derive(Debug, Clone)]
pub struct LoopbackHandle(Arc<Mutex<Shared>>);

impl LoopbackHandle {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn log(&self) -> LoopbackLog {
        self.lock().log.clone()
    }

    /// Make the next `op` call fail with `message`
    pub fn fail_next(&self, op: LoopbackOp, message: impl Into<String>) {
        self.lock().failure = Some((op, message.into()));
    }

    fn take_failure(&self, op: LoopbackOp) -> Result<(), SdkError> {
        let mut shared = self.lock();
        match shared.failure.take() {
            Some((failing, message)) if failing == op => Err(SdkError::Backend(message)),
            other => {
                shared.failure = other;
                Ok(())
            }
        }
    }
}

pub struct LoopbackSdk {
    state: SharedState,
    shared: LoopbackHandle,
    echo: bool,
}

impl LoopbackSdk {
    pub fn new() -> Self {
        Self {
            state: SharedState::new(),
            shared: LoopbackHandle(Arc::new(Mutex::new(Shared::default()))),
            echo: false,
        }
    }

    /// Also report each sent payload as received
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn handle(&self) -> LoopbackHandle {
        self.shared.clone()
    }
}

impl Default for LoopbackSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl ChirpSdk for LoopbackSdk {
    async fn init(&mut self, credentials: &SdkCredentials) -> Result<(), SdkError> {
        self.shared.take_failure(LoopbackOp::Init)?;
        if self.state.get() != SdkState::NotInitialized {
            return Err(SdkError::AlreadyInitialized);
        }

        {
            let mut shared = self.shared.lock();
            shared.log.init_calls += 1;
            shared.log.last_credentials = Some(credentials.clone());
        }
        self.state.transition(SdkState::Initializing);
        self.state.transition(SdkState::Initialized);
        Ok(())
    }

    async fn start(&mut self) -> Result<(), SdkError> {
        self.shared.take_failure(LoopbackOp::Start)?;
        if self.state.get() == SdkState::NotInitialized {
            return Err(SdkError::NotInitialized);
        }

        self.shared.lock().log.start_calls += 1;
        self.state.transition(SdkState::Starting);
        self.state.transition(SdkState::Running);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SdkError> {
        self.shared.take_failure(LoopbackOp::Stop)?;
        if self.state.get() == SdkState::NotInitialized {
            return Err(SdkError::NotInitialized);
        }

        self.shared.lock().log.stop_calls += 1;
        self.state.transition(SdkState::Stopping);
        self.state.transition(SdkState::NotInitialized);
        Ok(())
    }

    async fn send_data(&mut self, payload: &[u8]) -> Result<(), SdkError> {
        self.shared.take_failure(LoopbackOp::Send)?;
        let state = self.state.get();
        if state != SdkState::Running {
            return Err(SdkError::NotRunning(state));
        }

        debug!("Loopback transmit {:02X?}", payload);
        self.shared.lock().log.sent.push(payload.to_vec());
        self.state.transition(SdkState::Sending);
        self.state.emit(SdkEvent::DataSent(payload.to_vec()));
        self.state.transition(SdkState::Running);
        if self.echo {
            self.state.emit(SdkEvent::DataReceived(payload.to_vec()));
        }
        Ok(())
    }

    fn set_event_sink(&mut self, sink: Option<EventSink>) {
        self.state.set_sink(sink);
    }

    fn state(&self) -> SdkState {
        self.state.get()
    }
}
