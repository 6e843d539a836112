// SDK backend that carries payloads over zenoh instead of audio
//
// Transmit: put on TOPIC_CHIRP_TX, stay in Sending for the simulated airtime
// Receive:  every sample on TOPIC_CHIRP_RX is reported as DataReceived

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ChirpSdk, EventSink, SdkError, SdkEvent, SdkState, SharedState};
use crate::config::{
    CHIRP_AIRTIME_PER_BYTE, CHIRP_BASE_AIRTIME, SdkCredentials, TOPIC_CHIRP_RX, TOPIC_CHIRP_TX,
};

fn zenoh_err(e: impl std::fmt::Display) -> SdkError {
    SdkError::Zenoh(e.to_string())
}

/// Time a payload of `len` bytes spends on air
pub fn airtime(len: usize) -> Duration {
    CHIRP_BASE_AIRTIME + CHIRP_AIRTIME_PER_BYTE * len as u32
}

/// One payload on air; whoever takes the payload first reports it sent
struct OnAir {
    payload: Arc<Mutex<Option<Vec<u8>>>>,
    task: JoinHandle<()>,
}

fn take_payload(slot: &Mutex<Option<Vec<u8>>>) -> Option<Vec<u8>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

impl OnAir {
    /// Enter Sending and return to Running once `payload` has been on air
    fn begin(state: &SharedState, payload: Vec<u8>) -> Self {
        let on_air = airtime(payload.len());
        let slot = Arc::new(Mutex::new(Some(payload)));
        state.transition(SdkState::Sending);

        let task_state = state.clone();
        let task_slot = slot.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(on_air).await;
            if let Some(payload) = take_payload(&task_slot) {
                task_state.transition_from(SdkState::Sending, SdkState::Running);
                task_state.emit(SdkEvent::DataSent(payload));
            }
        });
        Self {
            payload: slot,
            task,
        }
    }

    /// Cut the transmission short, still reporting its payload as sent
    fn replace(self, state: &SharedState) {
        self.task.abort();
        if let Some(payload) = take_payload(&self.payload) {
            state.emit(SdkEvent::DataSent(payload));
        }
    }
}

pub struct ZenohChirp {
    state: SharedState,
    session: Option<zenoh::Session>,
    rx_task: Option<JoinHandle<()>>,
    on_air: Option<OnAir>,
}

impl ZenohChirp {
    pub fn new() -> Self {
        Self {
            state: SharedState::new(),
            session: None,
            rx_task: None,
            on_air: None,
        }
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.rx_task.take() {
            task.abort();
        }
        if let Some(on_air) = self.on_air.take() {
            on_air.task.abort();
        }
    }
}

impl Default for ZenohChirp {
    fn default() -> Self {
        Self::new()
    }
}

impl ChirpSdk for ZenohChirp {
    async fn init(&mut self, credentials: &SdkCredentials) -> Result<(), SdkError> {
        if self.session.is_some() {
            return Err(SdkError::AlreadyInitialized);
        }
        if !credentials.is_complete() {
            return Err(SdkError::MissingCredentials);
        }

        self.state.transition(SdkState::Initializing);
        info!(
            "Opening Zenoh session for app key {} ({} byte config)",
            credentials.key,
            credentials.config.len()
        );
        match zenoh::open(zenoh::Config::default()).await {
            Ok(session) => {
                self.session = Some(session);
                self.state.transition(SdkState::Initialized);
                Ok(())
            }
            Err(e) => {
                self.state.transition(SdkState::NotInitialized);
                Err(zenoh_err(e))
            }
        }
    }

    async fn start(&mut self) -> Result<(), SdkError> {
        let session = self.session.as_ref().ok_or(SdkError::NotInitialized)?;

        self.state.transition(SdkState::Starting);
        let subscriber = match session.declare_subscriber(TOPIC_CHIRP_RX).await {
            Ok(subscriber) => subscriber,
            Err(e) => {
                self.state.transition(SdkState::Initialized);
                return Err(zenoh_err(e));
            }
        };
        info!("Listening on {}, transmitting on {}", TOPIC_CHIRP_RX, TOPIC_CHIRP_TX);

        let state = self.state.clone();
        self.rx_task = Some(tokio::spawn(async move {
            loop {
                match subscriber.recv_async().await {
                    Ok(sample) => {
                        let payload = sample.payload().to_bytes().into_owned();
                        debug!("Received {} bytes on {}", payload.len(), sample.key_expr());
                        state.emit(SdkEvent::DataReceived(payload));
                    }
                    Err(e) => {
                        warn!("Receive channel closed: {}", e);
                        state.transition(SdkState::Error);
                        break;
                    }
                }
            }
        }));

        self.state.transition(SdkState::Running);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SdkError> {
        let session = self.session.take().ok_or(SdkError::NotInitialized)?;

        self.state.transition(SdkState::Stopping);
        self.abort_tasks();
        let closed = session.close().await.map_err(zenoh_err);
        self.state.transition(SdkState::NotInitialized);
        closed
    }

    async fn send_data(&mut self, payload: &[u8]) -> Result<(), SdkError> {
        let state = self.state.get();
        if !matches!(state, SdkState::Running | SdkState::Sending) {
            return Err(SdkError::NotRunning(state));
        }
        let session = self.session.as_ref().ok_or(SdkError::NotInitialized)?;

        session
            .put(TOPIC_CHIRP_TX, payload.to_vec())
            .await
            .map_err(zenoh_err)?;

        // A new transmission replaces the one still on air
        if let Some(previous) = self.on_air.take() {
            previous.replace(&self.state);
        }
        self.on_air = Some(OnAir::begin(&self.state, payload.to_vec()));
        Ok(())
    }

    fn set_event_sink(&mut self, sink: Option<EventSink>) {
        self.state.set_sink(sink);
    }

    fn state(&self) -> SdkState {
        self.state.get()
    }
}

impl Drop for ZenohChirp {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}
