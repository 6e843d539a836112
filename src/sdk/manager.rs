// Idempotent lifecycle wrapper around a ChirpSdk backend

use tracing::{debug, info, warn};

use super::{ChirpSdk, EventSink, SdkError, SdkState};
use crate::config::SdkCredentials;
use crate::messages::MotorCommand;

pub struct SdkManager<S: ChirpSdk> {
    sdk: S,
    credentials: SdkCredentials,
    sink: EventSink,
    initialized: bool,
    started: bool,
    subscribed: bool,
}

impl<S: ChirpSdk> SdkManager<S> {
    pub fn new(sdk: S, credentials: SdkCredentials, sink: EventSink) -> Self {
        Self {
            sdk,
            credentials,
            sink,
            initialized: false,
            started: false,
            subscribed: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn backend_state(&self) -> SdkState {
        self.sdk.state()
    }

    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    pub fn credentials(&self) -> &SdkCredentials {
        &self.credentials
    }

    /// Replace the credentials used by the next init
    pub fn set_credentials(&mut self, credentials: SdkCredentials) {
        self.credentials = credentials;
    }

    /// Initialize the backend
    ///
    /// No-op when already initialized or when any credential is blank.
    pub async fn init(&mut self) -> Result<(), SdkError> {
        if self.initialized {
            debug!("SDK already initialized");
            return Ok(());
        }
        if !self.credentials.is_complete() {
            warn!("SDK credentials incomplete, skipping init");
            return Ok(());
        }

        info!("Initializing SDK...");
        // Detach first so a re-entered init never registers twice
        self.unsubscribe();
        self.sdk.init(&self.credentials).await?;
        self.subscribe();
        self.initialized = true;
        Ok(())
    }

    /// Start the backend; no-op when already started or not initialized
    pub async fn start(&mut self) -> Result<(), SdkError> {
        if self.started || !self.initialized {
            debug!(
                "Skipping SDK start (initialized={}, started={})",
                self.initialized, self.started
            );
            return Ok(());
        }

        info!("Starting SDK...");
        self.sdk.start().await?;
        self.started = true;
        Ok(())
    }

    /// Stop the backend; no-op when not initialized
    pub async fn stop(&mut self) -> Result<(), SdkError> {
        if !self.initialized {
            return Ok(());
        }

        info!("Stopping SDK...");
        self.sdk.stop().await?;
        self.initialized = false;
        self.started = false;
        Ok(())
    }

    pub async fn restart(&mut self) -> Result<(), SdkError> {
        self.stop().await?;
        self.init().await?;
        self.start().await
    }

    /// Encode and transmit a motor command
    pub async fn send(&mut self, command: MotorCommand) -> Result<(), SdkError> {
        let command = command.normalized();
        info!("Sending {}", command);
        self.send_data(&command.encode()).await
    }

    pub async fn send_data(&mut self, payload: &[u8]) -> Result<(), SdkError> {
        self.sdk.send_data(payload).await
    }

    /// Route backend events into the controller channel
    pub fn subscribe(&mut self) {
        if self.subscribed {
            return;
        }
        self.sdk.set_event_sink(Some(self.sink.clone()));
        self.subscribed = true;
    }

    pub fn unsubscribe(&mut self) {
        if !self.subscribed {
            return;
        }
        self.sdk.set_event_sink(None);
        self.subscribed = false;
    }

    /// Drop event delivery and stop the backend
    pub async fn shutdown(&mut self) -> Result<(), SdkError> {
        self.unsubscribe();
        self.stop().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{LoopbackOp, LoopbackSdk, SdkEvent, event_channel};
    use tokio::sync::mpsc;

    fn credentials() -> SdkCredentials {
        SdkCredentials::new("key", "secret", "config")
    }

    fn manager(credentials: SdkCredentials) -> (SdkManager<LoopbackSdk>, mpsc::Receiver<SdkEvent>) {
        let (sink, rx) = event_channel(64);
        (SdkManager::new(LoopbackSdk::new(), credentials, sink), rx)
    }

    #[tokio::test]
    async fn test_init_twice_initializes_once() {
        let (mut sdk, _rx) = manager(credentials());
        let handle = sdk.sdk().handle();

        sdk.init().await.unwrap();
        sdk.init().await.unwrap();

        assert_eq!(handle.log().init_calls, 1);
        assert!(sdk.is_initialized());
    }

    #[tokio::test]
    async fn test_blank_credentials_skip_init() {
        let (mut sdk, _rx) = manager(SdkCredentials::new("key", "", "config"));
        let handle = sdk.sdk().handle();

        sdk.init().await.unwrap();
        sdk.start().await.unwrap();

        assert_eq!(handle.log().init_calls, 0);
        assert_eq!(handle.log().start_calls, 0);
        assert!(!sdk.is_initialized());
    }

    #[tokio::test]
    async fn test_start_requires_init_and_runs_once() {
        let (mut sdk, _rx) = manager(credentials());
        let handle = sdk.sdk().handle();

        sdk.start().await.unwrap();
        assert_eq!(handle.log().start_calls, 0);

        sdk.init().await.unwrap();
        sdk.start().await.unwrap();
        sdk.start().await.unwrap();
        assert_eq!(handle.log().start_calls, 1);
        assert_eq!(sdk.backend_state(), SdkState::Running);
    }

    #[tokio::test]
    async fn test_stop_is_noop_when_not_initialized() {
        let (mut sdk, _rx) = manager(credentials());
        let handle = sdk.sdk().handle();

        sdk.stop().await.unwrap();
        assert_eq!(handle.log().stop_calls, 0);
    }

    #[tokio::test]
    async fn test_restart_cycles_backend() {
        let (mut sdk, _rx) = manager(credentials());
        let handle = sdk.sdk().handle();

        sdk.init().await.unwrap();
        sdk.start().await.unwrap();
        sdk.restart().await.unwrap();

        let log = handle.log();
        assert_eq!(log.init_calls, 2);
        assert_eq!(log.start_calls, 2);
        assert_eq!(log.stop_calls, 1);
        assert!(sdk.is_started());
    }

    #[tokio::test]
    async fn test_failed_init_leaves_state_unchanged() {
        let (mut sdk, _rx) = manager(credentials());
        let handle = sdk.sdk().handle();
        handle.fail_next(LoopbackOp::Init, "bad app key");

        let err = sdk.init().await.unwrap_err();
        assert_eq!(err.to_string(), "SDK failure: bad app key");
        assert!(!sdk.is_initialized());
        assert!(!sdk.is_subscribed());

        sdk.init().await.unwrap();
        assert!(sdk.is_initialized());
        assert!(sdk.is_subscribed());
    }

    #[tokio::test]
    async fn test_send_encodes_command() {
        let (mut sdk, mut rx) = manager(credentials());
        let handle = sdk.sdk().handle();

        sdk.init().await.unwrap();
        sdk.start().await.unwrap();
        sdk.send(MotorCommand::speed(-50, 60)).await.unwrap();
        sdk.send(MotorCommand::Stop).await.unwrap();

        assert_eq!(handle.log().sent, vec![vec![0x03, 0xCE, 0x3C], vec![0x04]]);

        let mut sent = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SdkEvent::DataSent(payload) = event {
                sent.push(payload);
            }
        }
        assert_eq!(sent, vec![vec![0x03, 0xCE, 0x3C], vec![0x04]]);
    }

    #[tokio::test]
    async fn test_hand_built_speeds_are_normalized_before_transmit() {
        let (mut sdk, _rx) = manager(credentials());
        let handle = sdk.sdk().handle();

        sdk.init().await.unwrap();
        sdk.start().await.unwrap();
        sdk.send(MotorCommand::Speed { left: 0, right: 0 }).await.unwrap();
        sdk.send(MotorCommand::Speed { left: 127, right: -128 }).await.unwrap();

        assert_eq!(
            handle.log().sent,
            vec![vec![0x04], vec![0x03, 100, (-100i8) as u8]]
        );
    }

    #[tokio::test]
    async fn test_shutdown_stops_event_delivery() {
        let (mut sdk, mut rx) = manager(credentials());

        sdk.init().await.unwrap();
        sdk.start().await.unwrap();
        while rx.try_recv().is_ok() {}

        sdk.shutdown().await.unwrap();
        assert!(!sdk.is_subscribed());
        assert!(!sdk.is_initialized());
        assert!(rx.try_recv().is_err());
    }
}
