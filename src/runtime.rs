// Frame loop: poll input, relay SDK events, animate, render
//
// Everything runs on one task. SDK callbacks arrive on a bounded channel
// and are only applied to UI state from inside the loop.

use std::io::{self, Write};
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crossterm::cursor::MoveTo;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture};
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType, disable_raw_mode, enable_raw_mode};
use crossterm::{execute, queue};
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::{ControllerConfig, EVENT_CHANNEL_CAPACITY, MAX_LOOP_HZ};
use crate::drive::{
    ClampOptions, ControlSurfaceGeometry, GeometryError, TouchPhase, TouchTracker, TouchUpdate, Vec2,
};
use crate::messages::MotorCommand;
use crate::sdk::{ChirpSdk, SdkError, SdkEvent, SdkManager, SdkState, event_channel};
use crate::ui::{ProgressIndicator, TerminalSurface, UiAction, map_event};

/// Text shown to the user
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Labels {
    pub speed_left: String,
    pub speed_right: String,
    pub state: String,
    pub message: String,
    pub error: Option<String>,
}

pub struct Controller<S: ChirpSdk> {
    touch: TouchTracker,
    clamp: ClampOptions,
    sdk: SdkManager<S>,
    events: mpsc::Receiver<SdkEvent>,
    sdk_state: SdkState,
    labels: Labels,
    send_enabled: bool,
    progress: ProgressIndicator,
}

impl<S: ChirpSdk> Controller<S> {
    pub fn new(config: &ControllerConfig, surface_height: f32, sdk: S) -> Result<Self, GeometryError> {
        let geometry = ControlSurfaceGeometry::from_height(surface_height)?;
        let (sink, events) = event_channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            touch: TouchTracker::new(geometry),
            clamp: ClampOptions {
                to_interval: config.clamp_to_interval,
                to_each_other: config.clamp_to_each_other,
                delta: config.motor_speed_clamp_delta,
            },
            sdk: SdkManager::new(sdk, config.credentials.clone(), sink),
            events,
            sdk_state: SdkState::NotInitialized,
            labels: Labels {
                speed_left: "0".to_string(),
                speed_right: "0".to_string(),
                state: SdkState::NotInitialized.to_string(),
                ..Labels::default()
            },
            send_enabled: false,
            progress: ProgressIndicator::new(config.progress_revolution_time),
        })
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn sdk_state(&self) -> SdkState {
        self.sdk_state
    }

    pub fn sdk(&self) -> &SdkManager<S> {
        &self.sdk
    }

    pub fn clamp_options(&self) -> &ClampOptions {
        &self.clamp
    }

    pub fn progress(&self) -> &ProgressIndicator {
        &self.progress
    }

    pub fn is_send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn is_touch_active(&self) -> bool {
        self.touch.is_active()
    }

    /// Rebuild the touch field after a resize; drops any active gesture
    pub fn set_surface_height(&mut self, height: f32) -> Result<(), GeometryError> {
        self.touch = TouchTracker::new(ControlSurfaceGeometry::from_height(height)?);
        Ok(())
    }

    fn report(&mut self, error: SdkError) {
        warn!("{}", error);
        self.labels.error = Some(error.to_string());
    }

    fn display_speeds(&mut self, left: i8, right: i8) {
        self.labels.speed_left = left.to_string();
        self.labels.speed_right = right.to_string();
    }

    /// Init then start the SDK, showing any failure
    pub async fn start_sdk(&mut self) {
        self.labels.error = None;
        if !self.sdk.credentials().is_complete() {
            self.report(SdkError::MissingCredentials);
            return;
        }
        if let Err(e) = self.sdk.init().await {
            self.report(e);
            return;
        }
        if let Err(e) = self.sdk.start().await {
            self.report(e);
        }
    }

    pub async fn restart_sdk(&mut self) {
        self.labels.error = None;
        if let Err(e) = self.sdk.restart().await {
            self.report(e);
            return;
        }
        if !self.sdk.credentials().is_complete() {
            self.report(SdkError::MissingCredentials);
        }
    }

    /// Apply one user action; Break means quit
    pub async fn apply(&mut self, action: UiAction) -> ControlFlow<()> {
        match action {
            UiAction::Touch(phase, position) => self.on_touch(phase, position).await,
            UiAction::CancelTouch => self.cancel_touch(),
            UiAction::SendStop if self.send_enabled => self.send_stop().await,
            UiAction::SendStop => debug!("Send disabled in state {}", self.sdk_state),
            UiAction::ToggleClampToInterval => {
                self.clamp.to_interval = !self.clamp.to_interval;
                info!("Clamp to interval: {}", self.clamp.to_interval);
            }
            UiAction::ToggleClampToEachOther => {
                self.clamp.to_each_other = !self.clamp.to_each_other;
                info!("Clamp to each other: {}", self.clamp.to_each_other);
            }
            UiAction::RestartSdk => self.restart_sdk().await,
            UiAction::Resize { .. } => {}
            UiAction::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    pub async fn on_touch(&mut self, phase: TouchPhase, position: Vec2) {
        match self.touch.handle(phase, position, &self.clamp) {
            TouchUpdate::Ignored => {}
            TouchUpdate::Started => self.display_speeds(0, 0),
            TouchUpdate::Preview { left, right } => self.display_speeds(left, right),
            TouchUpdate::Released {
                left,
                right,
                command,
            } => {
                self.display_speeds(left, right);
                self.send(command).await;
            }
        }
    }

    pub fn cancel_touch(&mut self) {
        if self.touch.cancel() {
            debug!("Touch cancelled");
        }
    }

    pub async fn send_stop(&mut self) {
        self.send(MotorCommand::Stop).await;
    }

    /// Transmit a command; failures are shown and re-enable sending
    pub async fn send(&mut self, command: MotorCommand) {
        let command = command.normalized();
        if command == MotorCommand::Stop {
            self.display_speeds(0, 0);
        }

        self.labels.error = None;
        self.send_enabled = false;
        if let Err(e) = self.sdk.send(command).await {
            self.report(e);
            self.send_enabled = true;
        }
    }

    fn set_sdk_state(&mut self, new: SdkState) {
        self.sdk_state = new;
        self.labels.state = new.to_string();
        self.send_enabled = new == SdkState::Running;
        if new == SdkState::Sending {
            self.progress.restart();
        }
    }

    pub fn on_sdk_event(&mut self, event: SdkEvent) {
        match event {
            SdkEvent::StateChanged { old, new } => {
                info!("State change: {} => {}", old, new);
                self.set_sdk_state(new);
            }
            SdkEvent::DataSent(payload) => {
                info!("Send: {:02X?}", payload);
                self.labels.message = format!(">{}", describe_payload(&payload));
            }
            SdkEvent::DataReceived(payload) => {
                info!("Recv: {:02X?} | length: {}", payload, payload.len());
                self.labels.message = format!("<{}", describe_payload(&payload));
            }
        }
    }

    /// Apply every event queued since the last frame
    ///
    /// State changes dropped on a full channel are caught up from the
    /// backend afterwards.
    pub fn drain_sdk_events(&mut self) -> usize {
        let mut count = 0;
        while let Ok(event) = self.events.try_recv() {
            self.on_sdk_event(event);
            count += 1;
        }

        let backend = self.sdk.backend_state();
        if backend != self.sdk_state {
            warn!("Missed SDK state change: {} => {}", self.sdk_state, backend);
            self.set_sdk_state(backend);
        }
        count
    }

    pub fn tick(&mut self, dt: Duration) {
        self.progress.tick(dt, self.sdk_state);
    }

    /// Unsubscribe from the SDK and stop it
    pub async fn shutdown(&mut self) {
        self.touch.cancel();
        self.progress.cancel();
        if let Err(e) = self.sdk.shutdown().await {
            self.report(e);
        }
    }

    pub fn status_line(&self) -> String {
        let on_off = |flag: bool| if flag { "on" } else { "off" };
        let mut line = format!(
            "[{}] L {:>4} R {:>4} | interval {} | each-other {} | send {} | {} {}",
            self.labels.state,
            self.labels.speed_left,
            self.labels.speed_right,
            on_off(self.clamp.to_interval),
            on_off(self.clamp.to_each_other),
            on_off(self.send_enabled),
            progress_bar(&self.progress),
            self.labels.message,
        );
        if let Some(error) = &self.labels.error {
            line.push_str(" | error: ");
            line.push_str(error);
        }
        line
    }
}

fn describe_payload(payload: &[u8]) -> String {
    match MotorCommand::decode(payload) {
        Ok(command) => command.to_string(),
        Err(_) => format!("{:02X?}", payload),
    }
}

fn progress_bar(progress: &ProgressIndicator) -> String {
    const WIDTH: usize = 10;
    if !progress.is_running() {
        return " ".repeat(WIDTH);
    }
    let filled = ((progress.fill() * WIDTH as f32).round() as usize).min(WIDTH);
    format!("{}{}", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

/// Time between frames; the rate is held to 1..=MAX_LOOP_HZ
pub fn frame_period(loop_hz: u64) -> Duration {
    Duration::from_micros(1_000_000 / loop_hz.clamp(1, MAX_LOOP_HZ))
}

pub async fn run<S: ChirpSdk>(
    config: ControllerConfig,
    sdk: S,
    loop_hz: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let (cols, rows) = terminal::size()?;
    let mut surface = TerminalSurface::new(cols, rows, config.cell_aspect);
    let mut controller = Controller::new(&config, surface.height(), sdk)?;

    controller.start_sdk().await;

    info!("Controller started: {}Hz frame loop, {}x{} touch field", loop_hz, cols, rows);
    info!("Controls: drag=steer, C=cancel, S=stop, I/E=clamp toggles, R=restart SDK, Q=quit");

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnableMouseCapture, Clear(ClearType::All))?;
    let result = frame_loop(&mut controller, &mut surface, config.cell_aspect, loop_hz).await;
    execute!(stdout, DisableMouseCapture)?;
    disable_raw_mode()?;

    controller.shutdown().await;
    result
}

async fn frame_loop<S: ChirpSdk>(
    controller: &mut Controller<S>,
    surface: &mut TerminalSurface,
    cell_aspect: f32,
    loop_hz: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut tick = interval(frame_period(loop_hz));
    let mut last_frame = Instant::now();
    let mut last_status = String::new();
    let mut stdout = io::stdout();

    loop {
        tick.tick().await;

        // 1. Drain pending terminal input (non-blocking)
        while event::poll(Duration::ZERO)? {
            let Some(action) = map_event(&event::read()?, surface) else {
                continue;
            };
            if let UiAction::Resize { cols, rows } = action {
                *surface = TerminalSurface::new(cols, rows, cell_aspect);
                if let Err(e) = controller.set_surface_height(surface.height()) {
                    warn!("Ignoring resize: {}", e);
                }
                continue;
            }
            if controller.apply(action).await.is_break() {
                return Ok(());
            }
        }

        // 2. Apply SDK callbacks on this task
        controller.drain_sdk_events();

        // 3. Animate
        let now = Instant::now();
        controller.tick(now.duration_since(last_frame));
        last_frame = now;

        // 4. Redraw the status line when it changes
        let status = controller.status_line();
        if status != last_status {
            queue!(stdout, MoveTo(0, 0), Clear(ClearType::CurrentLine), Print(&status))?;
            stdout.flush()?;
            last_status = status;
        }
    }
}
