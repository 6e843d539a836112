// End-to-end: touch gestures in, encoded payloads out, via the loopback SDK

use marvin42_controller::config::{ControllerConfig, SdkCredentials};
use marvin42_controller::drive::{TouchPhase, Vec2};
use marvin42_controller::messages::MotorCommand;
use marvin42_controller::runtime::Controller;
use marvin42_controller::sdk::{LoopbackHandle, LoopbackSdk, SdkState};

// Field height 200: pivot-relative drags of 50 units are full power
const FIELD_HEIGHT: f32 = 200.0;

fn config() -> ControllerConfig {
    ControllerConfig {
        credentials: SdkCredentials::new("app-key", "app-secret", "app-config"),
        ..ControllerConfig::default()
    }
}

async fn started(config: ControllerConfig) -> (Controller<LoopbackSdk>, LoopbackHandle) {
    let sdk = LoopbackSdk::new();
    let handle = sdk.handle();
    let mut controller = Controller::new(&config, FIELD_HEIGHT, sdk).unwrap();
    controller.start_sdk().await;
    controller.drain_sdk_events();
    (controller, handle)
}

async fn gesture(controller: &mut Controller<LoopbackSdk>, points: &[(f32, f32)]) {
    let (first, rest) = points.split_first().unwrap();
    controller.on_touch(TouchPhase::Began, Vec2::new(first.0, first.1)).await;
    for (i, point) in rest.iter().enumerate() {
        let phase = if i + 1 == rest.len() {
            TouchPhase::Ended
        } else {
            TouchPhase::Moved
        };
        controller.on_touch(phase, Vec2::new(point.0, point.1)).await;
    }
    controller.drain_sdk_events();
}

#[tokio::test]
async fn forward_drag_sends_full_speed() {
    let (mut controller, handle) = started(config()).await;

    gesture(&mut controller, &[(0.0, 0.0), (0.0, 20.0), (0.0, 50.0)]).await;

    assert_eq!(handle.log().sent, vec![vec![0x03, 100, 100]]);
    assert_eq!(controller.labels().speed_left, "100");
    assert_eq!(controller.labels().speed_right, "100");
    assert_eq!(controller.labels().message, ">MotorSpeed(100, 100)");
    assert_eq!(controller.sdk_state(), SdkState::Running);
    assert!(!controller.is_touch_active());
}

#[tokio::test]
async fn reverse_left_drag_sends_negative_speeds() {
    let (mut controller, handle) = started(config()).await;

    gesture(&mut controller, &[(0.0, 0.0), (-30.0, -40.0)]).await;

    let sent = handle.log().sent;
    assert_eq!(sent, vec![vec![0x03, (-59i8) as u8, (-100i8) as u8]]);
}

#[tokio::test]
async fn tap_sends_stop_not_zero_speed() {
    let (mut controller, handle) = started(config()).await;

    gesture(&mut controller, &[(10.0, 10.0), (10.0, 10.0)]).await;

    assert_eq!(handle.log().sent, vec![vec![0x04]]);
    assert_eq!(controller.labels().speed_left, "0");
    assert_eq!(controller.labels().speed_right, "0");
}

#[tokio::test]
async fn preview_updates_labels_without_sending() {
    let (mut controller, handle) = started(config()).await;

    controller.on_touch(TouchPhase::Began, Vec2::ZERO).await;
    controller.on_touch(TouchPhase::Moved, Vec2::new(0.0, 25.0)).await;

    assert_eq!(controller.labels().speed_left, "50");
    assert!(handle.log().sent.is_empty());
    assert!(controller.is_touch_active());
}

#[tokio::test]
async fn cancel_drops_gesture() {
    let (mut controller, handle) = started(config()).await;

    controller.on_touch(TouchPhase::Began, Vec2::ZERO).await;
    controller.cancel_touch();
    controller.on_touch(TouchPhase::Ended, Vec2::new(0.0, 50.0)).await;

    assert!(handle.log().sent.is_empty());
}

#[tokio::test]
async fn touch_outside_field_is_ignored() {
    let (mut controller, handle) = started(config()).await;

    gesture(&mut controller, &[(150.0, 150.0), (0.0, 50.0)]).await;

    assert!(handle.log().sent.is_empty());
}

#[tokio::test]
async fn stop_button_resets_labels() {
    let (mut controller, handle) = started(config()).await;
    gesture(&mut controller, &[(0.0, 0.0), (0.0, 50.0)]).await;

    controller.send_stop().await;
    controller.drain_sdk_events();

    assert_eq!(handle.log().sent.last(), Some(&vec![0x04]));
    assert_eq!(controller.labels().speed_left, "0");
    assert_eq!(controller.labels().speed_right, "0");
}

#[tokio::test]
async fn clamp_to_interval_rounds_sent_speeds() {
    let (mut controller, handle) = started(ControllerConfig {
        clamp_to_interval: true,
        ..config()
    })
    .await;

    // Drag of 11.5 units -> 23% raw, rounded to 25%
    gesture(&mut controller, &[(0.0, 0.0), (0.0, 11.5)]).await;

    assert_eq!(handle.log().sent, vec![vec![0x03, 25, 25]]);
}

#[tokio::test]
async fn init_runs_once_per_lifecycle() {
    let (mut controller, handle) = started(config()).await;

    // Already initialized and started: a second start is a no-op
    controller.start_sdk().await;
    assert_eq!(handle.log().init_calls, 1);
    assert_eq!(handle.log().start_calls, 1);

    controller.restart_sdk().await;
    controller.drain_sdk_events();
    assert_eq!(handle.log().init_calls, 2);
    assert_eq!(handle.log().stop_calls, 1);
    assert_eq!(controller.sdk_state(), SdkState::Running);
}

#[tokio::test]
async fn blank_credentials_never_reach_sdk() {
    let (mut controller, handle) = started(ControllerConfig::default()).await;
    assert_eq!(
        controller.labels().error.as_deref(),
        Some("SDK credentials are incomplete")
    );

    controller.send_stop().await;

    assert_eq!(handle.log().init_calls, 0);
    assert!(handle.log().sent.is_empty());
    assert_eq!(
        controller.labels().error.as_deref(),
        Some("SDK is not running (state: NotInitialized)")
    );
    assert!(controller.is_send_enabled());
}

#[tokio::test]
async fn shutdown_stops_sdk() {
    let (mut controller, handle) = started(config()).await;

    controller.shutdown().await;

    assert_eq!(handle.log().stop_calls, 1);
    assert!(!controller.sdk().is_initialized());
    assert!(!controller.sdk().is_subscribed());
}

#[tokio::test]
async fn hand_built_zero_speed_goes_out_as_stop() {
    let (mut controller, handle) = started(config()).await;
    gesture(&mut controller, &[(0.0, 0.0), (0.0, 50.0)]).await;

    controller.send(MotorCommand::Speed { left: 0, right: 0 }).await;

    assert_eq!(handle.log().sent.last(), Some(&vec![0x04]));
    assert_eq!(controller.labels().speed_left, "0");
    assert_eq!(controller.labels().speed_right, "0");
}
