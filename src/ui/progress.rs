// Radial progress indicator shown while the SDK is transmitting
//
// Stepped once per frame. Fills 0 -> 1 over one revolution, then drains
// 1 -> 0 the other way round, and so on until the state leaves Sending.

use std::time::Duration;

use crate::sdk::SdkState;

#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    revolution_time: f32,
    fill: f32,
    clockwise: bool,
    elapsed: f32,
    running: bool,
}

impl ProgressIndicator {
    /// `revolution_time` in seconds; zero or less disables the animation
    pub fn new(revolution_time: f32) -> Self {
        Self {
            revolution_time,
            fill: 0.0,
            clockwise: true,
            elapsed: 0.0,
            running: false,
        }
    }

    pub fn fill(&self) -> f32 {
        self.fill
    }

    pub fn is_clockwise(&self) -> bool {
        self.clockwise
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Begin a new animation, replacing any in progress
    pub fn restart(&mut self) {
        self.cancel();
        if self.revolution_time > 0.0 {
            self.running = true;
        }
    }

    /// End the animation and empty the indicator
    pub fn cancel(&mut self) {
        self.running = false;
        self.fill = 0.0;
        self.clockwise = true;
        self.elapsed = 0.0;
    }

    /// Advance one frame; ends itself once `state` is no longer Sending
    pub fn tick(&mut self, dt: Duration, state: SdkState) {
        if !self.running {
            return;
        }
        if state != SdkState::Sending {
            self.cancel();
            return;
        }

        let progress = (self.elapsed / self.revolution_time).clamp(0.0, 1.0);
        self.fill = if self.clockwise { progress } else { 1.0 - progress };

        if self.elapsed < self.revolution_time {
            self.elapsed += dt.as_secs_f32();
        } else {
            self.clockwise = !self.clockwise;
            self.elapsed = 0.0;
        }
    }
}
