// Per-gesture touch tracking on the touch field

use tracing::debug;

use super::geometry::Vec2;
use super::interpreter::{ClampOptions, ControlSurfaceGeometry, TouchSample, compute_motor_speeds};
use crate::messages::MotorCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Began,
    Moved,
    Ended,
}

/// What a touch event did to the gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchUpdate {
    /// Touch outside the field, or a phase that doesn't apply right now
    Ignored,
    /// Gesture started on the field
    Started,
    /// Speeds for the current pointer position, for display only
    Preview { left: i8, right: i8 },
    /// Gesture finished; `command` is ready to send
    Released {
        left: i8,
        right: i8,
        command: MotorCommand,
    },
}

pub struct TouchTracker {
    geometry: ControlSurfaceGeometry,
    sample: TouchSample,
}

impl TouchTracker {
    pub fn new(geometry: ControlSurfaceGeometry) -> Self {
        Self {
            geometry,
            sample: TouchSample::default(),
        }
    }

    pub fn geometry(&self) -> &ControlSurfaceGeometry {
        &self.geometry
    }

    pub fn sample(&self) -> &TouchSample {
        &self.sample
    }

    pub fn is_active(&self) -> bool {
        self.sample.active
    }

    /// Feed one touch event, `position` relative to the field pivot
    pub fn handle(&mut self, phase: TouchPhase, position: Vec2, clamp: &ClampOptions) -> TouchUpdate {
        match phase {
            TouchPhase::Began if !self.sample.active => {
                if !self.geometry.contains(position) {
                    return TouchUpdate::Ignored;
                }
                debug!("Touch began at ({:.1}, {:.1})", position.x, position.y);
                self.sample = TouchSample::new(position, position);
                TouchUpdate::Started
            }
            TouchPhase::Moved if self.sample.active => {
                self.sample.end = position;
                let (left, right) = compute_motor_speeds(&self.sample, &self.geometry, clamp);
                TouchUpdate::Preview { left, right }
            }
            TouchPhase::Ended if self.sample.active => {
                self.sample.end = position;
                let (left, right) = compute_motor_speeds(&self.sample, &self.geometry, clamp);
                self.sample.active = false;
                debug!("Touch ended at ({:.1}, {:.1})", position.x, position.y);
                TouchUpdate::Released {
                    left,
                    right,
                    command: MotorCommand::speed(left, right),
                }
            }
            _ => TouchUpdate::Ignored,
        }
    }

    /// Drop the current gesture without sending; returns whether one was active
    pub fn cancel(&mut self) -> bool {
        let was_active = self.sample.active;
        self.sample.active = false;
        was_active
    }
}
