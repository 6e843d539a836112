// Drive control module for the two-motor robot
//
// Provides:
// - 2D vector helpers for the circular touch field
// - Touch gesture -> differential drive speed mapping
// - Per-gesture touch tracking

pub mod geometry;
pub mod interpreter;
mod touch;

pub use geometry::Vec2;
pub use interpreter::{
    ClampOptions, ControlSurfaceGeometry, GeometryError, TouchSample, compute_motor_speeds,
};
pub use touch::{TouchPhase, TouchTracker, TouchUpdate};
