// Touch field -> differential drive speeds
//
// The drag length sets the power, the end position relative to the field's
// pivot sets the turn bias (left/right) and the direction (forward/back).

use super::geometry::{Vec2, approximately, cross_normalized, dot_normalized, neg};
use crate::messages::MAX_SPEED_PERCENT;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("Touch field height must be finite and positive, got {0}")]
    InvalidHeight(f32),
}

/// Read-only geometry of the touch field, computed once from its bounds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlSurfaceGeometry {
    top_center_offset: Vec2,
    normalizer: f32,
}

impl ControlSurfaceGeometry {
    pub fn from_height(height: f32) -> Result<Self, GeometryError> {
        if !height.is_finite() || height <= 0.0 {
            return Err(GeometryError::InvalidHeight(height));
        }

        Ok(Self {
            top_center_offset: Vec2::new(0.0, height),
            normalizer: height / 2.0,
        })
    }

    /// Offset from the pivot to the top-center of the field ("up")
    pub fn top_center_offset(&self) -> Vec2 {
        self.top_center_offset
    }

    pub fn height(&self) -> f32 {
        self.top_center_offset.y
    }

    /// Half of the field height; a drag of a quarter height is full power
    pub fn normalizer(&self) -> f32 {
        self.normalizer
    }

    /// Whether a pivot-relative point lies on the circular field
    pub fn contains(&self, point: Vec2) -> bool {
        point.length() <= self.normalizer
    }
}

/// One touch gesture, positions relative to the field pivot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TouchSample {
    pub start: Vec2,
    pub end: Vec2,
    pub active: bool,
}

impl TouchSample {
    pub fn new(start: Vec2, end: Vec2) -> Self {
        Self {
            start,
            end,
            active: true,
        }
    }
}

/// Optional post-processing of the raw motor values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampOptions {
    pub to_interval: bool,
    pub to_each_other: bool,
    /// Percent
    pub delta: f32,
}

impl Default for ClampOptions {
    fn default() -> Self {
        Self {
            to_interval: false,
            to_each_other: false,
            delta: crate::config::DEFAULT_CLAMP_DELTA,
        }
    }
}

impl ClampOptions {
    /// Apply the enabled clamps to fractional motor values (-1..=1)
    ///
    /// `direction` is the vertical deviation: positive snaps close values
    /// up to their max, negative snaps them down to their min.
    pub fn apply(&self, (mut left, mut right): (f32, f32), direction: f32) -> (f32, f32) {
        let delta = self.delta / 100.0;

        if self.to_interval && delta > 0.0 {
            left = (left / delta).round_ties_even() * delta;
            right = (right / delta).round_ties_even() * delta;
        }

        if self.to_each_other {
            if approximately(left, 0.0, delta) && approximately(right, 0.0, delta) {
                left = 0.0;
                right = 0.0;
            } else if approximately(left, right, delta) {
                if direction > 0.0 {
                    let max = left.max(right);
                    (left, right) = (max, max);
                } else if direction < 0.0 {
                    let min = left.min(right);
                    (left, right) = (min, min);
                }
            }
        }

        (left, right)
    }
}

/// Drag length relative to the field, unclamped
pub fn drag_distance(sample: &TouchSample, geometry: &ControlSurfaceGeometry) -> f32 {
    sample.start.distance(sample.end) * 2.0 / geometry.normalizer
}

/// Pointer position relative to the field's up direction
///
/// x < 0: left of center, x > 0: right of center.
/// y in -1..=1: 1 straight up, 0 level with the pivot, -1 straight down.
pub fn pointer_deviation(end: Vec2, geometry: &ControlSurfaceGeometry) -> Vec2 {
    let up = geometry.top_center_offset;
    Vec2::new(
        -cross_normalized(up, end).y,
        dot_normalized(up, end).clamp(-1.0, 1.0),
    )
}

/// Fraction (-1..=1) to truncated percent
pub fn to_percent(value: f32) -> i8 {
    let max = f32::from(MAX_SPEED_PERCENT);
    // NaN casts to 0
    (value * 100.0).clamp(-max, max) as i8
}

/// Compute (left, right) motor speeds in percent for a gesture
///
/// A zero-length drag yields (0, 0); callers must send that as Stop.
pub fn compute_motor_speeds(
    sample: &TouchSample,
    geometry: &ControlSurfaceGeometry,
    clamp: &ClampOptions,
) -> (i8, i8) {
    let power = drag_distance(sample, geometry).clamp(0.0, 1.0);
    let (mut left, mut right) = (power, power);

    let deviation = pointer_deviation(sample.end, geometry);
    if deviation.x < 0.0 {
        left *= deviation.y;
    } else if deviation.x > 0.0 {
        right *= deviation.y;
    }

    // Below center: run backwards
    if deviation.y < 0.0 {
        left = neg(left);
        right = neg(right);
    }

    let (left, right) = clamp.apply((left, right), deviation.y);
    (to_percent(left), to_percent(right))
}
