use serde::{Deserialize, Serialize};

/// Multiplier from grid units to screen pixels.
pub const UNIT_TO_PIXELS: f32 = 50.0;

/// Fill color of the stimulus square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StimulusColor {
    Red,
    White,
}

/// Spatial and go/no-go properties of one trial, fixed at presentation time
/// and never re-evaluated mid-trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedStimulus {
    pub x: f32,
    pub y: f32,
    pub red: bool,
    /// Go condition ("ball"): the square sits at or beyond the grid edge, so
    /// a response counts against the player even though the fill is not red.
    pub go: bool,
}

impl ResolvedStimulus {
    pub fn new(x: f32, y: f32, red: bool) -> Self {
        Self {
            x,
            y,
            red,
            go: x.abs() >= 2.0 || y.abs() >= 2.0,
        }
    }

    /// Offset from screen center, in pixels.
    pub fn screen_offset(&self) -> (f32, f32) {
        (self.x * UNIT_TO_PIXELS, self.y * UNIT_TO_PIXELS)
    }

    pub fn color(&self) -> StimulusColor {
        if self.red {
            StimulusColor::Red
        } else {
            StimulusColor::White
        }
    }

    /// Responding is the correct behavior only when the square is neither
    /// red nor on the go condition.
    pub fn response_expected(&self) -> bool {
        !self.red && !self.go
    }
}
