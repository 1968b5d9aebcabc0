use serde::{Deserialize, Serialize};

/// Phases a single trial moves through, in order. `Settled` is transient
/// bookkeeping between the response window closing and the next trial
/// starting; a host polling the runner will normally only observe the
/// other three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPhase {
    Idle,
    Delayed,
    Armed,
    Settled,
}

/// How the stimulus position is chosen at presentation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionMode {
    Random,
    Predefined,
}

impl Default for PositionMode {
    fn default() -> Self {
        PositionMode::Random
    }
}

/// Session-wide timing rules, immutable once loaded. All times are seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Responses earlier than this are penalized as guesses. 0 disables the
    /// guess window.
    #[serde(default)]
    pub guess_time_limit: f32,
    /// Responses at or after this are too slow. 0 leaves the response window
    /// bounded only by the stimulus duration.
    #[serde(default)]
    pub response_time_limit: f32,
    /// Stimulus duration for trials that do not set their own.
    #[serde(default, rename = "duration")]
    pub default_duration: f32,
}

/// Parameters of one trial, immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialConfig {
    /// Seconds the stimulus stays hidden after the trial starts.
    #[serde(default)]
    pub delay: f32,
    /// Seconds the stimulus stays visible. `None` falls back to the session
    /// default at load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f32>,
    #[serde(default)]
    pub position: PositionMode,
    /// Grid position, used only in `Predefined` mode.
    #[serde(default)]
    pub position_x: f32,
    #[serde(default)]
    pub position_y: f32,
    /// Red squares must not be responded to.
    #[serde(default)]
    pub red: bool,
}

impl TrialConfig {
    /// Stimulus duration with the session default applied.
    pub fn duration_or_default(&self, session: &SessionConfig) -> f32 {
        self.duration.unwrap_or(session.default_duration)
    }
}
