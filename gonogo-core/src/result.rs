use crate::trial::SessionConfig;
use serde::{Deserialize, Serialize};

/// How a trial ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Responded inside the valid window, or correctly withheld on a red or
    /// go-condition square.
    Correct,
    /// A response was expected but none arrived before the window closed.
    Missed,
    /// Responded before the guess window elapsed.
    Guess,
    /// Responded after the validity window closed.
    TooSlow,
    /// Responded to a red square.
    HitRed,
    /// Responded to a square on the go condition.
    HitGo,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Outcome::Correct)
    }
}

/// Attributes of the trial as it was actually presented, kept alongside its
/// result. Positions are the resolved grid coordinates, not the configured
/// ones, so random trials record where the square really appeared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedTrial {
    pub duration: f32,
    pub position_x: f32,
    pub position_y: f32,
    pub red: bool,
}

/// One scored trial. `response_time == 0.0` is the sentinel for "no response
/// occurred"; `accuracy` is only present on successful outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialResult {
    #[serde(flatten)]
    pub trial: RecordedTrial,
    pub response_time: f32,
    pub outcome: Outcome,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f32>,
}

/// Accumulated results for one run, in trial order. Append-only while the
/// session is live, read-only once it finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub results: Vec<TrialResult>,
    pub score: u32,
    pub trials_completed: usize,
}

impl SessionState {
    /// Appends one result, counting it toward the integer score if it
    /// succeeded. Fractional accuracy never earns partial credit.
    pub fn record(&mut self, result: TrialResult) {
        if result.success {
            self.score += 1;
        }
        self.results.push(result);
    }
}

/// Document persisted at session end: the session rules the run was scored
/// under, flattened next to the per-trial results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    #[serde(flatten)]
    pub config: SessionConfig,
    #[serde(flatten)]
    pub state: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool) -> TrialResult {
        TrialResult {
            trial: RecordedTrial {
                duration: 1.0,
                position_x: 0.0,
                position_y: 0.0,
                red: false,
            },
            response_time: 0.5,
            outcome: if success {
                Outcome::Correct
            } else {
                Outcome::TooSlow
            },
            success,
            accuracy: success.then_some(0.625),
        }
    }

    #[test]
    fn score_counts_only_successes() {
        let mut state = SessionState::default();
        state.record(result(true));
        state.record(result(false));
        state.record(result(true));
        assert_eq!(state.score, 2);
        assert_eq!(state.results.len(), 3);
    }

    #[test]
    fn serialized_result_flattens_the_trial_attributes() {
        let value = serde_json::to_value(result(true)).unwrap();
        assert_eq!(value["duration"], 1.0);
        assert_eq!(value["positionX"], 0.0);
        assert_eq!(value["positionY"], 0.0);
        assert_eq!(value["red"], false);
        assert_eq!(value["responseTime"], 0.5);
        assert_eq!(value["outcome"], "correct");
        assert_eq!(value["success"], true);
    }

    #[test]
    fn accuracy_is_omitted_on_failures() {
        let value = serde_json::to_value(result(false)).unwrap();
        assert!(value.get("accuracy").is_none());
    }

    #[test]
    fn session_report_flattens_the_session_rules() {
        let mut state = SessionState::default();
        state.record(result(true));
        state.trials_completed = 1;
        let report = SessionReport {
            config: SessionConfig {
                guess_time_limit: 0.25,
                response_time_limit: 1.0,
                default_duration: 1.0,
            },
            state,
        };
        let value = serde_json::to_value(report).unwrap();
        assert_eq!(value["guessTimeLimit"], 0.25);
        assert_eq!(value["responseTimeLimit"], 1.0);
        assert_eq!(value["duration"], 1.0);
        assert_eq!(value["trialsCompleted"], 1);
        assert_eq!(value["results"][0]["positionX"], 0.0);
    }
}
