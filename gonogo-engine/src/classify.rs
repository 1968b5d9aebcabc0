use gonogo_core::{Outcome, ResolvedStimulus, SessionConfig};

/// Sentinel response time meaning no response arrived during the window.
pub const NO_RESPONSE: f32 = 0.0;

/// Verdict for one trial: the outcome category plus the fractional accuracy
/// score, which only exists for successful outcomes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub outcome: Outcome,
    pub accuracy: Option<f32>,
}

impl Verdict {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    fn success(session: &SessionConfig, duration: f32, response_time: f32) -> Self {
        Self {
            outcome: Outcome::Correct,
            accuracy: Some(accuracy(session, duration, response_time)),
        }
    }

    fn failure(outcome: Outcome) -> Self {
        Self {
            outcome,
            accuracy: None,
        }
    }
}

/// Maps a measured response time (or its absence) to an outcome. Pure: the
/// same inputs always produce the same verdict, and a trial is only ever
/// classified once.
pub fn classify(
    session: &SessionConfig,
    stimulus: &ResolvedStimulus,
    duration: f32,
    response_time: f32,
) -> Verdict {
    let response_expected = stimulus.response_expected();

    if response_time == NO_RESPONSE {
        if response_expected {
            Verdict::failure(Outcome::Missed)
        } else {
            // Correctly withheld on a red or go-condition square. The
            // accuracy formula is still evaluated at a zero response time.
            Verdict::success(session, duration, response_time)
        }
    } else if is_guess_response(session, response_time) {
        Verdict::failure(Outcome::Guess)
    } else if is_valid_response(session, response_time) {
        if response_expected {
            Verdict::success(session, duration, response_time)
        } else {
            Verdict::failure(hit_outcome(stimulus))
        }
    } else if response_expected {
        Verdict::failure(Outcome::TooSlow)
    } else {
        Verdict::failure(hit_outcome(stimulus))
    }
}

/// Red takes precedence over the go condition when both disqualify a
/// response.
fn hit_outcome(stimulus: &ResolvedStimulus) -> Outcome {
    if stimulus.red {
        Outcome::HitRed
    } else {
        Outcome::HitGo
    }
}

/// A response earlier than the guess limit is a guess. The limit itself is
/// not: the comparison is strict.
pub fn is_guess_response(session: &SessionConfig, response_time: f32) -> bool {
    session.guess_time_limit > 0.0 && response_time < session.guess_time_limit
}

/// A response is valid strictly before the response time limit; the limit
/// itself is already too slow. A limit of zero leaves the window unbounded.
pub fn is_valid_response(session: &SessionConfig, response_time: f32) -> bool {
    session.response_time_limit <= 0.0 || response_time < session.response_time_limit
}

/// Linear accuracy over the usable window: 1 at the guess limit, 0 at the
/// window end. Load-time validation guarantees the window strictly exceeds
/// the guess limit, so the denominator is never zero.
pub fn accuracy(session: &SessionConfig, duration: f32, response_time: f32) -> f32 {
    let total_window = if session.response_time_limit > 0.0 {
        session.response_time_limit
    } else {
        duration
    };
    1.0 - (response_time - session.guess_time_limit) / (total_window - session.guess_time_limit)
}
