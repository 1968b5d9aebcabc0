use crate::classify::{NO_RESPONSE, classify};
use crate::config::SessionDefinition;
use gonogo_core::{
    PositionMode, RecordedTrial, ResolvedStimulus, SessionConfig, SessionState, StimulusColor,
    TrialConfig, TrialPhase, TrialResult,
};
use gonogo_timing::Timer;
use rand::Rng;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

fn secs_to_ns(secs: f32) -> u64 {
    (secs as f64 * NANOS_PER_SEC) as u64
}

fn ns_to_secs(ns: u64) -> f32 {
    (ns as f64 / NANOS_PER_SEC) as f32
}

/// Key reported by the host's input layer. Only `Space` ever counts as a
/// response; everything else is swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKey {
    Space,
    Other,
}

/// Signals the runner hands back to its host, in the order they occur.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The stimulus became visible: offset from screen center in pixels,
    /// plus the fill color.
    StimulusShown {
        offset: (f32, f32),
        color: StimulusColor,
    },
    StimulusHidden,
    /// A trial was classified; fired exactly once per trial.
    TrialScored(TrialResult),
    /// The last trial settled and the session state is final. Never fired
    /// for an aborted session.
    SessionFinished,
}

/// Where the in-flight trial currently is. Armed carries the stimulus it
/// resolved on entry, so mid-trial nothing is re-derived.
#[derive(Debug, Clone, Copy)]
enum ActivePhase {
    Delayed { since: u64 },
    Armed { since: u64, stimulus: ResolvedStimulus },
}

#[derive(Debug, Clone)]
struct ActiveTrial {
    config: TrialConfig,
    duration: f32,
    phase: ActivePhase,
}

/// Drives one session of trials, strictly sequentially. The host polls
/// [`update`](Self::update) between timer sleeps and forwards key presses to
/// [`player_responded`](Self::player_responded); both return the
/// presentation and scoring events that occurred.
pub struct SessionRunner<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    session: SessionConfig,
    trials: Vec<TrialConfig>,
    timer: T,
    rng: R,
    current: Option<ActiveTrial>,
    next_trial: usize,
    state: SessionState,
    finished: bool,
    aborted: bool,
}

impl<T, R> SessionRunner<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(definition: SessionDefinition, timer: T, rng: R) -> Self {
        Self {
            session: definition.config,
            trials: definition.trials,
            timer,
            rng,
            current: None,
            next_trial: 0,
            state: SessionState::default(),
            finished: false,
            aborted: false,
        }
    }

    /// Advances the trial clock. Zero-length delays and durations cascade,
    /// so one poll keeps stepping (arm, settle, next trial) until a boundary
    /// that is still in the future blocks it.
    pub fn update(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.finished || self.aborted {
            return events;
        }
        let now = self.timer.now();

        if self.current.is_none() {
            self.begin_next_trial(now, &mut events);
        }

        loop {
            let Some(trial) = self.current.as_ref() else {
                break;
            };
            let phase = trial.phase;
            let delay = trial.config.delay;
            let duration = trial.duration;

            match phase {
                ActivePhase::Delayed { since }
                    if now.saturating_sub(since) >= secs_to_ns(delay) =>
                {
                    self.arm_current(now, &mut events);
                }
                ActivePhase::Armed { since, .. }
                    if now.saturating_sub(since) >= secs_to_ns(duration) =>
                {
                    events.push(SessionEvent::StimulusHidden);
                    self.settle_current(NO_RESPONSE, now, &mut events);
                }
                _ => break,
            }
        }

        events
    }

    /// Host callback for a key press. Honored only while a stimulus window
    /// is armed; during `Idle`, the delay, after the session finished, or
    /// for any key other than Space the press is silently ignored.
    pub fn player_responded(&mut self, key: ResponseKey) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if key != ResponseKey::Space || self.finished || self.aborted {
            return events;
        }
        let Some(trial) = self.current.as_ref() else {
            return events;
        };
        if let ActivePhase::Armed { since, .. } = trial.phase {
            let now = self.timer.now();
            let response_time = ns_to_secs(now.saturating_sub(since));
            events.push(SessionEvent::StimulusHidden);
            self.settle_current(response_time, now, &mut events);
        }
        events
    }

    /// Tears down the in-flight trial without scoring it. Results already
    /// recorded are kept; no further trials run.
    pub fn abort(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if let Some(trial) = self.current.take() {
            if matches!(trial.phase, ActivePhase::Armed { .. }) {
                events.push(SessionEvent::StimulusHidden);
            }
        }
        if !self.finished {
            self.aborted = true;
        }
        events
    }

    fn begin_next_trial(&mut self, now: u64, events: &mut Vec<SessionEvent>) {
        if self.next_trial < self.trials.len() {
            let config = self.trials[self.next_trial].clone();
            self.next_trial += 1;
            let duration = config.duration_or_default(&self.session);
            self.current = Some(ActiveTrial {
                config,
                duration,
                phase: ActivePhase::Delayed { since: now },
            });
        } else {
            self.finish(events);
        }
    }

    /// Delay expired: resolve the stimulus for this trial instance, show it,
    /// and start the response clock.
    fn arm_current(&mut self, now: u64, events: &mut Vec<SessionEvent>) {
        if let Some(trial) = self.current.as_mut() {
            let stimulus = resolve_stimulus(&trial.config, &mut self.rng);
            trial.phase = ActivePhase::Armed { since: now, stimulus };
            events.push(SessionEvent::StimulusShown {
                offset: stimulus.screen_offset(),
                color: stimulus.color(),
            });
        }
    }

    /// Classifies the armed trial exactly once (response or timeout), records
    /// the result, and moves on to the next trial.
    fn settle_current(&mut self, response_time: f32, now: u64, events: &mut Vec<SessionEvent>) {
        let Some(trial) = self.current.take() else {
            return;
        };
        let ActivePhase::Armed { stimulus, .. } = trial.phase else {
            return;
        };

        let verdict = classify(&self.session, &stimulus, trial.duration, response_time);
        let result = TrialResult {
            trial: RecordedTrial {
                duration: trial.duration,
                position_x: stimulus.x,
                position_y: stimulus.y,
                red: stimulus.red,
            },
            response_time,
            outcome: verdict.outcome,
            success: verdict.is_success(),
            accuracy: verdict.accuracy,
        };
        self.state.record(result.clone());
        events.push(SessionEvent::TrialScored(result));

        self.begin_next_trial(now, events);
    }

    fn finish(&mut self, events: &mut Vec<SessionEvent>) {
        if !self.finished {
            self.finished = true;
            self.state.trials_completed = self.state.results.len();
            events.push(SessionEvent::SessionFinished);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    pub fn phase(&self) -> TrialPhase {
        match &self.current {
            Some(trial) => match trial.phase {
                ActivePhase::Delayed { .. } => TrialPhase::Delayed,
                ActivePhase::Armed { .. } => TrialPhase::Armed,
            },
            None => TrialPhase::Idle,
        }
    }

    /// The stimulus currently on screen, if any.
    pub fn current_stimulus(&self) -> Option<&ResolvedStimulus> {
        match &self.current {
            Some(ActiveTrial {
                phase: ActivePhase::Armed { stimulus, .. },
                ..
            }) => Some(stimulus),
            _ => None,
        }
    }

    /// (trials scored so far, total trials).
    pub fn trial_progress(&self) -> (usize, usize) {
        (self.state.results.len(), self.trials.len())
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }
}

/// Resolves the spatial and go/no-go properties for one trial instance.
fn resolve_stimulus<R: Rng>(trial: &TrialConfig, rng: &mut R) -> ResolvedStimulus {
    let (x, y) = match trial.position {
        PositionMode::Predefined => (trial.position_x, trial.position_y),
        PositionMode::Random => {
            // Half-open draw: -2, -1, 0 or 1 per axis. A random trial can
            // therefore never land on the go condition; only curated
            // predefined trials reach it.
            let x = rng.random_range(-2..2);
            let y = rng.random_range(-2..2);
            (x as f32, y as f32)
        }
    };
    ResolvedStimulus::new(x, y, trial.red)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gonogo_core::Outcome;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct ManualTimer {
        now_ns: Arc<AtomicU64>,
    }

    impl ManualTimer {
        fn advance(&self, secs: f32) {
            self.now_ns.fetch_add(secs_to_ns(secs), Ordering::SeqCst);
        }
    }

    impl Timer for ManualTimer {
        type Timestamp = u64;

        fn now(&self) -> u64 {
            self.now_ns.load(Ordering::SeqCst)
        }

        fn elapsed(&self, ts: u64) -> Duration {
            Duration::from_nanos(self.now().saturating_sub(ts))
        }

        fn sleep(&self, _d: Duration) {}
    }

    fn session() -> SessionConfig {
        SessionConfig {
            guess_time_limit: 0.2,
            response_time_limit: 1.0,
            default_duration: 1.0,
        }
    }

    fn plain_trial(delay: f32) -> TrialConfig {
        TrialConfig {
            delay,
            duration: None,
            position: PositionMode::Predefined,
            position_x: 0.0,
            position_y: 0.0,
            red: false,
        }
    }

    fn red_trial(delay: f32) -> TrialConfig {
        TrialConfig {
            red: true,
            ..plain_trial(delay)
        }
    }

    fn runner(
        trials: Vec<TrialConfig>,
    ) -> (SessionRunner<ManualTimer, StdRng>, ManualTimer) {
        let timer = ManualTimer::default();
        let definition = SessionDefinition {
            config: session(),
            trials,
        };
        let runner = SessionRunner::new(definition, timer.clone(), StdRng::seed_from_u64(7));
        (runner, timer)
    }

    fn scored(events: &[SessionEvent]) -> Vec<&TrialResult> {
        events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::TrialScored(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn stimulus_appears_only_after_the_delay() {
        let (mut runner, timer) = runner(vec![plain_trial(0.5)]);
        assert!(runner.update().is_empty());
        assert_eq!(runner.phase(), TrialPhase::Delayed);

        timer.advance(0.25);
        assert!(runner.update().is_empty());

        timer.advance(0.25);
        let events = runner.update();
        assert_eq!(
            events,
            vec![SessionEvent::StimulusShown {
                offset: (0.0, 0.0),
                color: StimulusColor::White,
            }]
        );
        assert_eq!(runner.phase(), TrialPhase::Armed);
        assert!(runner.current_stimulus().is_some());
    }

    #[test]
    fn response_settles_the_trial_immediately() {
        let (mut runner, timer) = runner(vec![plain_trial(0.5)]);
        runner.update();
        timer.advance(0.5);
        runner.update();

        timer.advance(0.5);
        let events = runner.player_responded(ResponseKey::Space);
        assert_eq!(events[0], SessionEvent::StimulusHidden);
        let results = scored(&events);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].outcome, Outcome::Correct);
        assert!((results[0].response_time - 0.5).abs() < 1e-6);
        assert!((results[0].accuracy.unwrap() - 0.625).abs() < 1e-6);
        assert_eq!(events.last(), Some(&SessionEvent::SessionFinished));
        assert!(runner.is_finished());
    }

    #[test]
    fn timeout_scores_a_no_response() {
        let (mut runner, timer) = runner(vec![red_trial(0.5)]);
        runner.update();
        timer.advance(0.5);
        runner.update();

        timer.advance(1.0);
        let events = runner.update();
        assert_eq!(events[0], SessionEvent::StimulusHidden);
        let results = scored(&events);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].response_time, NO_RESPONSE);
        assert_eq!(results[0].outcome, Outcome::Correct);
        assert!(results[0].success);
    }

    #[test]
    fn input_during_the_delay_is_ignored() {
        let (mut runner, timer) = runner(vec![plain_trial(0.5)]);
        runner.update();
        timer.advance(0.25);
        assert!(runner.player_responded(ResponseKey::Space).is_empty());

        // The trial still runs its full course and is scored exactly once.
        timer.advance(0.25);
        runner.update();
        timer.advance(1.0);
        let events = runner.update();
        assert_eq!(scored(&events).len(), 1);
        assert_eq!(runner.state().results.len(), 1);
    }

    #[test]
    fn non_space_keys_are_ignored() {
        let (mut runner, timer) = runner(vec![plain_trial(0.0)]);
        runner.update();
        timer.advance(0.5);
        assert!(runner.player_responded(ResponseKey::Other).is_empty());
        assert_eq!(runner.phase(), TrialPhase::Armed);
    }

    #[test]
    fn second_response_in_the_same_window_is_ignored() {
        let (mut runner, timer) = runner(vec![plain_trial(0.0), plain_trial(5.0)]);
        runner.update();
        timer.advance(0.5);
        let events = runner.player_responded(ResponseKey::Space);
        assert_eq!(scored(&events).len(), 1);

        // The next trial is still in its delay; the repeat press goes nowhere.
        assert!(runner.player_responded(ResponseKey::Space).is_empty());
        assert_eq!(runner.state().results.len(), 1);
    }

    #[test]
    fn input_after_the_session_finished_is_ignored() {
        let (mut runner, timer) = runner(vec![plain_trial(0.0)]);
        runner.update();
        timer.advance(1.0);
        runner.update();
        assert!(runner.is_finished());
        assert!(runner.player_responded(ResponseKey::Space).is_empty());
        assert!(runner.update().is_empty());
    }

    #[test]
    fn zero_delay_arms_on_the_first_update() {
        let (mut runner, _timer) = runner(vec![plain_trial(0.0)]);
        let events = runner.update();
        assert!(matches!(events[0], SessionEvent::StimulusShown { .. }));
    }

    #[test]
    fn a_late_poll_arms_from_the_poll_instant() {
        let (mut runner, timer) = runner(vec![plain_trial(0.5)]);
        runner.update();

        // The host overslept the whole delay; the response clock still only
        // starts when the stimulus actually comes up.
        timer.advance(2.0);
        let events = runner.update();
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, SessionEvent::StimulusShown { .. }))
                .count(),
            1
        );
        assert_eq!(scored(&events).len(), 0);

        timer.advance(1.0);
        let events = runner.update();
        assert_eq!(events[0], SessionEvent::StimulusHidden);
        assert_eq!(scored(&events)[0].response_time, NO_RESPONSE);
    }

    #[test]
    fn zero_duration_windows_cascade_within_one_poll() {
        let trials = vec![TrialConfig {
            duration: Some(0.0),
            red: true,
            ..plain_trial(0.0)
        }];
        let definition = SessionDefinition {
            config: SessionConfig {
                guess_time_limit: 0.0,
                response_time_limit: 1.0,
                default_duration: 1.0,
            },
            trials,
        };
        let mut runner =
            SessionRunner::new(definition, ManualTimer::default(), StdRng::seed_from_u64(7));
        let events = runner.update();
        assert!(matches!(events[0], SessionEvent::StimulusShown { .. }));
        assert_eq!(events[1], SessionEvent::StimulusHidden);
        assert_eq!(scored(&events).len(), 1);
        assert!(runner.is_finished());
    }

    #[test]
    fn results_keep_trial_order_and_tally_the_score() {
        let trials = vec![plain_trial(0.1), red_trial(0.1), plain_trial(0.1)];
        let (mut runner, timer) = runner(trials);

        let mut all_events = Vec::new();
        // Trial 1: respond validly. Trial 2 (red): withhold. Trial 3: let it
        // time out.
        runner.update();
        timer.advance(0.1);
        all_events.extend(runner.update());
        timer.advance(0.5);
        all_events.extend(runner.player_responded(ResponseKey::Space));

        timer.advance(0.1);
        all_events.extend(runner.update());
        timer.advance(1.0);
        all_events.extend(runner.update());

        timer.advance(0.1);
        all_events.extend(runner.update());
        timer.advance(1.0);
        all_events.extend(runner.update());

        assert!(runner.is_finished());
        let state = runner.state();
        assert_eq!(state.results.len(), 3);
        assert_eq!(state.trials_completed, 3);
        assert_eq!(
            state.results.iter().map(|r| r.trial.red).collect::<Vec<_>>(),
            vec![false, true, false]
        );
        assert_eq!(
            state
                .results
                .iter()
                .map(|r| r.outcome)
                .collect::<Vec<_>>(),
            vec![Outcome::Correct, Outcome::Correct, Outcome::Missed]
        );
        assert_eq!(state.score, 2);
        assert_eq!(
            state.score as usize,
            state.results.iter().filter(|r| r.success).count()
        );
        assert_eq!(
            all_events
                .iter()
                .filter(|e| matches!(e, SessionEvent::SessionFinished))
                .count(),
            1
        );
    }

    #[test]
    fn abort_discards_the_inflight_trial() {
        let (mut runner, timer) = runner(vec![plain_trial(0.0), plain_trial(0.0)]);
        runner.update();
        timer.advance(0.5);
        runner.player_responded(ResponseKey::Space);
        runner.update();

        // Second trial is armed now; abort must not score it.
        let events = runner.abort();
        assert_eq!(events, vec![SessionEvent::StimulusHidden]);
        assert!(runner.is_aborted());
        assert!(!runner.is_finished());
        assert_eq!(runner.state().results.len(), 1);
        assert!(runner.update().is_empty());
    }

    #[test]
    fn empty_sessions_finish_immediately() {
        let (mut runner, _timer) = runner(vec![]);
        let events = runner.update();
        assert_eq!(events, vec![SessionEvent::SessionFinished]);
        assert_eq!(runner.state().trials_completed, 0);
    }

    #[test]
    fn random_positions_stay_inside_the_half_open_range() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = TrialConfig {
            position: PositionMode::Random,
            ..plain_trial(0.0)
        };
        for _ in 0..200 {
            let stimulus = resolve_stimulus(&config, &mut rng);
            assert!((-2.0..2.0).contains(&stimulus.x));
            assert!((-2.0..2.0).contains(&stimulus.y));
            assert_eq!(stimulus.x.fract(), 0.0);
            assert_eq!(stimulus.y.fract(), 0.0);
            assert!(!stimulus.go, "random draws can never reach the go edge");
        }
    }

    #[test]
    fn predefined_positions_are_used_verbatim() {
        let mut rng = StdRng::seed_from_u64(42);
        let config = TrialConfig {
            position: PositionMode::Predefined,
            position_x: 2.0,
            position_y: -1.0,
            ..plain_trial(0.0)
        };
        let stimulus = resolve_stimulus(&config, &mut rng);
        assert_eq!((stimulus.x, stimulus.y), (2.0, -1.0));
        assert!(stimulus.go);
    }
}
