use anyhow::Result;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use gonogo_core::{Outcome, SessionState, StimulusColor, UNIT_TO_PIXELS};
use gonogo_engine::{ResponseKey, SessionDefinition, SessionEvent, SessionRunner};
use gonogo_timing::{HighPrecisionTimer, Timer};
use rand::rngs::ThreadRng;
use std::io::{Write, stdout};
use std::time::Duration;

const INSTRUCTIONS: &str = "Press SPACE as soon as you see the square. ESC quits.";
const RESPONSE_CORRECT: &str = "Good!";
const RESPONSE_GUESS: &str = "No Guessing!";
const RESPONSE_TIMEOUT: &str = "Missed it!";
const RESPONSE_SLOW: &str = "Too Slow!";
const RESPONSE_HIT_RED: &str = "Don't hit RED!";
const RESPONSE_HIT_BALL: &str = "Don't hit BALL!";

/// Terminal cells covered by one grid unit. Cells are roughly twice as tall
/// as they are wide, so the square stays square-ish on screen.
const COLS_PER_UNIT: f32 = 4.0;
const ROWS_PER_UNIT: f32 = 2.0;

/// How often the runner is polled while waiting on a trial boundary.
const POLL_INTERVAL: Duration = Duration::from_millis(2);

pub struct RunReport {
    pub state: SessionState,
    pub completed: bool,
}

/// Terminal host for one session: raw-mode keyboard in, colored block out.
pub struct App {
    runner: SessionRunner<HighPrecisionTimer, ThreadRng>,
    timer: HighPrecisionTimer,
    total_trials: usize,
    scored: usize,
}

impl App {
    pub fn new(definition: SessionDefinition) -> Self {
        let total_trials = definition.trials.len();
        let timer = HighPrecisionTimer::new();
        let runner = SessionRunner::new(definition, timer.clone(), rand::rng());
        Self {
            runner,
            timer,
            total_trials,
            scored: 0,
        }
    }

    pub fn run(mut self) -> Result<RunReport> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), EnterAlternateScreen, Hide)?;
        let outcome = self.event_loop();
        execute!(stdout(), LeaveAlternateScreen, Show, ResetColor)?;
        terminal::disable_raw_mode()?;
        outcome?;

        let completed = self.runner.is_finished();
        Ok(RunReport {
            state: self.runner.into_state(),
            completed,
        })
    }

    fn event_loop(&mut self) -> Result<()> {
        self.draw_chrome(None)?;
        loop {
            let events = self.runner.update();
            self.apply(events)?;
            if self.runner.is_finished() {
                return Ok(());
            }

            // Drain pending input without blocking. Keys pressed during a
            // delay still get read here, so they are consumed (and ignored
            // by the runner) instead of lingering until the window arms.
            if event::poll(Duration::ZERO)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char(' ') => {
                            let events = self.runner.player_responded(ResponseKey::Space);
                            self.apply(events)?;
                        }
                        KeyCode::Esc => {
                            let events = self.runner.abort();
                            self.apply(events)?;
                            return Ok(());
                        }
                        _ => {
                            let events = self.runner.player_responded(ResponseKey::Other);
                            self.apply(events)?;
                        }
                    }
                }
            } else {
                self.timer.sleep(POLL_INTERVAL);
            }
        }
    }

    fn apply(&mut self, events: Vec<SessionEvent>) -> Result<()> {
        for event in events {
            match event {
                SessionEvent::StimulusShown { offset, color } => {
                    self.draw_stimulus(offset, color)?;
                }
                SessionEvent::StimulusHidden => self.draw_chrome(None)?,
                SessionEvent::TrialScored(result) => {
                    self.scored += 1;
                    self.draw_chrome(Some(feedback(result.outcome)))?;
                }
                SessionEvent::SessionFinished => {}
            }
        }
        Ok(())
    }

    /// Clears the screen and redraws the static text, optionally with a
    /// feedback line for the last trial.
    fn draw_chrome(&mut self, feedback: Option<(&str, bool)>) -> Result<()> {
        let mut out = stdout();
        execute!(
            out,
            Clear(ClearType::All),
            ResetColor,
            MoveTo(2, 1),
            Print(INSTRUCTIONS),
            MoveTo(2, 2),
            Print(format!(
                "Trial {} / {}",
                (self.scored + 1).min(self.total_trials.max(1)),
                self.total_trials
            ))
        )?;
        if let Some((text, good)) = feedback {
            let color = if good { Color::Green } else { Color::Red };
            execute!(
                out,
                MoveTo(2, 4),
                SetForegroundColor(color),
                Print(text),
                ResetColor
            )?;
        }
        out.flush()?;
        Ok(())
    }

    fn draw_stimulus(&mut self, offset: (f32, f32), color: StimulusColor) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let center = (cols as i32 / 2, rows as i32 / 2);
        let col = center.0 + (offset.0 / UNIT_TO_PIXELS * COLS_PER_UNIT) as i32;
        // Terminal rows grow downward.
        let row = center.1 - (offset.1 / UNIT_TO_PIXELS * ROWS_PER_UNIT) as i32;
        let fill = match color {
            StimulusColor::Red => Color::Red,
            StimulusColor::White => Color::White,
        };

        let mut out = stdout();
        for dy in 0..2 {
            let r = (row + dy).clamp(0, rows as i32 - 1) as u16;
            let c = col.clamp(0, (cols as i32 - 4).max(0)) as u16;
            execute!(
                out,
                MoveTo(c, r),
                SetForegroundColor(fill),
                Print("████"),
                ResetColor
            )?;
        }
        out.flush()?;
        Ok(())
    }
}

fn feedback(outcome: Outcome) -> (&'static str, bool) {
    match outcome {
        Outcome::Correct => (RESPONSE_CORRECT, true),
        Outcome::Missed => (RESPONSE_TIMEOUT, false),
        Outcome::Guess => (RESPONSE_GUESS, false),
        Outcome::TooSlow => (RESPONSE_SLOW, false),
        Outcome::HitRed => (RESPONSE_HIT_RED, false),
        Outcome::HitGo => (RESPONSE_HIT_BALL, false),
    }
}
