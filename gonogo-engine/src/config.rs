use gonogo_core::{SessionConfig, TrialConfig};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A full session document: the shared timing rules plus the ordered trial
/// list. Loading validates every invariant up front; nothing fails mid-trial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefinition {
    pub config: SessionConfig,
    pub trials: Vec<TrialConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read session file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed session document")]
    Parse(#[from] serde_json::Error),
    #[error("session `{field}` must not be negative (got {value})")]
    NegativeSession { field: &'static str, value: f32 },
    #[error("trial {index}: `{field}` must not be negative (got {value})")]
    NegativeTrial {
        index: usize,
        field: &'static str,
        value: f32,
    },
    #[error(
        "trial {index}: effective response window {window}s must exceed the \
         guess limit {guess}s, accuracy would be undefined"
    )]
    DegenerateWindow {
        index: usize,
        window: f32,
        guess: f32,
    },
}

impl SessionDefinition {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, ConfigError> {
        let definition: SessionDefinition = serde_json::from_reader(reader)?;
        definition.into_validated()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let definition: SessionDefinition = serde_json::from_str(json)?;
        definition.into_validated()
    }

    /// Applies session defaults to trials that omit a duration, then checks
    /// every load-time invariant.
    fn into_validated(mut self) -> Result<Self, ConfigError> {
        check_session("guessTimeLimit", self.config.guess_time_limit)?;
        check_session("responseTimeLimit", self.config.response_time_limit)?;
        check_session("duration", self.config.default_duration)?;

        for (index, trial) in self.trials.iter_mut().enumerate() {
            if trial.duration.is_none() {
                trial.duration = Some(self.config.default_duration);
            }
            check_trial(index, "delay", trial.delay)?;
            let duration = trial.duration_or_default(&self.config);
            check_trial(index, "duration", duration)?;

            // The accuracy denominator is (window - guess limit); a window
            // at or below the guess limit would divide by zero or flip sign.
            let window = if self.config.response_time_limit > 0.0 {
                self.config.response_time_limit
            } else {
                duration
            };
            if window <= self.config.guess_time_limit {
                return Err(ConfigError::DegenerateWindow {
                    index,
                    window,
                    guess: self.config.guess_time_limit,
                });
            }
        }

        Ok(self)
    }
}

fn check_session(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value < 0.0 {
        return Err(ConfigError::NegativeSession { field, value });
    }
    Ok(())
}

fn check_trial(index: usize, field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value < 0.0 {
        return Err(ConfigError::NegativeTrial {
            index,
            field,
            value,
        });
    }
    Ok(())
}
