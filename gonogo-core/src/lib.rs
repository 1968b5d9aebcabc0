pub mod result;
pub mod stimulus;
pub mod trial;

pub use result::{Outcome, RecordedTrial, SessionReport, SessionState, TrialResult};
pub use stimulus::{ResolvedStimulus, StimulusColor, UNIT_TO_PIXELS};
pub use trial::{PositionMode, SessionConfig, TrialConfig, TrialPhase};
