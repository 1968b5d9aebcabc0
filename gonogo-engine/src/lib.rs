pub mod classify;
pub mod config;
pub mod runner;

pub use classify::{NO_RESPONSE, Verdict, classify};
pub use config::{ConfigError, SessionDefinition};
pub use runner::{ResponseKey, SessionEvent, SessionRunner};
