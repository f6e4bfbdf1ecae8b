//! Session configuration
//!
//! Defaults match the production funnel; every value can be overridden from
//! the environment.

use crate::script::{Script, ScriptError};
use crate::state_machine::{FlowContext, Timing};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const TYPING_DELAY_ENV: &str = "FUNNEL_TYPING_DELAY_MS";
pub const OPENING_PAUSE_ENV: &str = "FUNNEL_OPENING_PAUSE_MS";
pub const READ_DELAY_ENV: &str = "FUNNEL_READ_DELAY_MS";
pub const HANDOFF_URI_ENV: &str = "FUNNEL_HANDOFF_URI";
pub const SCRIPT_PATH_ENV: &str = "FUNNEL_SCRIPT_PATH";

/// Default outbound link opened by the call to action
pub const DEFAULT_HANDOFF_URI: &str =
    "https://wa.me/?text=Olá! Gostaria de saber mais sobre os produtos virais com IA.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} (expected milliseconds)")]
    InvalidMillis { name: &'static str, value: String },
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunnelConfig {
    pub timing: Timing,
    pub handoff_uri: String,
    /// JSON script to run instead of the built-in one
    pub script_path: Option<PathBuf>,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            timing: Timing::default(),
            handoff_uri: DEFAULT_HANDOFF_URI.to_string(),
            script_path: None,
        }
    }
}

impl FunnelConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let millis = |name: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            match lookup(name) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidMillis { name, value }),
            }
        };

        Ok(Self {
            timing: Timing {
                typing: millis(TYPING_DELAY_ENV, defaults.timing.typing)?,
                opening_pause: millis(OPENING_PAUSE_ENV, defaults.timing.opening_pause)?,
                read_receipt: millis(READ_DELAY_ENV, defaults.timing.read_receipt)?,
            },
            handoff_uri: lookup(HANDOFF_URI_ENV)
                .filter(|uri| !uri.trim().is_empty())
                .unwrap_or(defaults.handoff_uri),
            script_path: lookup(SCRIPT_PATH_ENV)
                .filter(|path| !path.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// The configured script file, or the built-in funnel
    pub fn load_script(&self) -> Result<Script, ConfigError> {
        match &self.script_path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading conversation script");
                Ok(Script::from_json_file(path)?)
            }
            None => Ok(Script::builtin()),
        }
    }

    pub fn flow_context(&self) -> Result<FlowContext, ConfigError> {
        Ok(FlowContext::try_new(
            Arc::new(self.load_script()?),
            self.timing,
        )?)
    }
}
