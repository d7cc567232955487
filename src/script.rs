//! Scripted duels for replay.
//!
//! A script is TOML: a list of steps, each an action and the millisecond
//! offset from the start of the duel at which it arrives.
//!
//! ```toml
//! [[steps]]
//! at_ms = 0
//! action = { kind = "select_first_player", player = "alice" }
//! ```

use crate::config::ConfigError;
use crate::duel::{Action, TimedAction};
use chrono::{DateTime, TimeDelta, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, instrument};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ScriptStep {
    /// Offset from the start of the duel.
    at_ms: u64,
    /// What happens.
    action: Action,
}

/// A scripted duel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ReplayScript {
    #[serde(default)]
    steps: Vec<ScriptStep>,
}

impl ReplayScript {
    /// Loads a script from a TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read script file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parses a script from TOML text.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML or when offsets go backwards.
    #[instrument(skip(content))]
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let script: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse script: {}", e)))?;
        if script.steps.windows(2).any(|w| w[1].at_ms < w[0].at_ms) {
            return Err(ConfigError::new(
                "Script steps must be in time order".to_string(),
            ));
        }
        debug!(steps = script.steps.len(), "Script loaded");
        Ok(script)
    }

    /// Anchors the steps at `start`.
    pub fn timed_actions(&self, start: DateTime<Utc>) -> Vec<TimedAction> {
        self.steps
            .iter()
            .map(|step| {
                let offset = i64::try_from(step.at_ms)
                    .ok()
                    .and_then(TimeDelta::try_milliseconds)
                    .unwrap_or(TimeDelta::MAX);
                let at = start
                    .checked_add_signed(offset)
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                TimedAction::new(at, step.action.clone())
            })
            .collect()
    }
}
