//! Configuration types for the schedule engine.

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    Invalid(#[from] serde_json::Error),
    #[error("Verbosity must be between 0 and 3, got {0}")]
    Verbosity(u8),
}

/// What happens to the subtasks of a removed task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtaskPolicy {
    /// Subtasks move up to the removed task's own parent (or become top level).
    #[default]
    Reparent,
    /// Subtasks always become top level.
    Orphan,
}

/// Engine-wide settings shared by every project in a portfolio.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Containment handling when a parent task is removed.
    pub subtask_policy: SubtaskPolicy,
    /// Never let a negative lead schedule a task before the project start.
    pub clamp_to_project_start: bool,
    /// Prefix for baselines created without a label ("Baseline 3").
    pub baseline_label_prefix: String,
    /// Reschedule a project right after each structural mutation.
    pub auto_recompute: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            subtask_policy: SubtaskPolicy::Reparent,
            clamp_to_project_start: true,
            baseline_label_prefix: "Baseline".to_string(),
            auto_recompute: true,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.verbosity > crate::logging::VERBOSITY_DEBUG {
            return Err(ConfigError::Verbosity(self.verbosity));
        }
        Ok(())
    }

    /// Extract scheduler configuration as a separate struct.
    pub fn critical_path_config(&self) -> crate::critical_path::CriticalPathConfig {
        crate::critical_path::CriticalPathConfig {
            clamp_to_project_start: self.clamp_to_project_start,
            verbosity: self.verbosity,
        }
    }

    /// Label for the `sequence_number`-th baseline when the caller gave none.
    pub fn default_baseline_label(&self, sequence_number: u32) -> String {
        format!("{} {}", self.baseline_label_prefix, sequence_number)
    }
}
