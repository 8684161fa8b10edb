use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_STEP_SIZE: f64 = 0.001;

/// Where the command drain runs relative to world integration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainPhase {
    #[default]
    BeforePhysics,
    AfterPhysics,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Simulated seconds per step.
    pub step_size: f64,
    pub drain_phase: DrainPhase,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            step_size: DEFAULT_STEP_SIZE,
            drain_phase: DrainPhase::default(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverConfigError {
    #[error("step size must be finite and positive, got {0}")]
    InvalidStepSize(f64),
}

impl DriverConfig {
    pub fn validate(&self) -> Result<(), DriverConfigError> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(DriverConfigError::InvalidStepSize(self.step_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = DriverConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.drain_phase, DrainPhase::BeforePhysics);
    }

    #[test]
    fn rejects_bad_step_sizes() {
        for step_size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = DriverConfig {
                step_size,
                ..DriverConfig::default()
            };
            assert!(config.validate().is_err(), "{step_size} should be rejected");
        }
    }
}
