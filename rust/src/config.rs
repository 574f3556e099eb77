//! Configuration types for the scheduling system.

#[cfg(feature = "python")]
use pyo3::prelude::*;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ScheduleError, Violation};

/// Parameters shared by both scheduling strategies.
#[cfg_attr(feature = "python", pyclass)]
#[derive(Clone, Debug)]
pub struct SchedulingConfig {
    /// Minimum distance in days from a team's regular rotation day
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub proximity_window: u32,
    /// Balance weight: 0 favors event-count fairness, 1 favors weight-load fairness
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub alpha: f64,
    /// Wall-clock budget for the exact solver, in seconds
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub time_limit_secs: f64,
    /// Logging verbosity (0-3), see `crate::logging`
    #[cfg_attr(feature = "python", pyo3(get, set))]
    pub verbosity: u8,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            proximity_window: 3,
            alpha: 1.0,
            time_limit_secs: 60.0,
            verbosity: 0,
        }
    }
}

impl SchedulingConfig {
    pub fn with_window(mut self, proximity_window: u32) -> Self {
        self.proximity_window = proximity_window;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Solver budget; out-of-range values that `validate` rejects saturate.
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_limit_secs.max(0.0)).unwrap_or(Duration::MAX)
    }

    /// Reject out-of-range parameters before any ingestion or scheduling.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        let mut violations = Vec::new();
        if !self.alpha.is_finite() || !(0.0..=1.0).contains(&self.alpha) {
            violations.push(Violation::new(
                0,
                "alpha",
                format!("alpha must be between 0 and 1, got {}", self.alpha),
            ));
        }
        if !self.time_limit_secs.is_finite() || self.time_limit_secs <= 0.0 {
            violations.push(Violation::new(
                0,
                "time_limit_secs",
                format!("time limit must be positive, got {}", self.time_limit_secs),
            ));
        } else if Duration::try_from_secs_f64(self.time_limit_secs).is_err() {
            violations.push(Violation::new(
                0,
                "time_limit_secs",
                format!("time limit too large: {}", self.time_limit_secs),
            ));
        }
        if violations.is_empty() {
            Ok(())
        } else {
            Err(ScheduleError::Parameter(violations))
        }
    }
}

#[cfg(feature = "python")]
#[pymethods]
impl SchedulingConfig {
    #[new]
    #[pyo3(signature = (proximity_window=None, alpha=None, time_limit_secs=None, verbosity=None))]
    fn py_new(
        proximity_window: Option<u32>,
        alpha: Option<f64>,
        time_limit_secs: Option<f64>,
        verbosity: Option<u8>,
    ) -> Self {
        let defaults = Self::default();
        Self {
            proximity_window: proximity_window.unwrap_or(defaults.proximity_window),
            alpha: alpha.unwrap_or(defaults.alpha),
            time_limit_secs: time_limit_secs.unwrap_or(defaults.time_limit_secs),
            verbosity: verbosity.unwrap_or(defaults.verbosity),
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "SchedulingConfig(proximity_window={}, alpha={}, time_limit_secs={})",
            self.proximity_window, self.alpha, self.time_limit_secs
        )
    }
}

/// Which scheduler runs a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Greedy,
    Exact,
}

impl FromStr for Strategy {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "greedy" => Ok(Self::Greedy),
            "exact" | "milp" => Ok(Self::Exact),
            other => Err(ScheduleError::Parameter(vec![Violation::new(
                0,
                "strategy",
                format!("unknown scheduling strategy: {}", other),
            )])),
        }
    }
}
