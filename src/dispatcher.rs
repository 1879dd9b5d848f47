//! Strategy Dispatcher: turns a [`ValidationResult`] into an [`Outcome`] the
//! host acts on. Purely a classification step — it never mutates the result
//! or re-runs any checker.

use serde::{Deserialize, Serialize};

use crate::result::{RiskLevel, ValidationResult};

/// What the host should do with a validated statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    /// No violations, or every violation mapped below the host's floor.
    Ignore,
    /// Record the violations but let the statement through.
    Log,
    /// Surface the violations loudly (alert, paged review) but still let
    /// the statement through.
    Warn,
    /// Block the statement outright.
    Fail,
}

/// Maps a `RiskLevel` to an `Outcome` by a simple floor: every level at or
/// above `fail_at` fails, at or above `warn_at` warns, at or above `log_at`
/// logs, everything else is ignored. `fail_at`/`warn_at`/`log_at` must be in
/// non-decreasing severity order; `new` does not enforce this, but a config
/// built with any other order degrades to having some thresholds
/// unreachable rather than panicking.
#[derive(Debug, Clone, Copy)]
pub struct StrategyDispatcher {
    log_at: RiskLevel,
    warn_at: RiskLevel,
    fail_at: RiskLevel,
}

impl Default for StrategyDispatcher {
    fn default() -> Self {
        Self {
            log_at: RiskLevel::Low,
            warn_at: RiskLevel::Medium,
            fail_at: RiskLevel::High,
        }
    }
}

impl StrategyDispatcher {
    pub fn new(log_at: RiskLevel, warn_at: RiskLevel, fail_at: RiskLevel) -> Self {
        Self {
            log_at,
            warn_at,
            fail_at,
        }
    }

    pub fn classify(&self, result: &ValidationResult) -> Outcome {
        let level = result.risk_level();
        if level >= self.fail_at {
            Outcome::Fail
        } else if level >= self.warn_at {
            Outcome::Warn
        } else if level >= self.log_at {
            Outcome::Log
        } else {
            Outcome::Ignore
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result_at(level: RiskLevel) -> ValidationResult {
        let mut result = ValidationResult::new();
        if level > RiskLevel::Safe {
            result.add_violation(level, "test", "m", "s");
        }
        result
    }

    #[test]
    fn safe_result_is_ignored() {
        let dispatcher = StrategyDispatcher::default();
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Safe)), Outcome::Ignore);
    }

    #[test]
    fn low_is_logged_medium_is_warned_high_and_above_fails() {
        let dispatcher = StrategyDispatcher::default();
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Low)), Outcome::Log);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Medium)), Outcome::Warn);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::High)), Outcome::Fail);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Critical)), Outcome::Fail);
    }

    #[test]
    fn thresholds_are_configurable() {
        let dispatcher = StrategyDispatcher::new(RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Low)), Outcome::Ignore);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Medium)), Outcome::Log);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::High)), Outcome::Warn);
        assert_eq!(dispatcher.classify(&result_at(RiskLevel::Critical)), Outcome::Fail);
    }
}
