//! Violations and the aggregator that accumulates them into one verdict.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Ordinal severity attached to a violation. `Safe` is only ever the
/// aggregate default for an empty result — no checker emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Safe
    }
}

/// A single finding emitted by one checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub risk_level: RiskLevel,
    pub checker_id: &'static str,
    pub message: String,
    pub suggestion: String,
}

impl PartialOrd for Violation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Violation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.risk_level.cmp(&other.risk_level)
    }
}

impl Violation {
    pub fn new(
        risk_level: RiskLevel,
        checker_id: &'static str,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            risk_level,
            checker_id,
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Accumulates violations for one validation call; sealed on return to the
/// caller. `risk_level` is monotone: adding a violation never lowers it.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    violations: Vec<Violation>,
    risk_level: RiskLevel,
    sealed: bool,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a violation and raises `risk_level` if the new one is
    /// higher. No-op once sealed.
    pub fn add_violation(
        &mut self,
        risk_level: RiskLevel,
        checker_id: &'static str,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        if self.sealed {
            return;
        }
        if risk_level > self.risk_level {
            self.risk_level = risk_level;
        }
        self.violations
            .push(Violation::new(risk_level, checker_id, message, suggestion));
    }

    pub fn push(&mut self, violation: Violation) {
        self.add_violation(
            violation.risk_level,
            violation.checker_id,
            violation.message,
            violation.suggestion,
        );
    }

    /// Freezes the result — the public API never exposes a mutable
    /// reference after this point.
    pub fn seal(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn is_safe(&self) -> bool {
        self.violations.is_empty()
    }
}
