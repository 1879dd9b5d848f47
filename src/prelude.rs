//! Re-exports the types a host actually wires up, so the common case is one
//! `use sql_safety_core::prelude::*;`.

pub use crate::config::CoreConfig;
pub use crate::context::{Layer, PaginationHint, SqlContext};
pub use crate::dispatcher::{Outcome, StrategyDispatcher};
pub use crate::result::{RiskLevel, ValidationResult, Violation};
pub use crate::validator::{ValidationRequest, Validator};
