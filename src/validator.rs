//! Top-level entry point: wires the parser façade, the dedup filter and the
//! orchestrator together into the one call a host actually makes.

use parking_lot::RwLock;
use tracing::debug;

use crate::config::CoreConfig;
use crate::context::{Layer, PaginationHint, SqlContext};
use crate::dedup::DeduplicationFilter;
use crate::error::{CoreError, Result};
use crate::orchestrator::Orchestrator;
use crate::parser::{normalize, ParserFacade};
use crate::result::ValidationResult;

/// One call's worth of input, beyond the raw SQL text itself. Every field
/// but `raw_sql` has a sensible default, set via the fluent setters.
#[derive(Debug, Clone)]
pub struct ValidationRequest<'a> {
    raw_sql: &'a str,
    statement_id: &'a str,
    layer: Layer,
    pagination_hint: Option<PaginationHint>,
}

impl<'a> ValidationRequest<'a> {
    pub fn new(raw_sql: &'a str) -> Self {
        Self {
            raw_sql,
            statement_id: "",
            layer: Layer::Driver,
            pagination_hint: None,
        }
    }

    pub fn statement_id(mut self, id: &'a str) -> Self {
        self.statement_id = id;
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    pub fn pagination_hint(mut self, hint: PaginationHint) -> Self {
        self.pagination_hint = Some(hint);
        self
    }
}

/// Validates one SQL statement at a time: dedup first (cheapest), then
/// parse (cached), then the checker catalog. Safe to share across threads —
/// the parse cache is internally sharded and the dedup filter is
/// thread-local, so no call here blocks on another thread's call.
pub struct Validator {
    parser: ParserFacade,
    dedup: DeduplicationFilter,
    orchestrator: RwLock<Orchestrator>,
}

impl Validator {
    /// Validates `config` eagerly, so a misconfigured host fails at
    /// construction rather than on the first request.
    pub fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser: ParserFacade::new(config.parse_cache_capacity, config.strict_parse),
            dedup: DeduplicationFilter::new(config.dedup_cache_capacity, config.dedup_ttl_ms),
            orchestrator: RwLock::new(Orchestrator::from_config(&config.checkers)),
        })
    }

    /// Swaps in a new checker catalog atomically. In-flight calls that
    /// already hold the old orchestrator finish against it; everything
    /// after this call sees the new one.
    pub fn reconfigure(&self, config: &CoreConfig) -> Result<()> {
        config.validate()?;
        let orchestrator = Orchestrator::from_config(&config.checkers);
        *self.orchestrator.write() = orchestrator;
        Ok(())
    }

    /// Drops this thread's deduplication state. Hosts call this at the end
    /// of a request/task so state from one tenant never leaks TTL-expired
    /// residue into the next on a reused thread.
    pub fn clear_thread_state() {
        DeduplicationFilter::clear_thread_state();
    }

    pub fn validate(&self, request: ValidationRequest<'_>) -> Result<ValidationResult> {
        if request.raw_sql.trim().is_empty() {
            return Err(CoreError::EmptySql);
        }

        let key = normalize(request.raw_sql);

        if !self.dedup.should_check(&key) {
            if let Some(cached) = self.dedup.cached_result(&key) {
                debug!("serving validation result from the dedup cache");
                return Ok(cached);
            }
        }

        let parsed = self.parser.parse(request.raw_sql)?;

        let mut builder = SqlContext::builder(request.raw_sql)
            .statement(parsed)
            .layer(request.layer);
        if !request.statement_id.is_empty() {
            builder = builder.statement_id(request.statement_id);
        }
        if let Some(hint) = request.pagination_hint {
            builder = builder.pagination_hint(hint);
        }
        let ctx = builder.build()?;

        let result = self.orchestrator.read().orchestrate(&ctx);
        self.dedup.record(&key, result.clone());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::RiskLevel;

    #[test]
    fn rejects_empty_sql() {
        let validator = Validator::new(CoreConfig::default()).unwrap();
        let err = validator
            .validate(ValidationRequest::new("   "))
            .unwrap_err();
        assert!(matches!(err, CoreError::EmptySql));
    }

    #[test]
    fn flags_unfiltered_delete() {
        let validator = Validator::new(CoreConfig::default()).unwrap();
        let result = validator
            .validate(ValidationRequest::new("DELETE FROM users"))
            .unwrap();
        assert_eq!(result.risk_level(), RiskLevel::Critical);
    }

    #[test]
    fn second_call_within_ttl_is_served_from_dedup_cache() {
        let mut config = CoreConfig::default();
        config.dedup_ttl_ms = 10_000;
        let validator = Validator::new(config).unwrap();
        Validator::clear_thread_state();

        let first = validator
            .validate(ValidationRequest::new("DELETE FROM users"))
            .unwrap();
        let second = validator
            .validate(ValidationRequest::new("DELETE FROM users"))
            .unwrap();
        assert_eq!(first.risk_level(), second.risk_level());
    }

    #[test]
    fn reconfigure_takes_effect_on_the_next_call() {
        let validator = Validator::new(CoreConfig::default()).unwrap();
        let result = validator
            .validate(ValidationRequest::new("DELETE FROM users"))
            .unwrap();
        assert_eq!(result.risk_level(), RiskLevel::Critical);

        let mut config = CoreConfig::default();
        config.checkers.missing_where.base.enabled = false;
        validator.reconfigure(&config).unwrap();

        Validator::clear_thread_state();
        let result = validator
            .validate(ValidationRequest::new("DELETE FROM users"))
            .unwrap();
        assert!(!result
            .violations()
            .iter()
            .any(|v| v.checker_id == "MissingWhere"));
    }
}
