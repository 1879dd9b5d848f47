//! Runs the checker catalog against one [`SqlContext`] and aggregates
//! their findings into a single [`ValidationResult`].

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::checker::{build_catalog, Checker};
use crate::config::CheckerCatalogConfig;
use crate::context::{SqlContext, StatementKind};
use crate::result::{RiskLevel, ValidationResult};

/// Runs every enabled checker in catalog order and returns the sealed,
/// aggregated result. Never short-circuits: a checker that panics is caught
/// at its own boundary and recorded as a `LOW` violation, and every other
/// checker still runs.
pub struct Orchestrator {
    checkers: Vec<Box<dyn Checker>>,
}

impl Orchestrator {
    pub fn new(checkers: Vec<Box<dyn Checker>>) -> Self {
        Self { checkers }
    }

    pub fn from_config(config: &CheckerCatalogConfig) -> Self {
        Self::new(build_catalog(config))
    }

    pub fn orchestrate(&self, ctx: &SqlContext) -> ValidationResult {
        let mut result = ValidationResult::new();
        for checker in &self.checkers {
            if !checker.enabled() {
                continue;
            }
            run_one(checker.as_ref(), ctx, &mut result);
        }
        result.seal()
    }
}

/// Dispatches to the one hook that applies to `ctx`'s statement kind, unless
/// the checker is `raw_only`, in which case it always gets `on_raw_sql`
/// regardless of kind. A checker bound to a typed hook whose AST is absent
/// (failed parse) also falls back to `on_raw_sql` — that's the only signal
/// left for it to act on.
fn dispatch(checker: &dyn Checker, ctx: &SqlContext, result: &mut ValidationResult) {
    if checker.raw_only() {
        checker.on_raw_sql(ctx, result);
        return;
    }

    let Some(stmt) = ctx.ast() else {
        checker.on_raw_sql(ctx, result);
        return;
    };

    match ctx.kind() {
        StatementKind::Select => checker.on_select(stmt, ctx, result),
        StatementKind::Insert => checker.on_insert(stmt, ctx, result),
        StatementKind::Update => checker.on_update(stmt, ctx, result),
        StatementKind::Delete => checker.on_delete(stmt, ctx, result),
        StatementKind::Ddl => checker.on_ddl(stmt, ctx, result),
        StatementKind::Other | StatementKind::Unknown => checker.on_raw_sql(ctx, result),
    }
}

fn run_one(checker: &dyn Checker, ctx: &SqlContext, result: &mut ValidationResult) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut local = ValidationResult::new();
        dispatch(checker, ctx, &mut local);
        local
    }));

    match outcome {
        Ok(local) => {
            for violation in local.violations() {
                result.push(violation.clone());
            }
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(checker = checker.id(), error = %message, "checker panicked during validation");
            result.add_violation(
                RiskLevel::Low,
                checker.id(),
                format!("checker failed internally: {message}"),
                "this finding is synthetic; investigate the checker's logs and fix the underlying bug",
            );
        }
    }
}

fn panic_message(payload: &dyn Any) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckerCatalogConfig;
    use crate::context::{ParsedStatement, SqlContext};
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn ctx_for(sql: &str) -> SqlContext {
        let parsed = Parser::parse_sql(&GenericDialect {}, sql)
            .ok()
            .and_then(|mut stmts| stmts.drain(..).next())
            .map(ParsedStatement::Parsed)
            .unwrap_or_else(|| ParsedStatement::Failed("unused".into()));
        SqlContext::builder(sql).statement(parsed).build().unwrap()
    }

    #[test]
    fn unfiltered_delete_is_flagged_critical() {
        let orchestrator = Orchestrator::from_config(&CheckerCatalogConfig::default());
        let ctx = ctx_for("DELETE FROM users");
        let result = orchestrator.orchestrate(&ctx);
        assert_eq!(result.risk_level(), RiskLevel::Critical);
        assert!(result
            .violations()
            .iter()
            .any(|v| v.checker_id == "MissingWhere"));
    }

    #[test]
    fn stacked_statement_with_comment_yields_critical_with_both_findings() {
        let orchestrator = Orchestrator::from_config(&CheckerCatalogConfig::default());
        let ctx = ctx_for("SELECT * FROM users; DROP TABLE users--");
        let result = orchestrator.orchestrate(&ctx);
        assert_eq!(result.risk_level(), RiskLevel::Critical);
        let ids: Vec<&str> = result.violations().iter().map(|v| v.checker_id).collect();
        assert!(ids.contains(&"StackedStatements"));
        assert!(ids.contains(&"CommentPresent"));
    }

    #[test]
    fn safe_select_produces_no_findings() {
        let orchestrator = Orchestrator::from_config(&CheckerCatalogConfig::default());
        let ctx = ctx_for("SELECT * FROM users WHERE id = 1");
        let result = orchestrator.orchestrate(&ctx);
        assert!(result.is_safe());
    }

    #[test]
    fn disabled_checker_does_not_contribute_findings() {
        let mut config = CheckerCatalogConfig::default();
        config.missing_where.base.enabled = false;
        let orchestrator = Orchestrator::from_config(&config);
        let ctx = ctx_for("DELETE FROM users");
        let result = orchestrator.orchestrate(&ctx);
        assert!(!result
            .violations()
            .iter()
            .any(|v| v.checker_id == "MissingWhere"));
    }

    #[test]
    fn session_mutation_runs_even_though_it_is_raw_only_on_a_set_statement() {
        let orchestrator = Orchestrator::from_config(&CheckerCatalogConfig::default());
        let ctx = ctx_for("SET sql_mode = 'STRICT'");
        let result = orchestrator.orchestrate(&ctx);
        assert!(result
            .violations()
            .iter()
            .any(|v| v.checker_id == "SessionMutation"));
    }
}
