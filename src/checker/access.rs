//! Access control / operation gating: statements that are dangerous because
//! of *what* they are (DDL, a procedure call, a metadata query, a session
//! mutation) or *where* they point (a denied or read-only table).

use std::collections::HashSet;

use sqlparser::ast::Statement;

use crate::checker::{extract_tables_from_statement, Checker, WildcardSet};
use crate::config::{
    BaseCheckerConfig, DdlInDmlContextConfig, MetadataQueriesConfig, PatternTableConfig,
    ProcedureCallConfig,
};
use crate::context::SqlContext;
use crate::result::{RiskLevel, ValidationResult};
use crate::scanner;

pub struct DdlInDmlContext {
    enabled: bool,
    risk_level: RiskLevel,
    allowed: HashSet<String>,
}

impl DdlInDmlContext {
    pub fn new(config: &DdlInDmlContextConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
            allowed: config
                .allowed_operations
                .iter()
                .map(|s| s.to_ascii_uppercase())
                .collect(),
        }
    }
}

impl Checker for DdlInDmlContext {
    fn id(&self) -> &'static str {
        "DdlInDmlContext"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_ddl(&self, _stmt: &Statement, ctx: &SqlContext, result: &mut ValidationResult) {
        let operation = scanner::leading_keyword(ctx.raw_sql()).unwrap_or_default();
        if self.allowed.contains(&operation) {
            return;
        }
        result.add_violation(
            self.risk_level,
            self.id(),
            format!("DDL statement ({operation}) submitted through a path validated for DML"),
            "route schema changes through migrations, not the application's query path",
        );
    }
}

pub struct ProcedureCall {
    enabled: bool,
    risk_level: RiskLevel,
}

impl ProcedureCall {
    pub fn new(config: &ProcedureCallConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::High),
        }
    }
}

impl Checker for ProcedureCall {
    fn id(&self) -> &'static str {
        "ProcedureCall"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn raw_only(&self) -> bool {
        true
    }

    fn on_raw_sql(&self, ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(keyword) = scanner::leading_keyword(ctx.raw_sql()) else { return };
        if matches!(keyword.as_str(), "CALL" | "EXECUTE" | "EXEC") {
            result.add_violation(
                self.risk_level,
                self.id(),
                format!("statement invokes a stored procedure ({keyword})"),
                "confirm this procedure is expected on this path; prefer WARN over FAIL for known procedures",
            );
        }
    }
}

pub struct MetadataQueries {
    enabled: bool,
    risk_level: RiskLevel,
    allowed: HashSet<String>,
}

impl MetadataQueries {
    pub fn new(config: &MetadataQueriesConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::High),
            allowed: config
                .allowed_statements
                .iter()
                .map(|s| s.to_ascii_uppercase())
                .collect(),
        }
    }
}

impl Checker for MetadataQueries {
    fn id(&self) -> &'static str {
        "MetadataQueries"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn raw_only(&self) -> bool {
        true
    }

    fn on_raw_sql(&self, ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(keyword) = scanner::leading_keyword(ctx.raw_sql()) else { return };
        if !matches!(keyword.as_str(), "SHOW" | "DESCRIBE" | "DESC" | "USE") {
            return;
        }
        if self.allowed.contains(&keyword) {
            return;
        }
        result.add_violation(
            self.risk_level,
            self.id(),
            format!("statement queries database metadata ({keyword})"),
            "metadata introspection from the application path often indicates reconnaissance",
        );
    }
}

pub struct SessionMutation {
    enabled: bool,
    risk_level: RiskLevel,
}

impl SessionMutation {
    pub fn new(config: &BaseCheckerConfig) -> Self {
        Self {
            enabled: config.enabled,
            risk_level: config.effective_risk_level(RiskLevel::Medium),
        }
    }
}

impl Checker for SessionMutation {
    fn id(&self) -> &'static str {
        "SessionMutation"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn raw_only(&self) -> bool {
        true
    }

    fn on_raw_sql(&self, ctx: &SqlContext, result: &mut ValidationResult) {
        // Must not flag `UPDATE t SET col = ...` — only the statement-level
        // `SET` whose first meaningful token (after skipping whitespace and
        // comments) is literally `SET` qualifies.
        if scanner::leading_keyword(ctx.raw_sql()).as_deref() == Some("SET") {
            result.add_violation(
                self.risk_level,
                self.id(),
                "statement mutates session state (SET)",
                "session variable changes from pooled connections can leak across requests",
            );
        }
    }
}

pub struct DeniedTable {
    enabled: bool,
    risk_level: RiskLevel,
    patterns: WildcardSet,
}

impl DeniedTable {
    pub fn new(config: &PatternTableConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
            patterns: WildcardSet::new(config.patterns.iter()),
        }
    }

    fn check(&self, stmt: &Statement, result: &mut ValidationResult) {
        if self.patterns.is_empty() {
            return;
        }
        for table in extract_tables_from_statement(stmt) {
            if self.patterns.matches(&table) {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    format!("references denied table '{table}'"),
                    "this table is not reachable from this path; route the request elsewhere",
                );
            }
        }
    }
}

impl Checker for DeniedTable {
    fn id(&self) -> &'static str {
        "DeniedTable"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_update(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_insert(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_delete(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }
}

pub struct ReadOnlyTable {
    enabled: bool,
    risk_level: RiskLevel,
    patterns: WildcardSet,
}

impl ReadOnlyTable {
    pub fn new(config: &PatternTableConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::High),
            patterns: WildcardSet::new(config.patterns.iter()),
        }
    }

    fn check(&self, stmt: &Statement, result: &mut ValidationResult) {
        if self.patterns.is_empty() {
            return;
        }
        for table in extract_tables_from_statement(stmt) {
            if self.patterns.matches(&table) {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    format!("write targets read-only table '{table}'"),
                    "reads from this table are fine; writes must go through its owning service",
                );
            }
        }
    }
}

impl Checker for ReadOnlyTable {
    fn id(&self) -> &'static str {
        "ReadOnlyTable"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    // Reads are always allowed, so there is deliberately no `on_select` hook
    // here — only the write-statement hooks participate.
    fn on_update(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_insert(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_delete(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn session_mutation_flags_statement_level_set() {
        let checker = SessionMutation::new(&BaseCheckerConfig::default());
        let ctx = ctx_for("SET sql_mode = 'STRICT'");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn session_mutation_ignores_update_set() {
        let checker = SessionMutation::new(&BaseCheckerConfig::default());
        let ctx = ctx_for("UPDATE users SET name = 'x' WHERE id = 1");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert!(result.is_safe());
    }

    #[test]
    fn denied_table_flags_matching_wildcard_but_not_lookalikes() {
        let mut config = PatternTableConfig::default();
        config.patterns.insert("sys_*".to_string());
        config.patterns.insert("admin_*".to_string());
        let checker = DeniedTable::new(&config);

        let ctx = ctx_for("SELECT * FROM sys_user WHERE id = 1");
        let mut result = ValidationResult::new();
        checker.on_select(ctx.ast().unwrap(), &ctx, &mut result);
        assert_eq!(result.violations().len(), 1);
        assert!(result.violations()[0].message.contains("sys_user"));

        let ctx = ctx_for("SELECT * FROM system WHERE id = 1");
        let mut result = ValidationResult::new();
        checker.on_select(ctx.ast().unwrap(), &ctx, &mut result);
        assert!(result.is_safe());
    }

    #[test]
    fn read_only_table_does_not_fire_on_select() {
        let mut config = PatternTableConfig::default();
        config.patterns.insert("ledger".to_string());
        let checker = ReadOnlyTable::new(&config);
        let ctx = ctx_for("SELECT * FROM ledger WHERE id = 1");
        let mut result = ValidationResult::new();
        // Deliberately calling only the write hooks, mirroring what the
        // orchestrator would do for a SELECT — on_select does not exist on
        // this checker at all.
        checker.on_update(ctx.ast().unwrap(), &ctx, &mut result);
        assert!(result.is_safe());
    }
}
