//! Structural safety: statements that are dangerous purely by the shape of
//! their predicate, independent of any injection concern.

use std::collections::HashMap;
use std::collections::HashSet;

use regex::Regex;
use sqlparser::ast::{BinaryOperator, Expr, SetExpr, Statement, Value};

use crate::checker::{extract_fields, extract_tables_from_statement, Checker, WildcardSet};
use crate::config::{
    BlacklistOnlyWhereConfig, DummyPredicateConfig, MissingWhereConfig, WhitelistRequiredConfig,
};
use crate::context::SqlContext;
use crate::result::{RiskLevel, ValidationResult};

fn predicate_of(stmt: &Statement) -> Option<&Expr> {
    match stmt {
        Statement::Query(query) => match query.body.as_ref() {
            SetExpr::Select(select) => select.selection.as_ref(),
            _ => None,
        },
        Statement::Update { selection, .. } => selection.as_ref(),
        Statement::Delete { selection, .. } => selection.as_ref(),
        _ => None,
    }
}

pub struct MissingWhere {
    enabled: bool,
    risk_level: RiskLevel,
}

impl MissingWhere {
    pub fn new(config: &MissingWhereConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
        }
    }

    fn emit(&self, result: &mut ValidationResult) {
        result.add_violation(
            self.risk_level,
            self.id(),
            "statement has no WHERE clause and will affect every row in the table",
            "add a WHERE clause that scopes this statement to the intended rows",
        );
    }
}

fn any_branch_missing_where(expr: &SetExpr) -> bool {
    match expr {
        SetExpr::Select(select) => select.selection.is_none(),
        SetExpr::SetOperation { left, right, .. } => {
            any_branch_missing_where(left) || any_branch_missing_where(right)
        }
        SetExpr::Query(inner) => any_branch_missing_where(&inner.body),
        _ => false,
    }
}

impl Checker for MissingWhere {
    fn id(&self) -> &'static str {
        "MissingWhere"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        if let Statement::Query(query) = stmt {
            if any_branch_missing_where(&query.body) {
                self.emit(result);
            }
        }
    }

    fn on_update(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        if let Statement::Update { selection: None, .. } = stmt {
            self.emit(result);
        }
    }

    fn on_delete(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        if let Statement::Delete { selection: None, .. } = stmt {
            self.emit(result);
        }
    }
}

pub struct DummyPredicate {
    enabled: bool,
    risk_level: RiskLevel,
    extra_patterns: Vec<Regex>,
}

impl DummyPredicate {
    pub fn new(config: &DummyPredicateConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::High),
            extra_patterns: config
                .extra_patterns
                .iter()
                .filter_map(|p| Regex::new(p).ok())
                .collect(),
        }
    }

    fn check(&self, stmt: &Statement, result: &mut ValidationResult) {
        let Some(predicate) = predicate_of(stmt) else { return };
        if contains_tautology(predicate, &self.extra_patterns) {
            result.add_violation(
                self.risk_level,
                self.id(),
                "WHERE contains a tautology that matches every row",
                "replace the tautology with a predicate that actually scopes the rows affected",
            );
        }
    }
}

fn contains_tautology(expr: &Expr, extra: &[Regex]) -> bool {
    if let Expr::Value(Value::Boolean(true)) = expr {
        return true;
    }
    if let Expr::BinaryOp {
        left,
        op: BinaryOperator::Eq,
        right,
    } = expr
    {
        if let (Expr::Value(l), Expr::Value(r)) = (left.as_ref(), right.as_ref()) {
            if l.to_string() == r.to_string() {
                return true;
            }
        }
    }
    if extra.iter().any(|re| re.is_match(&expr.to_string())) {
        return true;
    }
    match expr {
        Expr::BinaryOp { left, right, .. } => {
            contains_tautology(left, extra) || contains_tautology(right, extra)
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr) => contains_tautology(expr, extra),
        _ => false,
    }
}

impl Checker for DummyPredicate {
    fn id(&self) -> &'static str {
        "DummyPredicate"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_update(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_delete(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }
}

pub struct BlacklistOnlyWhere {
    enabled: bool,
    risk_level: RiskLevel,
    fields: WildcardSet,
}

impl BlacklistOnlyWhere {
    pub fn new(config: &BlacklistOnlyWhereConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::High),
            fields: WildcardSet::new(config.fields.iter()),
        }
    }

    fn check(&self, stmt: &Statement, result: &mut ValidationResult) {
        if self.fields.is_empty() {
            return;
        }
        let Some(predicate) = predicate_of(stmt) else { return };
        let fields = extract_fields(predicate);
        if fields.is_empty() {
            return;
        }
        if fields.iter().all(|f| self.fields.matches(f)) {
            let mentioned = fields.iter().next().cloned().unwrap_or_default();
            result.add_violation(
                self.risk_level,
                self.id(),
                format!("WHERE uses only low-selectivity columns (e.g. '{mentioned}')"),
                "add a high-selectivity predicate (primary key, unique column) alongside the flag filter",
            );
        }
    }
}

impl Checker for BlacklistOnlyWhere {
    fn id(&self) -> &'static str {
        "BlacklistOnlyWhere"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::High
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_update(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_delete(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }
}

pub struct WhitelistRequired {
    enabled: bool,
    risk_level: RiskLevel,
    by_table: HashMap<String, HashSet<String>>,
    enforce_for_unknown_tables: bool,
    global_fields: HashSet<String>,
}

impl WhitelistRequired {
    pub fn new(config: &WhitelistRequiredConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Medium),
            by_table: config.by_table.clone(),
            enforce_for_unknown_tables: config.enforce_for_unknown_tables,
            global_fields: config.global_fields.clone(),
        }
    }

    fn check(&self, stmt: &Statement, result: &mut ValidationResult) {
        let tables = extract_tables_from_statement(stmt);
        if tables.is_empty() {
            return;
        }
        let predicate_fields = predicate_of(stmt).map(extract_fields).unwrap_or_default();

        for table in &tables {
            let required_fields: HashSet<String> = match self.by_table.get(table) {
                Some(fields) => fields.union(&self.global_fields).cloned().collect(),
                None if self.enforce_for_unknown_tables => self.global_fields.clone(),
                None => continue,
            };
            if required_fields.is_empty() {
                continue;
            }
            if predicate_fields.is_disjoint(&required_fields) {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    format!("'{table}' requires at least one of its whitelisted fields in WHERE"),
                    "add one of the table's required selective fields to the predicate",
                );
            }
        }
    }
}

impl Checker for WhitelistRequired {
    fn id(&self) -> &'static str {
        "WhitelistRequired"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_update(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }

    fn on_delete(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        self.check(stmt, result);
    }
}
