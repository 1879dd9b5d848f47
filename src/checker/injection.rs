//! SQL-injection shapes: stacked statements, disallowed set operations,
//! comments smuggled past the grammar library, file-write functions, and
//! denied function calls.

use std::collections::HashSet;

use sqlparser::ast::{Expr, Query, SelectItem, SetExpr, SetOperator, SetQuantifier, Statement};

use crate::checker::{walk_function_names, Checker};
use crate::config::{
    CommentPresentConfig, DangerousFunctionsConfig, SetOperationUseConfig, StackedStatementsConfig,
};
use crate::context::SqlContext;
use crate::result::{RiskLevel, ValidationResult};
use crate::scanner::{self, scan};

pub struct StackedStatements {
    enabled: bool,
    risk_level: RiskLevel,
}

impl StackedStatements {
    pub fn new(config: &StackedStatementsConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
        }
    }
}

impl Checker for StackedStatements {
    fn id(&self) -> &'static str {
        "StackedStatements"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn raw_only(&self) -> bool {
        true
    }

    fn on_raw_sql(&self, ctx: &SqlContext, result: &mut ValidationResult) {
        let report = scan(ctx.raw_sql());
        if !report.stray_semicolons.is_empty() {
            result.add_violation(
                self.risk_level,
                self.id(),
                format!(
                    "found {} unquoted ';' followed by further SQL text",
                    report.stray_semicolons.len()
                ),
                "submit one statement per call; never concatenate statements with ';'",
            );
        }
    }
}

pub struct CommentPresent {
    enabled: bool,
    risk_level: RiskLevel,
    allow_optimizer_hints: bool,
}

impl CommentPresent {
    pub fn new(config: &CommentPresentConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
            allow_optimizer_hints: config.allow_optimizer_hints,
        }
    }
}

impl Checker for CommentPresent {
    fn id(&self) -> &'static str {
        "CommentPresent"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn raw_only(&self) -> bool {
        true
    }

    fn on_raw_sql(&self, ctx: &SqlContext, result: &mut ValidationResult) {
        let report = scan(ctx.raw_sql());
        if !report.has_comment {
            return;
        }
        if self.allow_optimizer_hints && report.only_optimizer_hints {
            return;
        }
        result.add_violation(
            self.risk_level,
            self.id(),
            "raw SQL contains a comment marker, which the grammar library strips before parsing",
            "remove inline comments from submitted SQL; use a query builder that never embeds them",
        );
    }
}

pub struct FileOut {
    enabled: bool,
    risk_level: RiskLevel,
}

impl FileOut {
    pub fn new(config: &crate::config::BaseCheckerConfig) -> Self {
        Self {
            enabled: config.enabled,
            risk_level: config.effective_risk_level(RiskLevel::Critical),
        }
    }
}

impl Checker for FileOut {
    fn id(&self) -> &'static str {
        "FileOut"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn raw_only(&self) -> bool {
        true
    }

    fn on_raw_sql(&self, ctx: &SqlContext, result: &mut ValidationResult) {
        let report = scan(ctx.raw_sql());
        if report.into_outfile.is_some() || report.into_dumpfile.is_some() {
            result.add_violation(
                self.risk_level,
                self.id(),
                "raw SQL writes query output to a server-side file via INTO OUTFILE/DUMPFILE",
                "drop the file-write clause; export data through an application-level channel",
            );
        }
    }
}

pub struct SetOperationUse {
    enabled: bool,
    risk_level: RiskLevel,
    allowed: HashSet<String>,
}

impl SetOperationUse {
    pub fn new(config: &SetOperationUseConfig) -> Self {
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

    fn emit(&self, operation: &str, result: &mut ValidationResult) {
        if self.allowed.contains(operation) {
            return;
        }
        result.add_violation(
            self.risk_level,
            self.id(),
            format!("statement uses the {operation} set operation, which is not in the configured allow-list"),
            "split the query or add this operation to allowedOperations if it is expected here",
        );
    }
}

impl Checker for SetOperationUse {
    fn id(&self) -> &'static str {
        "SetOperationUse"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, stmt: &Statement, ctx: &SqlContext, result: &mut ValidationResult) {
        let Statement::Query(query) = stmt else { return };
        let mut operations = Vec::new();
        collect_set_operations(&query.body, &mut operations);
        for (op, quantifier) in operations {
            self.emit(&operator_name(op, quantifier), result);
        }

        // `sqlparser` has no native representation for Oracle's MINUS — a
        // statement using it either fails to parse or loses that detail, so
        // it is caught here from raw text instead of the AST walk above.
        if scan_for_minus(ctx.raw_sql()) {
            self.emit("MINUS", result);
        }
    }
}

fn collect_set_operations<'a>(
    expr: &'a SetExpr,
    out: &mut Vec<(&'a SetOperator, &'a SetQuantifier)>,
) {
    match expr {
        SetExpr::SetOperation {
            op,
            set_quantifier,
            left,
            right,
        } => {
            out.push((op, set_quantifier));
            collect_set_operations(left, out);
            collect_set_operations(right, out);
        }
        SetExpr::Query(inner) => collect_set_operations(&inner.body, out),
        _ => {}
    }
}

fn operator_name(op: &SetOperator, quantifier: &SetQuantifier) -> String {
    match op {
        SetOperator::Union => {
            if matches!(quantifier, SetQuantifier::All) {
                "UNION_ALL".to_string()
            } else {
                "UNION".to_string()
            }
        }
        SetOperator::Except => "EXCEPT".to_string(),
        SetOperator::Intersect => "INTERSECT".to_string(),
    }
}

fn scan_for_minus(raw_sql: &str) -> bool {
    let mut token = String::new();
    let mut found = false;
    scanner::walk(raw_sql, |sc| {
        if sc.live && (sc.ch.is_alphanumeric() || sc.ch == '_') {
            token.push(sc.ch.to_ascii_uppercase());
            return;
        }
        if token == "MINUS" {
            found = true;
        }
        token.clear();
    });
    found || token == "MINUS"
}

pub struct DangerousFunctions {
    enabled: bool,
    risk_level: RiskLevel,
    denied: HashSet<String>,
}

impl DangerousFunctions {
    pub fn new(config: &DangerousFunctionsConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
            denied: config
                .denied_functions
                .iter()
                .map(|s| s.to_ascii_lowercase())
                .collect(),
        }
    }

    fn check(&self, stmt: &Statement, result: &mut ValidationResult) {
        for name in collect_function_names(stmt) {
            if self.denied.contains(&name.to_ascii_lowercase()) {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    format!("call to denied function '{name}'"),
                    "remove this function call or move the logic out of SQL entirely",
                );
            }
        }
    }
}

impl Checker for DangerousFunctions {
    fn id(&self) -> &'static str {
        "DangerousFunctions"
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

/// Names of every function call reachable from `stmt`, following arguments
/// recursively. Uses an owned `Vec<String>` (rather than borrowing the AST's
/// `Ident`s) so the caller never has to juggle lifetimes against a
/// `HashSet` built from user config.
fn collect_function_names(stmt: &Statement) -> Vec<String> {
    let mut names = Vec::new();
    match stmt {
        Statement::Query(query) => collect_from_query(query, &mut names),
        Statement::Update {
            assignments,
            selection,
            ..
        } => {
            for assignment in assignments {
                collect_from_expr(&assignment.value, &mut names);
            }
            if let Some(selection) = selection {
                collect_from_expr(selection, &mut names);
            }
        }
        Statement::Delete { selection, .. } => {
            if let Some(selection) = selection {
                collect_from_expr(selection, &mut names);
            }
        }
        Statement::Insert { source: Some(query), .. } => collect_from_query(query, &mut names),
        _ => {}
    }
    names
}

fn collect_from_query(query: &Query, names: &mut Vec<String>) {
    collect_from_set_expr(&query.body, names);
}

fn collect_from_set_expr(expr: &SetExpr, names: &mut Vec<String>) {
    match expr {
        SetExpr::Select(select) => {
            for item in &select.projection {
                match item {
                    SelectItem::UnnamedExpr(expr) => collect_from_expr(expr, names),
                    SelectItem::ExprWithAlias { expr, .. } => collect_from_expr(expr, names),
                    _ => {}
                }
            }
            if let Some(selection) = &select.selection {
                collect_from_expr(selection, names);
            }
            if let Some(having) = &select.having {
                collect_from_expr(having, names);
            }
        }
        SetExpr::SetOperation { left, right, .. } => {
            collect_from_set_expr(left, names);
            collect_from_set_expr(right, names);
        }
        SetExpr::Query(inner) => collect_from_query(inner, names),
        SetExpr::Values(values) => {
            for row in &values.rows {
                for expr in row {
                    collect_from_expr(expr, names);
                }
            }
        }
        _ => {}
    }
}

fn collect_from_expr(expr: &Expr, names: &mut Vec<String>) {
    let mut idents = Vec::new();
    walk_function_names(expr, &mut idents);
    names.extend(idents.into_iter().map(|ident| ident.value.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BaseCheckerConfig, CommentPresentConfig, StackedStatementsConfig};
    use crate::context::{ParsedStatement, SqlContext};

    fn raw_ctx(sql: &str) -> SqlContext {
        SqlContext::builder(sql)
            .statement(ParsedStatement::Failed("unused".into()))
            .build()
            .unwrap()
    }

    #[test]
    fn stacked_statements_flags_unquoted_semicolon_with_trailing_text() {
        let checker = StackedStatements::new(&StackedStatementsConfig::default());
        let ctx = raw_ctx("SELECT * FROM users; DROP TABLE users--");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn stacked_statements_ignores_trailing_semicolon() {
        let checker = StackedStatements::new(&StackedStatementsConfig::default());
        let ctx = raw_ctx("SELECT * FROM users;");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert!(result.is_safe());
    }

    #[test]
    fn comment_present_flags_trailing_dash_dash() {
        let checker = CommentPresent::new(&CommentPresentConfig::default());
        let ctx = raw_ctx("SELECT * FROM users WHERE id = 1 -- and more");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert_eq!(result.violations().len(), 1);
    }

    #[test]
    fn comment_present_allows_optimizer_hints_when_configured() {
        let mut config = CommentPresentConfig::default();
        config.allow_optimizer_hints = true;
        let checker = CommentPresent::new(&config);
        let ctx = raw_ctx("SELECT /*+ INDEX(t idx) */ * FROM t");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert!(result.is_safe());
    }

    #[test]
    fn file_out_flags_into_outfile_but_not_scalar_into() {
        let checker = FileOut::new(&BaseCheckerConfig::default());

        let ctx = raw_ctx("SELECT * FROM t INTO OUTFILE '/tmp/x'");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert_eq!(result.violations().len(), 1);

        let ctx = raw_ctx("SELECT col INTO var FROM t");
        let mut result = ValidationResult::new();
        checker.on_raw_sql(&ctx, &mut result);
        assert!(result.is_safe());
    }
}
