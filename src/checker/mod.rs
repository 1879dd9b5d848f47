//! The checker contract shared by every entry in the catalog, plus the
//! extraction helpers checkers build on: pulling column identifiers and
//! table identifiers out of an AST, and matching either against a
//! wildcard pattern.

pub mod access;
pub mod injection;
pub mod pagination;
pub mod structural;

use std::collections::HashSet;

use regex::Regex;
use sqlparser::ast::{
    Expr, FromTable, Function, FunctionArg, FunctionArgExpr, FunctionArguments, Ident, ObjectName,
    Query, SetExpr, Statement, TableFactor, TableWithJoins,
};

use crate::config::CheckerCatalogConfig;
use crate::context::SqlContext;
use crate::result::{RiskLevel, ValidationResult};

/// Capability every checker implements. Defaults are no-ops, so a checker
/// only overrides the hooks its algorithm actually needs; no checker ever
/// calls another, and none may mutate `ctx`.
pub trait Checker: Send + Sync {
    fn id(&self) -> &'static str;
    fn enabled(&self) -> bool;
    fn default_risk_level(&self) -> RiskLevel;

    fn on_select(&self, _stmt: &Statement, _ctx: &SqlContext, _result: &mut ValidationResult) {}
    fn on_update(&self, _stmt: &Statement, _ctx: &SqlContext, _result: &mut ValidationResult) {}
    fn on_delete(&self, _stmt: &Statement, _ctx: &SqlContext, _result: &mut ValidationResult) {}
    fn on_insert(&self, _stmt: &Statement, _ctx: &SqlContext, _result: &mut ValidationResult) {}
    fn on_ddl(&self, _stmt: &Statement, _ctx: &SqlContext, _result: &mut ValidationResult) {}
    fn on_raw_sql(&self, _ctx: &SqlContext, _result: &mut ValidationResult) {}

    /// Checkers whose algorithm runs over raw SQL text even when an AST is
    /// available (StackedStatements, CommentPresent, FileOut,
    /// SessionMutation) report `true` here so the orchestrator routes them
    /// to `on_raw_sql` unconditionally instead of one of the typed hooks.
    fn raw_only(&self) -> bool {
        false
    }
}

/// Instantiates every checker in the catalog's declared order. Order is
/// fixed by category (structural, pagination, injection, access) rather
/// than independently configurable — nothing in the config schema names an
/// ordering key, and determinism only requires that the order be stable
/// across runs of the same build, not user-assignable.
pub fn build_catalog(config: &CheckerCatalogConfig) -> Vec<Box<dyn Checker>> {
    vec![
        Box::new(structural::MissingWhere::new(&config.missing_where)),
        Box::new(structural::DummyPredicate::new(&config.dummy_predicate)),
        Box::new(structural::BlacklistOnlyWhere::new(
            &config.blacklist_only_where,
        )),
        Box::new(structural::WhitelistRequired::new(
            &config.whitelist_required,
        )),
        Box::new(pagination::LogicalPagination::new(
            &config.logical_pagination,
        )),
        Box::new(pagination::PaginationWithoutPredicate::new(
            &config.pagination_without_predicate,
        )),
        Box::new(pagination::DeepOffset::new(&config.deep_offset)),
        Box::new(pagination::LargePageSize::new(&config.large_page_size)),
        Box::new(pagination::UnorderedPagination::new(
            &config.unordered_pagination,
        )),
        Box::new(pagination::UnboundedSelect::new(
            &config.unbounded_select,
            &config.blacklist_only_where,
        )),
        Box::new(injection::StackedStatements::new(
            &config.stacked_statements,
        )),
        Box::new(injection::SetOperationUse::new(&config.set_operation_use)),
        Box::new(injection::CommentPresent::new(&config.comment_present)),
        Box::new(injection::FileOut::new(&config.file_out)),
        Box::new(injection::DangerousFunctions::new(
            &config.dangerous_functions,
        )),
        Box::new(access::DdlInDmlContext::new(&config.ddl_in_dml_context)),
        Box::new(access::ProcedureCall::new(&config.procedure_call)),
        Box::new(access::MetadataQueries::new(&config.metadata_queries)),
        Box::new(access::SessionMutation::new(&config.session_mutation)),
        Box::new(access::DeniedTable::new(&config.denied_table)),
        Box::new(access::ReadOnlyTable::new(&config.read_only_table)),
    ]
}

/// A compiled set of wildcard patterns, matched case-insensitively. A
/// pattern ending in `*` means "prefix, then a `_`-delimited segment with no
/// further `_`" — `sys_*` matches `sys_user` but not `system` or
/// `sys_user_detail`. A pattern with no trailing `*` is an exact match.
pub struct WildcardSet {
    exact: HashSet<String>,
    wildcards: Vec<Regex>,
}

impl WildcardSet {
    pub fn new<'a>(patterns: impl IntoIterator<Item = &'a String>) -> Self {
        let mut exact = HashSet::new();
        let mut wildcards = Vec::new();
        for pattern in patterns {
            if let Some(stripped) = pattern.strip_suffix('*') {
                let prefix = stripped.strip_suffix('_').unwrap_or(stripped);
                let expr = format!("(?i)^{}_[^_]+$", regex::escape(prefix));
                if let Ok(re) = Regex::new(&expr) {
                    wildcards.push(re);
                }
            } else {
                exact.insert(pattern.to_ascii_lowercase());
            }
        }
        Self { exact, wildcards }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.exact.contains(&candidate.to_ascii_lowercase()) {
            return true;
        }
        self.wildcards.iter().any(|re| re.is_match(candidate))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcards.is_empty()
    }
}

fn object_name_to_table(name: &ObjectName) -> String {
    name.0
        .last()
        .map(|ident| ident.value.clone())
        .unwrap_or_default()
}

/// Every table identifier reachable from `query`'s `FROM`, `JOIN`, derived
/// subqueries, CTEs, and set-operation branches. Identifiers are the bare
/// table name (schema/catalog prefixes dropped) since `sqlparser` already
/// strips quote delimiters into `Ident::value`.
pub fn extract_tables(query: &Query) -> HashSet<String> {
    let mut tables = HashSet::new();
    collect_tables_from_set_expr(&query.body, &mut tables);
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            collect_tables_from_set_expr(&cte.query.body, &mut tables);
        }
    }
    tables
}

fn collect_tables_from_set_expr(expr: &SetExpr, tables: &mut HashSet<String>) {
    match expr {
        SetExpr::Select(select) => {
            for twj in &select.from {
                collect_tables_from_twj(twj, tables);
            }
        }
        SetExpr::Query(q) => collect_tables_from_set_expr(&q.body, tables),
        SetExpr::SetOperation { left, right, .. } => {
            collect_tables_from_set_expr(left, tables);
            collect_tables_from_set_expr(right, tables);
        }
        _ => {}
    }
}

/// Public wrapper so statement-specific checkers (`WhitelistRequired`, and
/// anything matching directly on `Statement::Update`/`Delete`) can reuse the
/// same join/derived-table walk without going through a full `Query`.
pub fn extract_tables_from_twj(twj: &TableWithJoins) -> HashSet<String> {
    let mut tables = HashSet::new();
    collect_tables_from_twj(twj, &mut tables);
    tables
}

fn collect_tables_from_twj(twj: &TableWithJoins, tables: &mut HashSet<String>) {
    collect_tables_from_factor(&twj.relation, tables);
    for join in &twj.joins {
        collect_tables_from_factor(&join.relation, tables);
    }
}

fn collect_tables_from_factor(factor: &TableFactor, tables: &mut HashSet<String>) {
    match factor {
        TableFactor::Table { name, .. } => {
            tables.insert(object_name_to_table(name));
        }
        TableFactor::Derived { subquery, .. } => {
            collect_tables_from_set_expr(&subquery.body, tables);
        }
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => {
            collect_tables_from_twj(table_with_joins, tables);
        }
        _ => {}
    }
}

/// Every table a statement reads from or writes to, regardless of
/// statement kind. `Select` delegates to [`extract_tables`]; the write
/// statement shapes each expose their target table(s) directly.
pub fn extract_tables_from_statement(stmt: &Statement) -> HashSet<String> {
    match stmt {
        Statement::Query(query) => extract_tables(query),
        Statement::Update { table, .. } => extract_tables_from_twj(table),
        Statement::Delete { from, .. } => {
            let twjs = match from {
                FromTable::WithFromKeyword(twjs) => twjs,
                FromTable::WithoutKeyword(twjs) => twjs,
            };
            let mut tables = HashSet::new();
            for twj in twjs {
                tables.extend(extract_tables_from_twj(twj));
            }
            tables
        }
        Statement::Insert { table_name, .. } => {
            let mut tables = HashSet::new();
            tables.insert(object_name_to_table(table_name));
            tables
        }
        _ => HashSet::new(),
    }
}

/// Every column identifier reachable from `expr`, with schema/table
/// prefixes stripped (only the last segment of a compound identifier is
/// kept) and literal operands ignored. Function arguments are traversed.
pub fn extract_fields(expr: &Expr) -> HashSet<String> {
    let mut fields = HashSet::new();
    collect_fields(expr, &mut fields);
    fields
}

fn collect_fields(expr: &Expr, fields: &mut HashSet<String>) {
    match expr {
        Expr::Identifier(ident) => {
            fields.insert(ident.value.clone());
        }
        Expr::CompoundIdentifier(parts) => {
            if let Some(last) = parts.last() {
                fields.insert(last.value.clone());
            }
        }
        Expr::BinaryOp { left, right, .. } => {
            collect_fields(left, fields);
            collect_fields(right, fields);
        }
        Expr::UnaryOp { expr, .. } => collect_fields(expr, fields),
        Expr::Nested(inner) => collect_fields(inner, fields),
        Expr::IsNull(inner) | Expr::IsNotNull(inner) => collect_fields(inner, fields),
        Expr::InList { expr, list, .. } => {
            collect_fields(expr, fields);
            for item in list {
                collect_fields(item, fields);
            }
        }
        Expr::InSubquery { expr, .. } => collect_fields(expr, fields),
        Expr::Between {
            expr, low, high, ..
        } => {
            collect_fields(expr, fields);
            collect_fields(low, fields);
            collect_fields(high, fields);
        }
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            collect_fields(expr, fields);
            collect_fields(pattern, fields);
        }
        Expr::Cast { expr, .. } | Expr::TryCast { expr, .. } | Expr::Collate { expr, .. } => {
            collect_fields(expr, fields);
        }
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => {
            if let Some(operand) = operand {
                collect_fields(operand, fields);
            }
            for condition in conditions {
                collect_fields(condition, fields);
            }
            for result in results {
                collect_fields(result, fields);
            }
            if let Some(else_result) = else_result {
                collect_fields(else_result, fields);
            }
        }
        Expr::Tuple(items) => {
            for item in items {
                collect_fields(item, fields);
            }
        }
        Expr::Function(function) => {
            for arg in function_arg_exprs(function) {
                collect_fields(arg, fields);
            }
        }
        _ => {}
    }
}

/// Isolates the one part of the walk that depends on `sqlparser`'s function
/// argument representation, which has changed shape across versions.
fn function_arg_exprs(function: &Function) -> Vec<&Expr> {
    let mut exprs = Vec::new();
    if let FunctionArguments::List(list) = &function.args {
        for arg in &list.args {
            let arg_expr = match arg {
                FunctionArg::Named { arg, .. } => Some(arg),
                FunctionArg::Unnamed(arg) => Some(arg),
                #[allow(unreachable_patterns)]
                _ => None,
            };
            if let Some(FunctionArgExpr::Expr(expr)) = arg_expr {
                exprs.push(expr);
            }
        }
    }
    exprs
}

/// Recursive walk over every function call reachable from `expr`, yielding
/// the bare (unqualified) function name for each. Used by
/// `DangerousFunctions`; kept here since it shares the same argument
/// traversal as the field extractor.
pub fn walk_function_names<'a>(expr: &'a Expr, names: &mut Vec<&'a Ident>) {
    if let Expr::Function(function) = expr {
        if let Some(ident) = function.name.0.last() {
            names.push(ident);
        }
        for arg in function_arg_exprs(function) {
            walk_function_names(arg, names);
        }
        return;
    }
    match expr {
        Expr::BinaryOp { left, right, .. } => {
            walk_function_names(left, names);
            walk_function_names(right, names);
        }
        Expr::UnaryOp { expr, .. }
        | Expr::Nested(expr)
        | Expr::IsNull(expr)
        | Expr::IsNotNull(expr)
        | Expr::Cast { expr, .. }
        | Expr::TryCast { expr, .. }
        | Expr::Collate { expr, .. } => walk_function_names(expr, names),
        Expr::InList { expr, list, .. } => {
            walk_function_names(expr, names);
            for item in list {
                walk_function_names(item, names);
            }
        }
        Expr::Between {
            expr, low, high, ..
        } => {
            walk_function_names(expr, names);
            walk_function_names(low, names);
            walk_function_names(high, names);
        }
        Expr::Like { expr, pattern, .. } | Expr::ILike { expr, pattern, .. } => {
            walk_function_names(expr, names);
            walk_function_names(pattern, names);
        }
        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => {
            if let Some(operand) = operand {
                walk_function_names(operand, names);
            }
            for condition in conditions {
                walk_function_names(condition, names);
            }
            for result in results {
                walk_function_names(result, names);
            }
            if let Some(else_result) = else_result {
                walk_function_names(else_result, names);
            }
        }
        Expr::Tuple(items) => {
            for item in items {
                walk_function_names(item, names);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_exactly_one_further_segment() {
        let set = WildcardSet::new(std::iter::once(&"sys_*".to_string()));
        assert!(set.matches("sys_user"));
        assert!(!set.matches("system"));
        assert!(!set.matches("sys_user_detail"));
    }

    #[test]
    fn wildcard_is_case_insensitive() {
        let set = WildcardSet::new(std::iter::once(&"ADMIN_*".to_string()));
        assert!(set.matches("admin_role"));
    }

    #[test]
    fn exact_pattern_requires_full_match() {
        let set = WildcardSet::new(std::iter::once(&"users".to_string()));
        assert!(set.matches("users"));
        assert!(!set.matches("users2"));
    }

    fn parse(sql: &str) -> Statement {
        use sqlparser::dialect::GenericDialect;
        use sqlparser::parser::Parser;
        Parser::parse_sql(&GenericDialect {}, sql).unwrap().remove(0)
    }

    #[test]
    fn extract_fields_strips_table_prefixes_and_ignores_literals() {
        let stmt = parse("SELECT 1 FROM t WHERE t.id = 5 AND name = 'x'");
        if let Statement::Query(query) = stmt {
            if let SetExpr::Select(select) = *query.body {
                let fields = extract_fields(select.selection.as_ref().unwrap());
                assert!(fields.contains("id"));
                assert!(fields.contains("name"));
                assert_eq!(fields.len(), 2);
            } else {
                panic!("expected a plain select");
            }
        } else {
            panic!("expected a query");
        }
    }

    #[test]
    fn extract_tables_covers_joins_and_derived_tables() {
        let stmt = parse(
            "SELECT * FROM a JOIN b ON a.id = b.id JOIN (SELECT id FROM c) d ON a.id = d.id",
        );
        if let Statement::Query(query) = stmt {
            let tables = extract_tables(&query);
            assert!(tables.contains("a"));
            assert!(tables.contains("b"));
            assert!(tables.contains("c"));
        } else {
            panic!("expected a query");
        }
    }
}
