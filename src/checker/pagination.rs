//! Pagination hygiene: checkers built on the shared [`helper`] module that
//! detects and measures LIMIT/TOP/FETCH/OFFSET/ROWNUM pagination across
//! dialects.

use sqlparser::ast::{Query, Select, SetExpr, Statement};

use crate::checker::{extract_fields, Checker, WildcardSet};
use crate::config::{
    BlacklistOnlyWhereConfig, LogicalPaginationConfig, PaginationWithoutPredicateConfig,
    ThresholdCheckerConfig, UnboundedSelectConfig, UnorderedPaginationConfig,
};
use crate::context::SqlContext;
use crate::result::{RiskLevel, ValidationResult};

pub mod helper {
    use sqlparser::ast::{Expr, Query, Select, SetExpr, Value};

    use crate::scanner;

    /// True if the AST exposes LIMIT, TOP, FETCH FIRST/NEXT or OFFSET, or
    /// the raw SQL contains a standalone `ROWNUM` / `ROW_NUMBER() OVER`
    /// outside a string literal — neither of which `sqlparser` models as
    /// pagination syntax, so raw text is the only reliable signal for them.
    pub fn has_pagination(query: &Query, raw_sql: &str) -> bool {
        if query.limit.is_some() || query.offset.is_some() || query.fetch.is_some() {
            return true;
        }
        if let Some(select) = primary_select(query) {
            if select.top.is_some() {
                return true;
            }
        }
        has_rownum_pagination(raw_sql)
    }

    /// The Select body of `query`, when it isn't a set operation
    /// (UNION/INTERSECT/...) wrapping more than one branch.
    pub fn primary_select(query: &Query) -> Option<&Select> {
        match query.body.as_ref() {
            SetExpr::Select(select) => Some(select.as_ref()),
            SetExpr::Query(inner) => primary_select(inner),
            _ => None,
        }
    }

    fn has_rownum_pagination(raw_sql: &str) -> bool {
        let mut token = String::new();
        let mut found = false;
        scanner::walk(raw_sql, |sc| {
            if found {
                return;
            }
            if sc.live && (sc.ch.is_alphanumeric() || sc.ch == '_') {
                token.push(sc.ch.to_ascii_uppercase());
                return;
            }
            if token == "ROWNUM" || token == "ROW_NUMBER" {
                found = true;
            }
            token.clear();
        });
        found || token == "ROWNUM" || token == "ROW_NUMBER"
    }

    fn expr_as_u64(expr: &Expr) -> Option<u64> {
        match expr {
            Expr::Value(Value::Number(n, _)) => n.parse::<u64>().ok(),
            _ => None,
        }
    }

    /// Numeric page size if the grammar node is a literal; `None` for
    /// parameter markers or when no size-bearing clause is present.
    pub fn extract_page_size(query: &Query) -> Option<u64> {
        if let Some(limit) = &query.limit {
            if let Some(n) = expr_as_u64(limit) {
                return Some(n);
            }
        }
        if let Some(fetch) = &query.fetch {
            if let Some(quantity) = &fetch.quantity {
                if let Some(n) = expr_as_u64(quantity) {
                    return Some(n);
                }
            }
        }
        None
    }

    /// Numeric offset if the grammar node is a literal, handling both
    /// standard `OFFSET n` and the MySQL `LIMIT offset, count` shorthand
    /// (which `sqlparser` also surfaces through the `offset` field).
    pub fn extract_offset(query: &Query) -> Option<u64> {
        query.offset.as_ref().and_then(|offset| expr_as_u64(&offset.value))
    }
}

fn select_from_stmt(stmt: &Statement) -> Option<&Query> {
    match stmt {
        Statement::Query(query) => Some(query.as_ref()),
        _ => None,
    }
}

fn where_fields_all_blacklisted(select: &Select, blacklist: &WildcardSet) -> bool {
    match &select.selection {
        None => false,
        Some(predicate) => {
            let fields = extract_fields(predicate);
            !fields.is_empty() && fields.iter().all(|f| blacklist.matches(f))
        }
    }
}

pub struct LogicalPagination {
    enabled: bool,
    risk_level: RiskLevel,
}

impl LogicalPagination {
    pub fn new(config: &LogicalPaginationConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
        }
    }
}

impl Checker for LogicalPagination {
    fn id(&self) -> &'static str {
        "LogicalPagination"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, stmt: &Statement, ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(query) = select_from_stmt(stmt) else { return };
        let Some(hint) = ctx.pagination_hint() else { return };
        if hint.limit > 0 && !helper::has_pagination(query, ctx.raw_sql()) {
            result.add_violation(
                self.risk_level,
                self.id(),
                "the host asserted pagination was applied but the SQL text carries no LIMIT/TOP/FETCH/OFFSET",
                "add an explicit LIMIT/OFFSET (or dialect equivalent) to the query text",
            );
        }
    }
}

pub struct PaginationWithoutPredicate {
    enabled: bool,
    risk_level: RiskLevel,
}

impl PaginationWithoutPredicate {
    pub fn new(config: &PaginationWithoutPredicateConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Critical),
        }
    }
}

impl Checker for PaginationWithoutPredicate {
    fn id(&self) -> &'static str {
        "PaginationWithoutPredicate"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, stmt: &Statement, ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(query) = select_from_stmt(stmt) else { return };
        if !helper::has_pagination(query, ctx.raw_sql()) {
            return;
        }
        if let Some(select) = helper::primary_select(query) {
            if select.selection.is_none() {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    "pagination is present but WHERE is absent, so the page is taken over an unfiltered scan",
                    "add a selective WHERE predicate alongside the pagination clause",
                );
            }
        }
    }
}

pub struct DeepOffset {
    enabled: bool,
    risk_level: RiskLevel,
    threshold: u64,
}

impl DeepOffset {
    pub fn new(config: &ThresholdCheckerConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Medium),
            threshold: config.threshold,
        }
    }
}

impl Checker for DeepOffset {
    fn id(&self) -> &'static str {
        "DeepOffset"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(query) = select_from_stmt(stmt) else { return };
        if let Some(offset) = helper::extract_offset(query) {
            if offset > self.threshold {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    format!("offset {offset} exceeds the configured threshold of {}", self.threshold),
                    "use keyset pagination instead of a deep numeric offset",
                );
            }
        }
    }
}

pub struct LargePageSize {
    enabled: bool,
    risk_level: RiskLevel,
    threshold: u64,
}

impl LargePageSize {
    pub fn new(config: &ThresholdCheckerConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Medium),
            threshold: config.threshold,
        }
    }
}

impl Checker for LargePageSize {
    fn id(&self) -> &'static str {
        "LargePageSize"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Medium
    }

    fn on_select(&self, stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(query) = select_from_stmt(stmt) else { return };
        if let Some(size) = helper::extract_page_size(query) {
            if size > self.threshold {
                result.add_violation(
                    self.risk_level,
                    self.id(),
                    format!("page size {size} exceeds the configured threshold of {}", self.threshold),
                    "lower the page size or stream the result instead",
                );
            }
        }
    }
}

pub struct UnorderedPagination {
    enabled: bool,
    risk_level: RiskLevel,
}

impl UnorderedPagination {
    pub fn new(config: &UnorderedPaginationConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level: config.base.effective_risk_level(RiskLevel::Low),
        }
    }
}

impl Checker for UnorderedPagination {
    fn id(&self) -> &'static str {
        "UnorderedPagination"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn on_select(&self, stmt: &Statement, ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(query) = select_from_stmt(stmt) else { return };
        if helper::has_pagination(query, ctx.raw_sql()) && query.order_by.is_empty() {
            result.add_violation(
                self.risk_level,
                self.id(),
                "pagination without ORDER BY returns a non-deterministic page across calls",
                "add an ORDER BY covering a unique or near-unique key",
            );
        }
    }
}

pub struct UnboundedSelect {
    enabled: bool,
    risk_level_override: Option<RiskLevel>,
    blacklist: WildcardSet,
}

impl UnboundedSelect {
    pub fn new(config: &UnboundedSelectConfig, blacklist: &BlacklistOnlyWhereConfig) -> Self {
        Self {
            enabled: config.base.enabled,
            risk_level_override: config.base.risk_level,
            blacklist: WildcardSet::new(blacklist.fields.iter()),
        }
    }
}

impl Checker for UnboundedSelect {
    fn id(&self) -> &'static str {
        "UnboundedSelect"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, stmt: &Statement, ctx: &SqlContext, result: &mut ValidationResult) {
        let Some(query) = select_from_stmt(stmt) else { return };
        if helper::has_pagination(query, ctx.raw_sql()) {
            return;
        }
        let Some(select) = helper::primary_select(query) else { return };

        let escalated = if select.selection.is_none() {
            RiskLevel::Critical
        } else if where_fields_all_blacklisted(select, &self.blacklist) {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };
        let risk_level = self.risk_level_override.unwrap_or(escalated);

        result.add_violation(
            risk_level,
            self.id(),
            "SELECT has no pagination at all and will return its entire result set",
            "add LIMIT/OFFSET (or dialect equivalent) bounded to a sane page size",
        );
    }
}
