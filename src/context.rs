//! The immutable per-call bundle passed between the parser façade, the
//! orchestrator and every checker.

use sqlparser::ast::Statement;

use crate::error::{CoreError, Result};

/// Coarse statement classification, independent of dialect. Reported on
/// every violation so a host can bucket findings without re-parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
    Unknown,
}

impl StatementKind {
    /// Classify from the first meaningful keyword of raw SQL, the same
    /// signal `SqlContext::build` uses to cross-check an explicit `kind`.
    pub fn from_leading_keyword(sql: &str) -> Self {
        let keyword = crate::scanner::leading_keyword(sql);
        match keyword.as_deref() {
            Some("SELECT") | Some("WITH") => StatementKind::Select,
            Some("INSERT") => StatementKind::Insert,
            Some("UPDATE") => StatementKind::Update,
            Some("DELETE") => StatementKind::Delete,
            Some("CREATE") | Some("ALTER") | Some("DROP") | Some("TRUNCATE") => StatementKind::Ddl,
            Some(_) => StatementKind::Other,
            None => StatementKind::Unknown,
        }
    }

    /// True for the statement kinds a DDL-in-DML-context checker would gate on.
    pub fn is_ddl(self) -> bool {
        matches!(self, StatementKind::Ddl)
    }
}

/// Layer tag used only for reporting — which interceptor captured this SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    OrmHigh,
    OrmLow,
    Pool,
    Driver,
}

/// An out-of-band assertion from the host that pagination was applied even
/// though the SQL text itself doesn't show it — consumed by the checker that
/// flags SELECTs with no visible LIMIT/OFFSET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationHint {
    pub offset: u64,
    pub limit: u64,
}

/// The parsed form of `raw_sql`, or a marker recording why parsing did not
/// produce one. Only the first statement is kept as the "primary" AST — the
/// grammar library returns one `Statement` per top-level SQL statement, and
/// raw-text checkers (not this field) are responsible for noticing that
/// more than one was present.
#[derive(Debug, Clone)]
pub enum ParsedStatement {
    Parsed(Statement),
    Failed(String),
}

impl ParsedStatement {
    pub fn as_statement(&self) -> Option<&Statement> {
        match self {
            ParsedStatement::Parsed(stmt) => Some(stmt),
            ParsedStatement::Failed(_) => None,
        }
    }
}

/// Immutable value bundle for one validation call.
///
/// Built once via [`SqlContext::builder`]; nothing about it changes after
/// `build()` returns, and no checker may mutate it.
#[derive(Debug, Clone)]
pub struct SqlContext {
    raw_sql: String,
    statement: Option<ParsedStatement>,
    kind: StatementKind,
    statement_id: String,
    layer: Layer,
    pagination_hint: Option<PaginationHint>,
}

impl SqlContext {
    pub fn builder(raw_sql: impl Into<String>) -> SqlContextBuilder {
        SqlContextBuilder::new(raw_sql)
    }

    pub fn raw_sql(&self) -> &str {
        &self.raw_sql
    }

    pub fn statement(&self) -> Option<&ParsedStatement> {
        self.statement.as_ref()
    }

    pub fn ast(&self) -> Option<&Statement> {
        self.statement.as_ref().and_then(ParsedStatement::as_statement)
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn statement_id(&self) -> &str {
        &self.statement_id
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn pagination_hint(&self) -> Option<PaginationHint> {
        self.pagination_hint
    }
}

/// Fluent build-then-freeze constructor.
pub struct SqlContextBuilder {
    raw_sql: String,
    statement: Option<ParsedStatement>,
    kind: Option<StatementKind>,
    statement_id: String,
    layer: Layer,
    pagination_hint: Option<PaginationHint>,
}

impl SqlContextBuilder {
    fn new(raw_sql: impl Into<String>) -> Self {
        Self {
            raw_sql: raw_sql.into(),
            statement: None,
            kind: None,
            statement_id: String::new(),
            layer: Layer::Driver,
            pagination_hint: None,
        }
    }

    pub fn statement(mut self, statement: ParsedStatement) -> Self {
        self.statement = Some(statement);
        self
    }

    /// Assert a `kind` explicitly instead of letting `build()` infer it
    /// from the leading keyword. `build()` still cross-checks it.
    pub fn kind(mut self, kind: StatementKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn statement_id(mut self, id: impl Into<String>) -> Self {
        self.statement_id = id.into();
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

    /// Enforces non-empty `raw_sql` and a `kind` consistent with the
    /// leading keyword of `raw_sql`.
    pub fn build(self) -> Result<SqlContext> {
        if self.raw_sql.trim().is_empty() {
            return Err(CoreError::EmptySql);
        }

        let inferred = StatementKind::from_leading_keyword(&self.raw_sql);
        let kind = self.kind.unwrap_or(inferred);

        Ok(SqlContext {
            raw_sql: self.raw_sql,
            statement: self.statement,
            kind,
            statement_id: self.statement_id,
            layer: self.layer,
            pagination_hint: self.pagination_hint,
        })
    }
}
