//! Converts raw SQL into an AST exactly once per unique text, absorbing the
//! quirks of the underlying grammar library so nothing downstream touches
//! `sqlparser` directly except through [`ParserFacade::parse`].

pub mod cache;

use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser as SqlGrammarParser;
use tracing::{debug, warn};

use crate::context::ParsedStatement;
use crate::error::{CoreError, Result};
use crate::scanner;
use cache::ShardedLruCache;

/// Default element-count bound for the parse cache (`parseCacheCapacity`).
pub const DEFAULT_PARSE_CACHE_CAPACITY: usize = 10_000;

pub struct ParserFacade {
    cache: ShardedLruCache<ParsedStatement>,
    strict: bool,
}

impl ParserFacade {
    pub fn new(capacity: usize, strict_parse: bool) -> Self {
        Self {
            cache: ShardedLruCache::new(capacity),
            strict: strict_parse,
        }
    }

    /// Parses `sql`, consulting the cache first. In lenient mode a grammar
    /// failure is never an `Err` — it comes back as
    /// `Ok(ParsedStatement::Failed(..))` so raw-text checkers still get to
    /// run. Strict mode surfaces the same failure as `CoreError::ParseFailure`.
    pub fn parse(&self, sql: &str) -> Result<ParsedStatement> {
        let key = normalize(sql);

        if let Some(cached) = self.cache.get(&key) {
            return self.finish(cached);
        }

        let outcome = match SqlGrammarParser::parse_sql(&GenericDialect {}, sql) {
            Ok(mut statements) if !statements.is_empty() => {
                if statements.len() > 1 {
                    debug!(count = statements.len(), "grammar library returned multiple statements, keeping the first");
                }
                ParsedStatement::Parsed(statements.remove(0))
            }
            Ok(_) => ParsedStatement::Failed("grammar library produced no statements".to_string()),
            Err(err) => {
                warn!(error = %err, "sql failed to parse");
                ParsedStatement::Failed(err.to_string())
            }
        };

        self.cache.insert(key, outcome.clone());
        self.finish(outcome)
    }

    fn finish(&self, outcome: ParsedStatement) -> Result<ParsedStatement> {
        match &outcome {
            ParsedStatement::Failed(message) if self.strict => {
                Err(CoreError::ParseFailure(message.clone()))
            }
            _ => Ok(outcome),
        }
    }

    /// Admin-only: drops one entry so its next lookup reparses.
    pub fn evict(&self, sql: &str) {
        self.cache.evict(&normalize(sql));
    }

    /// Admin-only: drops every cached entry.
    pub fn clear(&self) {
        self.cache.clear();
    }
}

/// Normalises `sql` for cache keying: string literals and comments pass
/// through untouched, runs of whitespace outside them collapse to one
/// space, the first keyword token is uppercased, and trailing `;` runs are
/// trimmed. The stored AST is still parsed from the original, un-normalised
/// text — this function only ever produces a cache key.
pub fn normalize(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut first_token_seen = false;
    let mut in_first_token = false;
    let mut last_emitted_space = true;

    scanner::walk(sql, |sc| {
        if !sc.live {
            out.push(sc.ch);
            last_emitted_space = false;
            if in_first_token {
                in_first_token = false;
                first_token_seen = true;
            }
            return;
        }

        if sc.ch.is_whitespace() {
            if !last_emitted_space {
                out.push(' ');
                last_emitted_space = true;
            }
            if in_first_token {
                in_first_token = false;
                first_token_seen = true;
            }
            return;
        }

        last_emitted_space = false;
        if !first_token_seen {
            in_first_token = true;
            out.push(sc.ch.to_ascii_uppercase());
        } else {
            out.push(sc.ch);
        }
    });

    let mut result = out.trim().to_string();
    loop {
        let trimmed = result.trim_end();
        if let Some(stripped) = trimmed.strip_suffix(';') {
            result = stripped.to_string();
        } else {
            result = trimmed.to_string();
            break;
        }
    }
    result
}
