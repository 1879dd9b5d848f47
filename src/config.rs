//! Configuration schema accepted by the validator at startup and on
//! reconfigure. This crate never loads configuration itself — file, env and
//! remote config centers are a host concern — but it validates eagerly
//! whatever tree the host hands it, so a bad value fails fast at
//! construction instead of silently degrading a checker at validation time.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::result::RiskLevel;

fn default_true() -> bool {
    true
}

/// Global knobs shared by the parser façade and the dedup filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub strict_parse: bool,
    pub parse_cache_capacity: usize,
    pub dedup_cache_capacity: usize,
    pub dedup_ttl_ms: u64,
    pub checkers: CheckerCatalogConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            strict_parse: false,
            parse_cache_capacity: 10_000,
            dedup_cache_capacity: 1000,
            dedup_ttl_ms: 100,
            checkers: CheckerCatalogConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Eagerly checks every value the catalog cares about. Called once at
    /// construction; `validate()` on a running validator never calls this
    /// again mid-flight.
    pub fn validate(&self) -> Result<()> {
        if self.parse_cache_capacity == 0 {
            return Err(CoreError::Config(
                "parseCacheCapacity must be greater than zero".into(),
            ));
        }
        if self.dedup_cache_capacity == 0 {
            return Err(CoreError::Config(
                "dedupCacheCapacity must be greater than zero".into(),
            ));
        }
        self.checkers.validate()
    }
}

/// Baseline gate every checker config shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseCheckerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub risk_level: Option<RiskLevel>,
}

impl Default for BaseCheckerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            risk_level: None,
        }
    }
}

impl BaseCheckerConfig {
    pub fn effective_risk_level(&self, default: RiskLevel) -> RiskLevel {
        self.risk_level.unwrap_or(default)
    }
}

macro_rules! plain_checker_config {
    ($name:ident) => {
        #[derive(Debug, Clone, Serialize, Deserialize, Default)]
        #[serde(default)]
        pub struct $name {
            #[serde(flatten)]
            pub base: BaseCheckerConfig,
        }
    };
}

plain_checker_config!(MissingWhereConfig);
plain_checker_config!(PaginationWithoutPredicateConfig);
plain_checker_config!(UnorderedPaginationConfig);
plain_checker_config!(LogicalPaginationConfig);
plain_checker_config!(StackedStatementsConfig);
plain_checker_config!(ProcedureCallConfig);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DummyPredicateConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub extra_patterns: Vec<String>,
}

impl Default for DummyPredicateConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            extra_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlacklistOnlyWhereConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub fields: HashSet<String>,
}

impl Default for BlacklistOnlyWhereConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            fields: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhitelistRequiredConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub by_table: HashMap<String, HashSet<String>>,
    pub enforce_for_unknown_tables: bool,
    pub global_fields: HashSet<String>,
}

impl Default for WhitelistRequiredConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            by_table: HashMap::new(),
            enforce_for_unknown_tables: false,
            global_fields: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdCheckerConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub threshold: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnboundedSelectConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
}

impl Default for UnboundedSelectConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetOperationUseConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub allowed_operations: HashSet<String>,
}

impl Default for SetOperationUseConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            allowed_operations: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentPresentConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub allow_optimizer_hints: bool,
}

impl Default for CommentPresentConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            allow_optimizer_hints: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DangerousFunctionsConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub denied_functions: HashSet<String>,
}

impl Default for DangerousFunctionsConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            denied_functions: [
                "load_file",
                "sleep",
                "benchmark",
                "sys_exec",
                "sys_eval",
                "into_outfile",
                "into_dumpfile",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DdlInDmlContextConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub allowed_operations: HashSet<String>,
}

impl Default for DdlInDmlContextConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            allowed_operations: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataQueriesConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub allowed_statements: HashSet<String>,
}

impl Default for MetadataQueriesConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            allowed_statements: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTableConfig {
    #[serde(flatten)]
    pub base: BaseCheckerConfig,
    pub patterns: HashSet<String>,
}

impl Default for PatternTableConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            patterns: HashSet::new(),
        }
    }
}

impl Default for ThresholdCheckerConfig {
    fn default() -> Self {
        Self {
            base: BaseCheckerConfig::default(),
            threshold: 0,
        }
    }
}

fn default_deep_offset() -> ThresholdCheckerConfig {
    ThresholdCheckerConfig {
        base: BaseCheckerConfig::default(),
        threshold: 1000,
    }
}

fn default_large_page_size() -> ThresholdCheckerConfig {
    ThresholdCheckerConfig {
        base: BaseCheckerConfig::default(),
        threshold: 500,
    }
}

/// One slot per checker in the catalog. `enabled: false` removes a checker
/// from the orchestrator's run list entirely rather than leaving it to
/// no-op, so a disabled catalog costs nothing at validation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerCatalogConfig {
    pub missing_where: MissingWhereConfig,
    pub dummy_predicate: DummyPredicateConfig,
    pub blacklist_only_where: BlacklistOnlyWhereConfig,
    pub whitelist_required: WhitelistRequiredConfig,

    pub logical_pagination: LogicalPaginationConfig,
    pub pagination_without_predicate: PaginationWithoutPredicateConfig,
    pub deep_offset: ThresholdCheckerConfig,
    pub large_page_size: ThresholdCheckerConfig,
    pub unordered_pagination: UnorderedPaginationConfig,
    pub unbounded_select: UnboundedSelectConfig,

    pub stacked_statements: StackedStatementsConfig,
    pub set_operation_use: SetOperationUseConfig,
    pub comment_present: CommentPresentConfig,
    pub file_out: BaseCheckerConfig,
    pub dangerous_functions: DangerousFunctionsConfig,

    pub ddl_in_dml_context: DdlInDmlContextConfig,
    pub procedure_call: ProcedureCallConfig,
    pub metadata_queries: MetadataQueriesConfig,
    pub session_mutation: BaseCheckerConfig,
    pub denied_table: PatternTableConfig,
    pub read_only_table: PatternTableConfig,
}

impl Default for CheckerCatalogConfig {
    fn default() -> Self {
        Self {
            missing_where: MissingWhereConfig::default(),
            dummy_predicate: DummyPredicateConfig::default(),
            blacklist_only_where: BlacklistOnlyWhereConfig::default(),
            whitelist_required: WhitelistRequiredConfig::default(),

            logical_pagination: LogicalPaginationConfig::default(),
            pagination_without_predicate: PaginationWithoutPredicateConfig::default(),
            deep_offset: default_deep_offset(),
            large_page_size: default_large_page_size(),
            unordered_pagination: UnorderedPaginationConfig::default(),
            unbounded_select: UnboundedSelectConfig::default(),

            stacked_statements: StackedStatementsConfig::default(),
            set_operation_use: SetOperationUseConfig::default(),
            comment_present: CommentPresentConfig::default(),
            file_out: BaseCheckerConfig::default(),
            dangerous_functions: DangerousFunctionsConfig::default(),

            ddl_in_dml_context: DdlInDmlContextConfig::default(),
            procedure_call: ProcedureCallConfig::default(),
            metadata_queries: MetadataQueriesConfig::default(),
            session_mutation: BaseCheckerConfig::default(),
            denied_table: PatternTableConfig::default(),
            read_only_table: PatternTableConfig::default(),
        }
    }
}

const VALID_SET_OPERATIONS: &[&str] = &["UNION", "UNION_ALL", "INTERSECT", "MINUS", "EXCEPT"];

impl CheckerCatalogConfig {
    fn validate(&self) -> Result<()> {
        for op in &self.set_operation_use.allowed_operations {
            let upper = op.to_ascii_uppercase();
            if !VALID_SET_OPERATIONS.contains(&upper.as_str()) {
                return Err(CoreError::Config(format!(
                    "setOperationUse.allowedOperations: unknown operation '{op}'"
                )));
            }
        }
        if self.deep_offset.threshold == 0 {
            return Err(CoreError::Config(
                "deepOffset.threshold must be greater than zero".into(),
            ));
        }
        if self.large_page_size.threshold == 0 {
            return Err(CoreError::Config(
                "largePageSize.threshold must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        CoreConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_parse_cache_capacity_is_rejected() {
        let mut config = CoreConfig::default();
        config.parse_cache_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_set_operation_is_rejected() {
        let mut config = CoreConfig::default();
        config
            .checkers
            .set_operation_use
            .allowed_operations
            .insert("FULL_OUTER_JOIN".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn dangerous_functions_default_list_is_populated() {
        let config = CoreConfig::default();
        assert!(config
            .checkers
            .dangerous_functions
            .denied_functions
            .contains("sleep"));
    }
}
