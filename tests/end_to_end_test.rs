//! The literal end-to-end scenarios: one input, one exact expected outcome.

use sql_safety_core::config::CoreConfig;
use sql_safety_core::context::PaginationHint;
use sql_safety_core::result::RiskLevel;
use sql_safety_core::validator::{ValidationRequest, Validator};

/// Wires up a subscriber so `cargo test -- --nocapture` surfaces the
/// `tracing` spans the validator emits on its hot path. Idempotent: every
/// test calls it, only the first call installs anything.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn unfiltered_delete_yields_exactly_one_missing_where_violation() {
    init_tracing();
    let validator = Validator::new(CoreConfig::default()).unwrap();
    let result = validator
        .validate(ValidationRequest::new("DELETE FROM users"))
        .unwrap();

    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].checker_id, "MissingWhere");
    assert_eq!(result.risk_level(), RiskLevel::Critical);
    assert!(result.violations()[0].message.contains("WHERE"));
}

#[test]
fn blacklist_only_where_flags_soft_delete_flag_alone() {
    let mut config = CoreConfig::default();
    config.checkers.blacklist_only_where.fields.insert("deleted".to_string());
    config.checkers.blacklist_only_where.fields.insert("status".to_string());
    let validator = Validator::new(config).unwrap();

    let result = validator
        .validate(ValidationRequest::new(
            "SELECT * FROM users WHERE deleted = 0",
        ))
        .unwrap();

    // UnboundedSelect is also enabled by default and fires on this same
    // query (no LIMIT, sole predicate field is blacklisted); isolate the
    // violation this test is actually about.
    let blacklist_violations: Vec<_> = result
        .violations()
        .iter()
        .filter(|v| v.checker_id == "BlacklistOnlyWhere")
        .collect();

    assert_eq!(blacklist_violations.len(), 1);
    assert_eq!(blacklist_violations[0].risk_level, RiskLevel::High);
    assert!(blacklist_violations[0].message.contains("deleted"));
}

#[test]
fn stacked_statement_with_trailing_comment_is_critical_on_both_checkers() {
    let validator = Validator::new(CoreConfig::default()).unwrap();
    let result = validator
        .validate(ValidationRequest::new(
            "SELECT * FROM users; DROP TABLE users--",
        ))
        .unwrap();

    let ids: Vec<&str> = result.violations().iter().map(|v| v.checker_id).collect();
    assert!(ids.contains(&"StackedStatements"));
    assert!(ids.contains(&"CommentPresent"));
    assert_eq!(result.risk_level(), RiskLevel::Critical);
}

fn denied_table_validator() -> Validator {
    let mut config = CoreConfig::default();
    config.checkers.denied_table.patterns.insert("sys_*".to_string());
    config.checkers.denied_table.patterns.insert("admin_*".to_string());
    Validator::new(config).unwrap()
}

#[test]
fn denied_table_flags_wildcard_match_but_not_lookalike_table() {
    let validator = denied_table_validator();

    let result = validator
        .validate(ValidationRequest::new("SELECT * FROM sys_user WHERE id=1"))
        .unwrap();
    assert!(result
        .violations()
        .iter()
        .any(|v| v.checker_id == "DeniedTable" && v.message.contains("sys_user")));
    assert_eq!(result.risk_level(), RiskLevel::Critical);

    let result = validator
        .validate(ValidationRequest::new("SELECT * FROM system WHERE id=1"))
        .unwrap();
    assert!(!result
        .violations()
        .iter()
        .any(|v| v.checker_id == "DeniedTable"));
}

#[test]
fn update_with_inline_set_clause_is_not_a_session_mutation() {
    let validator = Validator::new(CoreConfig::default()).unwrap();
    let result = validator
        .validate(ValidationRequest::new(
            "UPDATE users SET name='x' WHERE id=1",
        ))
        .unwrap();
    assert!(!result
        .violations()
        .iter()
        .any(|v| v.checker_id == "SessionMutation"));
}

#[test]
fn pagination_hint_without_limit_text_triggers_logical_pagination() {
    let validator = Validator::new(CoreConfig::default()).unwrap();
    let result = validator
        .validate(
            ValidationRequest::new("SELECT * FROM users")
                .pagination_hint(PaginationHint { offset: 0, limit: 20 }),
        )
        .unwrap();
    assert!(result
        .violations()
        .iter()
        .any(|v| v.checker_id == "LogicalPagination"));
    assert_eq!(result.risk_level(), RiskLevel::Critical);
}

#[test]
fn same_sql_with_no_hint_and_no_pagination_is_flagged_unbounded_select() {
    let validator = Validator::new(CoreConfig::default()).unwrap();
    let result = validator
        .validate(ValidationRequest::new("SELECT * FROM users"))
        .unwrap();
    let unbounded = result
        .violations()
        .iter()
        .find(|v| v.checker_id == "UnboundedSelect")
        .expect("UnboundedSelect should fire for a WHERE-less, unpaginated SELECT");
    assert_eq!(unbounded.risk_level, RiskLevel::Critical);
}
