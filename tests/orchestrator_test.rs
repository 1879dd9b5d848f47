//! The orchestrator never lets one checker's failure stop the others, and
//! dispatches raw-only checkers regardless of statement kind.

use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use sql_safety_core::checker::Checker;
use sql_safety_core::context::{ParsedStatement, SqlContext};
use sql_safety_core::orchestrator::Orchestrator;
use sql_safety_core::result::{RiskLevel, ValidationResult};

struct PanicsOnSelect;

impl Checker for PanicsOnSelect {
    fn id(&self) -> &'static str {
        "PanicsOnSelect"
    }

    fn enabled(&self) -> bool {
        true
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Low
    }

    fn on_select(&self, _stmt: &Statement, _ctx: &SqlContext, _result: &mut ValidationResult) {
        panic!("boom");
    }
}

struct AlwaysFlagsCritical;

impl Checker for AlwaysFlagsCritical {
    fn id(&self) -> &'static str {
        "AlwaysFlagsCritical"
    }

    fn enabled(&self) -> bool {
        true
    }

    fn default_risk_level(&self) -> RiskLevel {
        RiskLevel::Critical
    }

    fn on_select(&self, _stmt: &Statement, _ctx: &SqlContext, result: &mut ValidationResult) {
        result.add_violation(RiskLevel::Critical, self.id(), "always fires", "n/a");
    }
}

fn ctx_for(sql: &str) -> SqlContext {
    let stmt = Parser::parse_sql(&GenericDialect {}, sql).unwrap().remove(0);
    SqlContext::builder(sql)
        .statement(ParsedStatement::Parsed(stmt))
        .build()
        .unwrap()
}

#[test]
fn a_panicking_checker_is_isolated_and_the_rest_still_run() {
    let orchestrator = Orchestrator::new(vec![
        Box::new(PanicsOnSelect),
        Box::new(AlwaysFlagsCritical),
    ]);
    let ctx = ctx_for("SELECT * FROM users WHERE id = 1");

    let result = orchestrator.orchestrate(&ctx);

    assert!(result
        .violations()
        .iter()
        .any(|v| v.checker_id == "AlwaysFlagsCritical"));
    assert!(result
        .violations()
        .iter()
        .any(|v| v.checker_id == "PanicsOnSelect" && v.risk_level == RiskLevel::Low));
    assert_eq!(result.risk_level(), RiskLevel::Critical);
}
