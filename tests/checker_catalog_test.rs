//! The catalog instantiates every configured checker exactly once, in a
//! stable order, and honors per-checker `enabled` flags.

use sql_safety_core::checker::build_catalog;
use sql_safety_core::config::CheckerCatalogConfig;

const EXPECTED_IDS: &[&str] = &[
    "MissingWhere",
    "DummyPredicate",
    "BlacklistOnlyWhere",
    "WhitelistRequired",
    "LogicalPagination",
    "PaginationWithoutPredicate",
    "DeepOffset",
    "LargePageSize",
    "UnorderedPagination",
    "UnboundedSelect",
    "StackedStatements",
    "SetOperationUse",
    "CommentPresent",
    "FileOut",
    "DangerousFunctions",
    "DdlInDmlContext",
    "ProcedureCall",
    "MetadataQueries",
    "SessionMutation",
    "DeniedTable",
    "ReadOnlyTable",
];

#[test]
fn default_catalog_has_every_checker_in_stable_order() {
    let catalog = build_catalog(&CheckerCatalogConfig::default());
    let ids: Vec<&str> = catalog.iter().map(|c| c.id()).collect();
    assert_eq!(ids, EXPECTED_IDS);
}

#[test]
fn building_the_catalog_twice_from_the_same_config_yields_the_same_order() {
    let config = CheckerCatalogConfig::default();
    let first: Vec<&str> = build_catalog(&config).iter().map(|c| c.id()).collect();
    let second: Vec<&str> = build_catalog(&config).iter().map(|c| c.id()).collect();
    assert_eq!(first, second);
}

#[test]
fn disabling_a_checker_in_config_is_reflected_in_its_enabled_flag() {
    let mut config = CheckerCatalogConfig::default();
    config.dangerous_functions.base.enabled = false;
    let catalog = build_catalog(&config);
    let dangerous_functions = catalog
        .iter()
        .find(|c| c.id() == "DangerousFunctions")
        .expect("DangerousFunctions must still be present in the catalog, just disabled");
    assert!(!dangerous_functions.enabled());
}
