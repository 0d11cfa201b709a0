//! JSON Schema generation for CLI output types.
//!
//! Every command that supports `--json` has an entry here. Schemas are
//! generated with schemars and exported via the `schema` subcommand.

use schemars::{schema_for, Schema};
use std::collections::BTreeMap;

/// All JSON schemas, keyed by command name. BTreeMap keeps the output diffable.
pub fn all_schemas() -> BTreeMap<&'static str, Schema> {
    let mut schemas = BTreeMap::new();

    schemas.insert("analyze", schema_for!(crate::cmd::analyze::AnalyzeJsonOutput));
    schemas.insert("check", schema_for!(sql_testbed::container::AvailabilityReport));
    schemas.insert("db", schema_for!(crate::cmd::db::ProvisionJsonOutput));
    schemas.insert("env", schema_for!(crate::cmd::db::ProvisionJsonOutput));
    schemas.insert("generate", schema_for!(crate::cmd::generate::GenerateJsonOutput));
    schemas.insert("order", schema_for!(crate::cmd::order::OrderJsonOutput));

    schemas
}

pub fn get_schema(command: &str) -> Option<Schema> {
    all_schemas().remove(command)
}

pub fn schema_names() -> Vec<&'static str> {
    all_schemas().keys().copied().collect()
}
