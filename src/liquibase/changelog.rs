use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

/// Root of a Liquibase YAML changelog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    #[serde(rename = "databaseChangeLog")]
    pub change_sets: Vec<ChangeSetEntry>,
}

/// List item of `databaseChangeLog`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSetEntry {
    #[serde(rename = "changeSet")]
    pub change_set: ChangeSet,
}

impl From<ChangeSet> for ChangeSetEntry {
    fn from(change_set: ChangeSet) -> Self {
        Self { change_set }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub id: String,
    pub author: String,
    pub changes: Vec<Change>,
}

/// One entry of `changes`. A struct rather than an enum: serde_yaml 0.9
/// writes enum variants as YAML tags, which Liquibase does not read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub insert: Insert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insert {
    pub table_name: String,
    pub columns: Vec<ColumnEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnEntry {
    pub column: Column,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub value: Value,
}

impl ColumnEntry {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            column: Column {
                name: name.into(),
                value,
            },
        }
    }
}

impl ChangeSet {
    pub fn insert(id: String, author: &str, table: &str, columns: Vec<ColumnEntry>) -> Self {
        Self {
            id,
            author: author.to_string(),
            changes: vec![Change {
                insert: Insert {
                    table_name: table.to_string(),
                    columns,
                },
            }],
        }
    }
}

pub fn write_changelog(path: &Path, changelog: &ChangeLog) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let yaml = serde_yaml::to_string(changelog)?;
    fs::write(path, yaml)?;
    info!(
        "Wrote {} changesets to {}",
        changelog.change_sets.len(),
        path.display()
    );
    Ok(())
}
