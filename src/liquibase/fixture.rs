use super::changelog::{ChangeLog, ChangeSet, ChangeSetEntry, ColumnEntry};
use crate::error::{OpsError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Strings verbatim, other scalars stringified
    #[default]
    Text,
    /// Compact JSON document
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    /// Record field to read; defaults to the column name
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub encoding: Encoding,
}

impl ColumnSpec {
    pub fn source_field(&self) -> &str {
        self.field.as_deref().unwrap_or(&self.name)
    }
}

fn default_id_field() -> String {
    "id".to_string()
}

/// How a list of records maps onto insert changesets for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSpec {
    pub table: String,
    pub prefix: String,
    pub author: String,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// Column that receives the record id, if any
    #[serde(default)]
    pub id_column: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    /// Static metadata written to a `metadata` JSON column
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

pub fn load_fixture_spec(path: &Path) -> Result<FixtureSpec> {
    let raw = fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

/// A JSON or YAML list of objects, chosen by file extension
pub fn load_records(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let raw = fs::read_to_string(path)?;
    let values: Vec<Value> = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&raw)?,
        _ => serde_yaml::from_str(&raw)?,
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(map) => Ok(map),
            other => Err(OpsError::Config(format!(
                "record {index} in {} is not an object: {other}",
                path.display()
            ))),
        })
        .collect()
}

fn scalar_text(value: &Value) -> Value {
    match value {
        Value::String(_) | Value::Null => value.clone(),
        other => Value::String(other.to_string()),
    }
}

fn encode(value: &Value, encoding: Encoding) -> Value {
    match encoding {
        Encoding::Text => scalar_text(value),
        Encoding::Json => Value::String(value.to_string()),
    }
}

/// Same value with every object's keys in sorted order
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonical(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}

/// `<prefix>-<record id>-<first 8 hex chars of sha256(record json)>`
pub fn changeset_id(prefix: &str, record_id: &str, record: &Map<String, Value>) -> String {
    let canonical = canonical(&Value::Object(record.clone())).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    let hash = hex::encode(digest);
    format!("{prefix}-{record_id}-{}", &hash[..8])
}

pub fn build_changelog(
    spec: &FixtureSpec,
    records: &[Map<String, Value>],
    generated_at: DateTime<Utc>,
) -> Result<ChangeLog> {
    let mut change_sets: Vec<ChangeSetEntry> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let record_id = match record.get(&spec.id_field) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(OpsError::MissingField(format!(
                    "{} in record {index}",
                    spec.id_field
                )))
            }
        };

        let id = changeset_id(&spec.prefix, &record_id, record);
        let row_id = Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes());

        let mut columns = vec![ColumnEntry::new("id", Value::String(row_id.to_string()))];
        if let Some(id_column) = &spec.id_column {
            columns.push(ColumnEntry::new(id_column.as_str(), Value::String(record_id.clone())));
        }
        for column in &spec.columns {
            let value = record.get(column.source_field()).unwrap_or(&Value::Null);
            columns.push(ColumnEntry::new(column.name.as_str(), encode(value, column.encoding)));
        }
        if let Some(metadata) = &spec.metadata {
            let mut metadata = metadata.clone();
            metadata.insert(
                "created_at".to_string(),
                Value::String(generated_at.to_rfc3339()),
            );
            columns.push(ColumnEntry::new(
                "metadata",
                Value::String(Value::Object(metadata).to_string()),
            ));
        }

        change_sets.push(ChangeSet::insert(id, &spec.author, &spec.table, columns).into());
    }

    Ok(ChangeLog { change_sets })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn spec() -> FixtureSpec {
        toml::from_str(
            r#"
table = "narrative.npc_definitions"
prefix = "npcs"
author = "fixtures"
id_column = "npc_id"

[[columns]]
name = "name"

[[columns]]
name = "appearance"
encoding = "json"

[[columns]]
name = "level"
field = "stats_level"

[metadata]
version = "2.0.0"
city = "Houston"
"#,
        )
        .unwrap()
    }

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn changeset_id_is_stable_and_content_addressed() {
        let a = record(json!({"id": "vendor", "name": "Rosa"}));
        let b = record(json!({"name": "Rosa", "id": "vendor"}));
        let c = record(json!({"id": "vendor", "name": "Rosa Diaz"}));

        let id = changeset_id("npcs", "vendor", &a);
        assert!(id.starts_with("npcs-vendor-"));
        assert_eq!(id.len(), "npcs-vendor-".len() + 8);
        assert_eq!(id, changeset_id("npcs", "vendor", &b));
        assert_ne!(id, changeset_id("npcs", "vendor", &c));
    }

    #[test]
    fn builds_insert_columns_in_order() {
        let at = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let records = vec![record(json!({
            "id": "fixer-1",
            "name": "Ñandú",
            "appearance": {"eyes": "chrome"},
            "stats_level": 12
        }))];

        let changelog = build_changelog(&spec(), &records, at).unwrap();
        assert_eq!(changelog.change_sets.len(), 1);

        let set = &changelog.change_sets[0].change_set;
        assert_eq!(set.author, "fixtures");
        let insert = &set.changes[0].insert;
        assert_eq!(insert.table_name, "narrative.npc_definitions");

        let names: Vec<&str> = insert.columns.iter().map(|c| c.column.name.as_str()).collect();
        assert_eq!(names, ["id", "npc_id", "name", "appearance", "level", "metadata"]);

        let expected_uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, set.id.as_bytes()).to_string();
        assert_eq!(insert.columns[0].column.value, json!(expected_uuid));
        assert_eq!(insert.columns[1].column.value, json!("fixer-1"));
        assert_eq!(insert.columns[2].column.value, json!("Ñandú"));
        assert_eq!(insert.columns[3].column.value, json!(r#"{"eyes":"chrome"}"#));
        assert_eq!(insert.columns[4].column.value, json!("12"));

        let metadata: Value =
            serde_json::from_str(insert.columns[5].column.value.as_str().unwrap()).unwrap();
        assert_eq!(metadata["city"], "Houston");
        assert_eq!(metadata["created_at"], "2026-01-02T03:04:05+00:00");
    }

    #[test]
    fn missing_id_names_the_record() {
        let records = vec![
            record(json!({"id": "ok"})),
            record(json!({"name": "anonymous"})),
        ];
        let err = build_changelog(&spec(), &records, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("record 1"));
    }

    #[test]
    fn loads_yaml_and_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("npcs.yaml");
        fs::write(&yaml, "- id: a\n  name: A\n- id: b\n").unwrap();
        let json_path = dir.path().join("npcs.json");
        fs::write(&json_path, r#"[{"id": 1}]"#).unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "[1, 2]").unwrap();

        assert_eq!(load_records(&yaml).unwrap().len(), 2);
        assert_eq!(load_records(&json_path).unwrap()[0]["id"], json!(1));
        assert!(load_records(&bad).is_err());
    }
}
