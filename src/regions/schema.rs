use crate::error::{OpsError, Result};
use jsonschema::JSONSchema;
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fs;
use std::path::Path;

const REGION_SCHEMA_JSON: &str = include_str!("../../schemas/region.v1.json");

static EMBEDDED: OnceCell<RegionSchema> = OnceCell::new();

/// Compiled JSON Schema for world-region documents
pub struct RegionSchema {
    compiled: JSONSchema,
}

impl RegionSchema {
    /// The schema shipped in `schemas/region.v1.json`
    pub fn embedded() -> Result<&'static RegionSchema> {
        EMBEDDED.get_or_try_init(|| {
            let value: Value = serde_json::from_str(REGION_SCHEMA_JSON)?;
            Self::compile(Box::leak(Box::new(value)))
        })
    }

    /// Load a schema from disk. jsonschema 0.17 wants a `'static` schema,
    /// so the parsed value lives for the rest of the process.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&raw)?;
        let value: &'static Value = Box::leak(Box::new(value));
        Self::compile(value)
    }

    fn compile(schema: &'static Value) -> Result<Self> {
        let compiled = JSONSchema::options()
            .compile(schema)
            .map_err(|e| OpsError::Schema(format!("failed to compile region schema: {e}")))?;
        Ok(Self { compiled })
    }

    /// Every violation as `"<message> at <instance path>"`
    pub fn violations(&self, instance: &Value) -> Vec<String> {
        match self.compiled.validate(instance) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| format!("{} at {}", error, error.instance_path))
                .collect(),
        }
    }

    pub fn validate(&self, instance: &Value) -> Result<()> {
        let violations = self.violations(instance);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(OpsError::Schema(violations.join("; ")))
        }
    }
}

/// Parse a region YAML file into JSON and check it against the embedded schema
pub fn validate_region_file(path: &Path) -> Result<()> {
    let raw = fs::read_to_string(path)?;
    let instance: Value = serde_yaml::from_str(&raw)?;
    RegionSchema::embedded()?.validate(&instance)
}
