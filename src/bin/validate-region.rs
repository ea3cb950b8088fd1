use anyhow::{Context, Result};
use clap::Parser;
use gameops::regions::RegionSchema;
use serde_json::Value;
use std::{fs, path::PathBuf};

/// Validate a world-region YAML document against the region v1 schema.
#[derive(Parser, Debug)]
#[command(name = "validate-region", version, about = "Validate region YAML against schema")]
struct Cli {
    /// Path to the region YAML file to validate
    path: PathBuf,

    /// Optional path to a schema file (defaults to the built-in region.v1 schema)
    #[arg(long)]
    schema: Option<PathBuf>,
}

fn load_yaml(path: &PathBuf) -> Result<Value> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse YAML in {}", path.display()))?;
    Ok(value)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let instance = load_yaml(&args.path)?;

    let violations = match &args.schema {
        Some(path) => RegionSchema::from_file(path)
            .with_context(|| format!("Failed to compile JSON Schema {}", path.display()))?
            .violations(&instance),
        None => RegionSchema::embedded()
            .context("Failed to compile JSON Schema")?
            .violations(&instance),
    };

    if violations.is_empty() {
        println!("valid");
        return Ok(());
    }
    eprintln!("invalid:");
    for violation in violations {
        eprintln!("- {violation}");
    }
    std::process::exit(1)
}
