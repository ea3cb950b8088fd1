use anyhow::Result;
use gameops::openapi::DomainValidator;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const VALID_MAIN: &str = r#"
openapi: 3.0.3
info:
  title: Economy Service
  version: 1.0.0
paths:
  /wallets/{id}:
    get:
      operationId: getWallet
      responses:
        "200":
          description: wallet
components:
  schemas:
    Wallet:
      type: object
      properties:
        id:
          type: string
"#;

const TRADING: &str = r#"
paths:
  /trades:
    post:
      operationId: createTrade
      responses:
        201:
          description: created
"#;

const EVENTS_WITHOUT_OPERATION_ID: &str = r#"
paths:
  /events:
    get:
      responses:
        "200":
          description: events
"#;

fn write(root: &Path, relative: &str, content: &str) -> Result<()> {
    let path = root.join("proto/openapi").join(relative);
    fs::create_dir_all(path.parent().unwrap())?;
    fs::write(path, content)?;
    Ok(())
}

#[tokio::test]
async fn validates_every_domain_and_collects_findings() -> Result<()> {
    let root = tempdir()?;
    write(root.path(), "economy/main.yaml", VALID_MAIN)?;
    write(root.path(), "economy/trading/trading.yaml", TRADING)?;
    // component files are not validated on their own
    write(root.path(), "economy/schemas/wallet.yaml", "type: [unterminated")?;
    write(root.path(), "social/README.yaml", "notes: no entry point")?;
    write(root.path(), "world/main.yaml", &VALID_MAIN.replace("Economy", "World"))?;
    write(root.path(), "world/events.yaml", EVENTS_WITHOUT_OPERATION_ID)?;

    let mut validator = DomainValidator::new(root.path()).without_codegen_check();
    let passed = validator.validate_all().await;
    let report = validator.into_report();

    assert!(!passed);
    assert!(!report.is_valid());
    assert_eq!(report.domains_validated, 1);
    assert_eq!(report.errors.len(), 1, "{:?}", report.errors);
    assert!(report.errors[0].starts_with("Missing operationId for GET /events in "));
    assert!(report.errors[0].ends_with("events.yaml (required for Go generation)"));
    assert_eq!(report.warnings, vec!["No main.yaml found in social".to_string()]);
    Ok(())
}

#[tokio::test]
async fn clean_tree_is_valid() -> Result<()> {
    let root = tempdir()?;
    write(root.path(), "economy/main.yaml", VALID_MAIN)?;
    write(root.path(), "economy/trading/trading.yaml", TRADING)?;
    write(root.path(), "economy/guild-service/main.yaml", "openapi: 2.0")?;

    let mut validator = DomainValidator::new(root.path()).without_codegen_check();
    assert!(validator.validate_all().await);
    assert!(validator.report().is_valid());
    assert_eq!(validator.report().domains_validated, 1);
    assert!(validator.report().warnings.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_openapi_directory_fails() {
    let root = tempdir().unwrap();
    let mut validator = DomainValidator::new(root.path()).without_codegen_check();
    assert!(!validator.validate_all().await);
    assert_eq!(
        validator.report().errors,
        vec!["proto/openapi directory not found".to_string()]
    );
}

#[tokio::test]
async fn broken_entry_point_stops_the_domain() -> Result<()> {
    let root = tempdir()?;
    write(
        root.path(),
        "combat/main.yaml",
        "openapi: 3.1.0\ninfo:\n  title: Combat\n  version: 1.0.0\npaths: {}\n",
    )?;
    write(root.path(), "combat/abilities.yaml", EVENTS_WITHOUT_OPERATION_ID)?;

    let mut validator = DomainValidator::new(root.path()).without_codegen_check();
    let dir = validator.openapi_dir().join("combat");
    assert!(!validator.validate_domain(&dir).await);

    let report = validator.report();
    assert_eq!(report.domains_validated, 0);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Unsupported OpenAPI version 3.1.0 in "));
    Ok(())
}

#[tokio::test]
async fn malformed_standalone_files_are_reported() -> Result<()> {
    let root = tempdir()?;
    write(root.path(), "economy/main.yaml", VALID_MAIN)?;
    write(root.path(), "economy/list.yaml", "- just\n- a\n- list\n")?;
    write(root.path(), "economy/broken.yaml", "paths: [unterminated")?;

    let mut validator = DomainValidator::new(root.path()).without_codegen_check();
    let dir = validator.openapi_dir().join("economy");
    assert!(!validator.validate_domain(&dir).await);

    let errors = &validator.report().errors;
    assert_eq!(errors.len(), 2, "{errors:?}");
    assert!(errors[0].starts_with("YAML parsing error in component file "));
    assert!(errors[1].starts_with("Invalid YAML structure in component file "));
    assert!(errors[1].ends_with("list.yaml"));
    Ok(())
}
