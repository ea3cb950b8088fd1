use gameops::regions::{validate_region_file, RegionSchema};
use serde_json::json;
use std::path::Path;

fn fixture(name: &str) -> serde_json::Value {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/resources/regions")
        .join(name);
    let raw = std::fs::read_to_string(path).unwrap();
    serde_yaml::from_str(&raw).unwrap()
}

#[test]
fn full_region_document_is_valid() {
    let schema = RegionSchema::embedded().unwrap();
    assert!(schema.violations(&fixture("01-africa.yaml")).is_empty());
    assert!(schema.violations(&fixture("03-night-city.yaml")).is_empty());
}

#[test]
fn missing_metadata_id_is_rejected() {
    let schema = RegionSchema::embedded().unwrap();
    let violations = schema.violations(&fixture("05-missing-id.yaml"));
    assert_eq!(violations.len(), 1);
    assert!(violations[0].contains("\"id\" is a required property"), "{violations:?}");
    assert!(violations[0].ends_with("at /metadata"), "{violations:?}");
}

#[test]
fn negative_population_is_rejected() {
    let schema = RegionSchema::embedded().unwrap();
    let violations = schema.violations(&fixture("06-negative-population.yaml"));
    assert_eq!(violations.len(), 1);
    assert!(violations[0].ends_with("at /region/population_2020"), "{violations:?}");
}

#[test]
fn section_types_are_enforced() {
    let schema = RegionSchema::embedded().unwrap();
    let mut doc = fixture("02-europe.yaml");
    doc["political"] = json!("stable");
    doc["cities"] = json!({"paris": {}});

    let err = schema.validate(&doc).unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Schema validation failed: "));
    assert!(message.contains("at /political"));
    assert!(message.contains("at /cities"));
}

#[test]
fn schema_file_on_disk_matches_embedded() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("schemas/region.v1.json");
    let schema = RegionSchema::from_file(&path).unwrap();
    let bad = json!({"metadata": {"id": ""}, "region": {"name": "X"}});
    assert!(!schema.violations(&bad).is_empty());
    assert!(!RegionSchema::embedded().unwrap().violations(&bad).is_empty());
}

#[test]
fn validates_region_files_from_disk() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/resources/regions");
    assert!(validate_region_file(&dir.join("02-europe.yaml")).is_ok());
    assert!(validate_region_file(&dir.join("04-broken.yaml")).is_err());
    assert!(validate_region_file(&dir.join("06-negative-population.yaml")).is_err());
}
