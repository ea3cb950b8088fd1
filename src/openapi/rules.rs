use crate::constants;
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Errors and warnings collected while checking OpenAPI documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Findings {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn extend(&mut self, other: Findings) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// True when a path relative to the domain directory names a shared
/// component file rather than a standalone spec
pub fn is_component_path(relative: &str) -> bool {
    let relative = relative.replace('\\', "/");
    constants::COMPONENT_PATTERNS
        .iter()
        .any(|pattern| relative.contains(pattern))
}

fn key_text(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Response codes may be quoted or bare integers in YAML
fn has_response_code(responses: &Value, code: &str) -> bool {
    responses
        .as_mapping()
        .map(|m| m.keys().any(|k| key_text(k).as_deref() == Some(code)))
        .unwrap_or(false)
}

fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(Value::String(key.to_string()))
}

/// `openapi`, `info.title`, `info.version` and a `paths` mapping, with a 3.0.x version
pub fn check_basic_structure(spec: &Mapping, file: &Path) -> Findings {
    let mut findings = Findings::default();
    let file = file.display();

    for field in ["openapi", "info", "paths"] {
        if get(spec, field).is_none() {
            findings
                .errors
                .push(format!("Missing required field '{field}' in {file}"));
        }
    }

    if let Some(version) = get(spec, "openapi") {
        let version = key_text(version).unwrap_or_default();
        if !version.starts_with("3.0") {
            findings.errors.push(format!(
                "Unsupported OpenAPI version {version} in {file} (need 3.0.x for Go generation)"
            ));
        }
    }

    if let Some(info) = get(spec, "info") {
        for field in ["title", "version"] {
            let present = info.as_mapping().and_then(|m| get(m, field)).is_some();
            if !present {
                findings.errors.push(format!("Missing info.{field} in {file}"));
            }
        }
    }

    if let Some(paths) = get(spec, "paths") {
        if !paths.is_mapping() {
            findings
                .errors
                .push(format!("Invalid paths structure in {file}"));
        }
    }

    findings
}

fn success_codes(method: &str, path: &str) -> &'static [&'static str] {
    if method == "delete" {
        &["200", "201", "204"]
    } else if path.contains("/ws") || path.to_lowercase().contains("websocket") {
        &["101", "200"]
    } else {
        &["200", "201"]
    }
}

/// Whether `schema` refers back to `#/components/schemas/<name>` through
/// `$ref`, property schemas, array items or schema composition
pub fn has_self_reference(schema: &Value, name: &str) -> bool {
    let Some(map) = schema.as_mapping() else {
        return false;
    };

    if let Some(Value::String(reference)) = get(map, "$ref") {
        if reference.strip_prefix("#/components/schemas/") == Some(name) {
            return true;
        }
    }

    if let Some(Value::Mapping(properties)) = get(map, "properties") {
        if properties.values().any(|p| has_self_reference(p, name)) {
            return true;
        }
    }

    if let Some(items) = get(map, "items") {
        if has_self_reference(items, name) {
            return true;
        }
    }

    ["allOf", "anyOf", "oneOf"].iter().any(|keyword| {
        matches!(get(map, keyword), Some(Value::Sequence(parts)) if parts.iter().any(|p| has_self_reference(p, name)))
    })
}

/// Rules the Go generators depend on: every operation has an
/// `operationId` and `responses`, and at least one success response.
/// Self-referencing component schemas only warn.
pub fn check_go_generation(spec: &Mapping, file: &Path) -> Findings {
    let mut findings = Findings::default();
    let display = file.display();

    if let Some(Value::Mapping(paths)) = get(spec, "paths") {
        for (path, methods) in paths {
            let Some(path) = key_text(path) else { continue };
            let Some(methods) = methods.as_mapping() else { continue };

            for (method, operation) in methods {
                let Some(method) = key_text(method) else { continue };
                if !constants::HTTP_METHODS.contains(&method.as_str()) {
                    continue;
                }
                let Some(operation) = operation.as_mapping() else { continue };
                let upper = method.to_uppercase();

                if get(operation, "operationId").is_none() {
                    findings.errors.push(format!(
                        "Missing operationId for {upper} {path} in {display} (required for Go generation)"
                    ));
                }

                match get(operation, "responses") {
                    None => findings
                        .errors
                        .push(format!("Missing responses for {upper} {path} in {display}")),
                    Some(responses) => {
                        let codes = success_codes(&method, &path);
                        if !codes.iter().any(|c| has_response_code(responses, c)) {
                            findings.warnings.push(format!(
                                "No success response ({}) for {upper} {path} in {display}",
                                codes.join("/")
                            ));
                        }
                    }
                }
            }
        }
    }

    let schemas = get(spec, "components")
        .and_then(Value::as_mapping)
        .and_then(|c| get(c, "schemas"))
        .and_then(Value::as_mapping);
    if let Some(schemas) = schemas {
        for (name, schema) in schemas {
            let Some(name) = key_text(name) else { continue };
            if has_self_reference(schema, &name) {
                findings.warnings.push(format!(
                    "Potential circular reference in schema {name} in {display}"
                ));
            }
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn component_paths() {
        assert!(is_component_path("schemas/player.yaml"));
        assert!(is_component_path("combat-ext2.yaml"));
        assert!(is_component_path("guild-service/main.yaml"));
        assert!(!is_component_path("trading/trading.yaml"));
    }

    #[test]
    fn basic_structure_errors() {
        let spec = mapping("openapi: 3.1.0\ninfo:\n  title: Economy\npaths: []\n");
        let findings = check_basic_structure(&spec, Path::new("economy/main.yaml"));
        assert_eq!(
            findings.errors,
            vec![
                "Unsupported OpenAPI version 3.1.0 in economy/main.yaml (need 3.0.x for Go generation)",
                "Missing info.version in economy/main.yaml",
                "Invalid paths structure in economy/main.yaml",
            ]
        );

        let missing = check_basic_structure(&mapping("info: {}\n"), Path::new("x.yaml"));
        assert!(missing.errors.contains(&"Missing required field 'openapi' in x.yaml".to_string()));
        assert!(missing.errors.contains(&"Missing required field 'paths' in x.yaml".to_string()));
    }

    #[test]
    fn operations_need_ids_and_success_responses() {
        let spec = mapping(
            r#"
paths:
  /players/{id}:
    parameters: []
    get:
      operationId: getPlayer
      responses:
        200:
          description: ok
    delete:
      operationId: deletePlayer
      responses:
        "204":
          description: gone
    post:
      responses:
        "400":
          description: bad
  /ws/combat:
    get:
      operationId: combatSocket
      responses:
        "201":
          description: wrong
    put: {}
"#,
        );
        let findings = check_go_generation(&spec, Path::new("main.yaml"));
        assert_eq!(
            findings.errors,
            vec![
                "Missing operationId for POST /players/{id} in main.yaml (required for Go generation)",
                "Missing operationId for PUT /ws/combat in main.yaml (required for Go generation)",
                "Missing responses for PUT /ws/combat in main.yaml",
            ]
        );
        assert_eq!(
            findings.warnings,
            vec![
                "No success response (200/201) for POST /players/{id} in main.yaml",
                "No success response (101/200) for GET /ws/combat in main.yaml",
            ]
        );
    }

    #[test]
    fn detects_self_references() {
        let spec = mapping(
            r##"
components:
  schemas:
    Guild:
      type: object
      properties:
        parent:
          $ref: "#/components/schemas/Guild"
    Squad:
      type: array
      items:
        allOf:
          - $ref: "#/components/schemas/Squad"
    Player:
      type: object
      properties:
        guild:
          $ref: "#/components/schemas/Guild"
"##,
        );
        let findings = check_go_generation(&spec, Path::new("main.yaml"));
        assert!(findings.errors.is_empty());
        assert_eq!(
            findings.warnings,
            vec![
                "Potential circular reference in schema Guild in main.yaml",
                "Potential circular reference in schema Squad in main.yaml",
            ]
        );
    }
}
