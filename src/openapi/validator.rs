use super::rules::{check_basic_structure, check_go_generation, is_component_path, Findings};
use crate::constants;
use crate::error::{Result, ToolError};
use crate::tooling::{absolute_root, run_tool};
use serde_yaml::{Mapping, Value};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub domains_validated: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn absorb(&mut self, findings: Findings) -> bool {
        let clean = findings.is_clean();
        self.errors.extend(findings.errors);
        self.warnings.extend(findings.warnings);
        clean
    }

    pub fn print(&self) {
        println!();
        println!("Domain OpenAPI validation results:");
        println!("   Domains validated: {}", self.domains_validated);
        println!("   Errors: {}", self.errors.len());
        println!("   Warnings: {}", self.warnings.len());

        if !self.errors.is_empty() {
            println!("\nERRORS:");
            for e in &self.errors {
                println!("   - {e}");
            }
        }
        if !self.warnings.is_empty() {
            println!("\nWARNINGS:");
            for w in &self.warnings {
                println!("   - {w}");
            }
        }

        if self.is_valid() {
            println!("\nAll domain OpenAPI specifications are valid for Go-backend generation");
        } else {
            println!(
                "\n{} validation errors found. Fix them before Go code generation.",
                self.errors.len()
            );
        }
    }
}

/// `*.yaml` files under `dir`, recursively, sorted
fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            out.push(path);
        }
    }
    Ok(())
}

fn load_mapping(path: &Path) -> std::result::Result<Option<Mapping>, String> {
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    match serde_yaml::from_str::<Value>(&raw) {
        Ok(Value::Mapping(map)) => Ok(Some(map)),
        Ok(_) => Ok(None),
        Err(e) => Err(e.to_string()),
    }
}

/// Validates the per-domain OpenAPI trees under `proto/openapi/`
pub struct DomainValidator {
    project_root: PathBuf,
    openapi_dir: PathBuf,
    codegen_check: bool,
    report: ValidationReport,
}

impl DomainValidator {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = absolute_root(project_root.into());
        Self {
            openapi_dir: project_root.join(constants::OPENAPI_DIR),
            project_root,
            codegen_check: true,
            report: ValidationReport::default(),
        }
    }

    /// Skip the `oapi-codegen` round trip on entry points
    pub fn without_codegen_check(mut self) -> Self {
        self.codegen_check = false;
        self
    }

    pub fn openapi_dir(&self) -> &Path {
        &self.openapi_dir
    }

    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    pub fn into_report(self) -> ValidationReport {
        self.report
    }

    async fn check_with_oapi_codegen(&mut self, file: &Path) -> bool {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let args: [&OsStr; 5] = [
            OsStr::new("-generate"),
            OsStr::new("spec"),
            OsStr::new("-package"),
            OsStr::new("validation"),
            file.as_os_str(),
        ];
        let result = run_tool(
            "oapi-codegen",
            &args,
            Some(&self.project_root),
            Duration::from_secs(constants::OAPI_CODEGEN_TIMEOUT_SECS),
        )
        .await;

        match result {
            Ok(_) => true,
            Err(ToolError::NotFound { .. }) => {
                self.report
                    .warnings
                    .push("oapi-codegen not found in PATH, skipping Go validation".to_string());
                true
            }
            Err(ToolError::Timeout { .. }) => {
                self.report
                    .errors
                    .push(format!("oapi-codegen validation timeout for {name}"));
                false
            }
            Err(ToolError::Failed { stderr, .. }) => {
                self.report
                    .errors
                    .push(format!("oapi-codegen validation failed for {name}: {stderr}"));
                false
            }
            Err(e) => {
                self.report
                    .errors
                    .push(format!("oapi-codegen validation error for {name}: {e}"));
                false
            }
        }
    }

    /// A domain entry point: structure, Go rules, then oapi-codegen
    pub async fn validate_full_spec(&mut self, file: &Path) -> bool {
        let spec = match load_mapping(file) {
            Ok(Some(spec)) => spec,
            Ok(None) => {
                self.report
                    .errors
                    .push(format!("Validation error in {}: document is not a mapping", file.display()));
                return false;
            }
            Err(e) => {
                self.report
                    .errors
                    .push(format!("YAML parsing error in {}: {}", file.display(), e));
                return false;
            }
        };

        if !self.report.absorb(check_basic_structure(&spec, file)) {
            return false;
        }
        if !self.report.absorb(check_go_generation(&spec, file)) {
            return false;
        }
        if self.codegen_check {
            return self.check_with_oapi_codegen(file).await;
        }
        true
    }

    /// A shared component: must be a mapping; paths, if any, follow the Go rules
    pub fn validate_component(&mut self, file: &Path) -> bool {
        match load_mapping(file) {
            Ok(Some(spec)) => {
                if spec.contains_key("paths") {
                    self.report.absorb(check_go_generation(&spec, file))
                } else {
                    true
                }
            }
            Ok(None) => {
                self.report.errors.push(format!(
                    "Invalid YAML structure in component file {}",
                    file.display()
                ));
                false
            }
            Err(e) => {
                self.report.errors.push(format!(
                    "YAML parsing error in component file {}: {}",
                    file.display(),
                    e
                ));
                false
            }
        }
    }

    pub async fn validate_domain(&mut self, domain_dir: &Path) -> bool {
        let domain = domain_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| domain_dir.display().to_string());
        info!("Validating domain: {}", domain);

        let main_yaml = domain_dir.join(constants::DOMAIN_ENTRYPOINT);
        if !main_yaml.is_file() {
            self.report
                .warnings
                .push(format!("No main.yaml found in {domain}"));
            return true;
        }
        if !self.validate_full_spec(&main_yaml).await {
            error!("Domain {} validation failed", domain);
            return false;
        }

        let mut files = Vec::new();
        if let Err(e) = collect_yaml_files(domain_dir, &mut files) {
            self.report
                .errors
                .push(format!("Failed to list {}: {}", domain_dir.display(), e));
            return false;
        }
        files.sort();
        let total = files.len().saturating_sub(1);
        let standalone: Vec<PathBuf> = files
            .into_iter()
            .filter(|f| f != &main_yaml)
            .filter(|f| {
                let relative = f.strip_prefix(domain_dir).unwrap_or(f);
                !is_component_path(&relative.to_string_lossy())
            })
            .collect();
        info!(
            "Found {} YAML files to validate in {} (excluded {} component files)",
            standalone.len(),
            domain,
            total.saturating_sub(standalone.len())
        );

        let mut valid = true;
        for file in &standalone {
            if !self.validate_component(file) {
                valid = false;
            }
        }

        if valid {
            self.report.domains_validated += 1;
            info!("Domain {} validation passed", domain);
        } else {
            warn!("Domain {} validation failed", domain);
        }
        valid
    }

    /// Every domain directory in name order. False when any domain fails
    /// or any error was recorded.
    pub async fn validate_all(&mut self) -> bool {
        if !self.openapi_dir.is_dir() {
            self.report
                .errors
                .push(format!("{} directory not found", constants::OPENAPI_DIR));
            return false;
        }

        let mut domains = Vec::new();
        match fs::read_dir(&self.openapi_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        domains.push(path);
                    }
                }
            }
            Err(e) => {
                self.report.errors.push(format!(
                    "Failed to list {}: {}",
                    self.openapi_dir.display(),
                    e
                ));
                return false;
            }
        }
        domains.sort();
        info!("Found {} domain directories", domains.len());

        let mut all_valid = true;
        for domain in &domains {
            if !self.validate_domain(domain).await {
                all_valid = false;
            }
        }
        all_valid && self.report.is_valid()
    }
}
