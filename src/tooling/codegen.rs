use super::command::{absolute_root, run_tool};
use crate::constants;
use crate::error::{OpsError, Result};
use serde::Serialize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, instrument};

/// Service skeleton files, relative to the service directory
const SKELETON: &[(&str, &str)] = &[
    ("main.go", include_str!("../../templates/go/main.go.tmpl")),
    ("server/http_server.go", include_str!("../../templates/go/http_server.go.tmpl")),
    ("server/middleware.go", include_str!("../../templates/go/middleware.go.tmpl")),
    ("server/handlers.go", include_str!("../../templates/go/handlers.go.tmpl")),
    ("server/service.go", include_str!("../../templates/go/service.go.tmpl")),
    ("server/repository.go", include_str!("../../templates/go/repository.go.tmpl")),
    ("Makefile", include_str!("../../templates/go/Makefile.tmpl")),
];

/// `social-domain` -> `social-domain-service-go`
pub fn service_name(domain: &str) -> String {
    format!("{domain}-service-go")
}

/// `auth-expansion-domain` -> `AuthExpansionDomain`
pub fn pascal_case(domain: &str) -> String {
    domain
        .split(|c: char| c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

pub fn render_template(template: &str, domain: &str) -> String {
    template
        .replace("{{DOMAIN}}", domain)
        .replace("{{SERVICE}}", &service_name(domain))
        .replace("{{TYPE}}", &format!("{}Service", pascal_case(domain)))
}

/// Write `main.go`, the `server/` package and the Makefile for `domain`
pub fn write_service_skeleton(service_dir: &Path, domain: &str) -> Result<()> {
    for (relative, template) in SKELETON {
        let path = service_dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, render_template(template, domain))?;
    }
    Ok(())
}

#[derive(Debug, Default, Serialize)]
pub struct GenerationSummary {
    pub generated: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl GenerationSummary {
    pub fn print(&self) {
        println!();
        println!("Generation summary:");
        println!("  Generated: {} services", self.generated.len());
        println!("  Failed:    {} services", self.failed.len());
        for (domain, reason) in &self.failed {
            println!("    {domain}: {reason}");
        }
    }
}

/// Bundles a domain's OpenAPI spec, runs ogen on it and lays out a Go
/// service around the generated package.
pub struct GoCodeGenerator {
    project_root: PathBuf,
    services_dir: PathBuf,
    openapi_dir: PathBuf,
}

impl GoCodeGenerator {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        let project_root = absolute_root(project_root.into());
        Self {
            services_dir: project_root.join("services"),
            openapi_dir: project_root.join(constants::OPENAPI_DIR),
            project_root,
        }
    }

    pub fn service_dir(&self, domain: &str) -> PathBuf {
        self.services_dir.join(service_name(domain))
    }

    pub fn bundled_spec_path(&self, domain: &str) -> PathBuf {
        self.project_root.join(format!("openapi-{domain}-bundled.yaml"))
    }

    async fn bundle_spec(&self, domain: &str, main_yaml: &Path) -> Result<PathBuf> {
        let bundled = self.bundled_spec_path(domain);
        let args: [&OsStr; 6] = [
            OsStr::new("--yes"),
            OsStr::new("@redocly/cli"),
            OsStr::new("bundle"),
            main_yaml.as_os_str(),
            OsStr::new("-o"),
            bundled.as_os_str(),
        ];
        run_tool(
            "npx",
            &args,
            Some(&self.project_root),
            Duration::from_secs(constants::REDOCLY_TIMEOUT_SECS),
        )
        .await?;
        Ok(bundled)
    }

    async fn generate_api(&self, service_dir: &Path, bundled: &Path) -> Result<()> {
        let pkg_dir = service_dir.join("pkg").join("api");
        fs::create_dir_all(&pkg_dir)?;
        let args: [&OsStr; 6] = [
            OsStr::new("--target"),
            pkg_dir.as_os_str(),
            OsStr::new("--package"),
            OsStr::new("api"),
            OsStr::new("--clean"),
            bundled.as_os_str(),
        ];
        run_tool(
            "ogen",
            &args,
            Some(&self.project_root),
            Duration::from_secs(constants::OGEN_TIMEOUT_SECS),
        )
        .await?;
        Ok(())
    }

    async fn init_module(&self, service_dir: &Path, domain: &str) -> Result<()> {
        let timeout = Duration::from_secs(constants::GO_MOD_TIMEOUT_SECS);
        if !service_dir.join("go.mod").exists() {
            let name = service_name(domain);
            run_tool("go", &["mod", "init", name.as_str()], Some(service_dir), timeout).await?;
        }
        run_tool("go", &["mod", "tidy"], Some(service_dir), timeout).await?;
        Ok(())
    }

    /// Full pipeline for one domain; returns the service directory
    #[instrument(skip(self))]
    pub async fn generate_domain(&self, domain: &str) -> Result<PathBuf> {
        let main_yaml = self
            .openapi_dir
            .join(domain)
            .join(constants::DOMAIN_ENTRYPOINT);
        if !main_yaml.is_file() {
            return Err(OpsError::NotFound(format!("{}", main_yaml.display())));
        }

        let service_dir = self.service_dir(domain);
        fs::create_dir_all(&service_dir)?;

        let bundled = self.bundle_spec(domain, &main_yaml).await?;
        self.generate_api(&service_dir, &bundled).await?;
        write_service_skeleton(&service_dir, domain)?;
        self.init_module(&service_dir, domain).await?;

        run_tool(
            "go",
            &["build", "./..."],
            Some(&service_dir),
            Duration::from_secs(constants::GO_BUILD_TIMEOUT_SECS),
        )
        .await?;

        Ok(service_dir)
    }

    /// Generate every domain in order; a failing domain does not stop the rest
    pub async fn generate_all<S: AsRef<str>>(&self, domains: &[S]) -> GenerationSummary {
        let mut summary = GenerationSummary::default();
        for domain in domains {
            let domain = domain.as_ref();
            info!("Generating {} service", domain);
            match self.generate_domain(domain).await {
                Ok(dir) => {
                    info!("{} service generated at {}", domain, dir.display());
                    summary.generated.push(domain.to_string());
                }
                Err(e) => {
                    error!("Failed to generate {}: {}", domain, e);
                    summary.failed.push((domain.to_string(), e.to_string()));
                }
            }
        }
        summary
    }
}
