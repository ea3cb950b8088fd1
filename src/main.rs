use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use gameops::config::OpsConfig;
use gameops::constants;
use gameops::deploy::{
    DeployMonitorConfig, DeploymentMonitor, HttpApplicationProbe, PgDatabaseProbe,
};
use gameops::health::HealthMonitor;
use gameops::liquibase::{build_changelog, load_fixture_spec, load_records, write_changelog};
use gameops::logging;
use gameops::metrics::init_metrics;
use gameops::openapi::DomainValidator;
use gameops::regions::{print_summary, ImportOptions, PgRegionStore, RegionImporter, RegionStore};
use gameops::tooling::{render_report, GoCodeGenerator, OgenMigrationTester};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "gameops")]
#[command(about = "Operational tooling for the game backend")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to ./gameops.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll service health endpoints, PostgreSQL and Redis
    Health {
        /// Run a single check and exit
        #[arg(long)]
        once: bool,
        /// Seconds between checks
        #[arg(long)]
        interval: Option<u64>,
        /// Where to write the JSON report
        #[arg(long)]
        report: Option<PathBuf>,
        /// JSON file with per-service overrides
        #[arg(long)]
        overrides: Option<PathBuf>,
        /// Expose a Prometheus scrape endpoint on this port
        #[arg(long)]
        metrics_port: Option<u16>,
    },
    /// Watch a database migration rollout and alert on regressions
    DeployMonitor {
        #[arg(long, alias = "environment")]
        env: String,
        #[arg(long)]
        deployment_id: String,
        /// Total monitoring time in seconds
        #[arg(long, default_value_t = constants::DEPLOY_DURATION_SECS)]
        duration: u64,
        /// Seconds between monitoring cycles
        #[arg(long, default_value_t = constants::DEPLOY_INTERVAL_SECS)]
        interval: u64,
        #[arg(long, default_value = constants::DEFAULT_WATCHED_SCHEMA)]
        schema: String,
        #[arg(long, default_value = constants::DEFAULT_WATCHED_TABLE)]
        table: String,
        #[arg(long, default_value = constants::DEFAULT_SERVICE_HEALTH_URL)]
        service_health_url: String,
        #[arg(long, default_value = constants::DEFAULT_SERVICE_API_URL)]
        service_api_url: String,
        #[arg(long)]
        pushgateway_url: Option<String>,
        #[arg(long)]
        alert_webhook: Option<String>,
        #[arg(long, default_value = "logs")]
        snapshot_dir: PathBuf,
    },
    /// Import world-region YAML documents into the regions table
    ImportRegions {
        /// Parse and map documents without writing to the database
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        limit: Option<usize>,
        /// Only import regions of this type
        #[arg(long = "type")]
        region_type: Option<String>,
        #[arg(long, default_value = constants::DEFAULT_REGIONS_DIR)]
        dir: PathBuf,
        /// Validate each document against the region JSON Schema first
        #[arg(long)]
        validate: bool,
    },
    /// Build a Liquibase changelog from a fixture spec and a record list
    Changelog {
        #[arg(long)]
        spec: PathBuf,
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Validate domain OpenAPI specs for Go code generation
    ValidateOpenapi {
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
        /// Validate a single domain
        #[arg(long)]
        domain: Option<String>,
    },
    /// Generate Go services from domain OpenAPI specs with ogen
    GenerateGo {
        #[arg(long, default_value = ".")]
        project_root: PathBuf,
        /// Domains to generate (repeatable); defaults to the enterprise domain list
        #[arg(long = "domain")]
        domains: Vec<String>,
    },
    /// Validate services migrated to ogen and write a Markdown report
    OgenMigration {
        #[arg(long, default_value = "services")]
        services_dir: PathBuf,
        /// Validate a single service
        #[arg(long)]
        service: Option<String>,
        #[arg(long, default_value = constants::OGEN_REPORT_FILE)]
        report: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let config = OpsConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Health {
            once,
            interval,
            report,
            overrides,
            metrics_port,
        } => {
            logging::init_logging("health");
            run_health(config, once, interval, report, overrides, metrics_port).await
        }
        Commands::DeployMonitor {
            env,
            deployment_id,
            duration,
            interval,
            schema,
            table,
            service_health_url,
            service_api_url,
            pushgateway_url,
            alert_webhook,
            snapshot_dir,
        } => {
            logging::init_logging("deploy-monitor");
            let mut monitor_config = DeployMonitorConfig::new(&env, &deployment_id);
            monitor_config.duration = Duration::from_secs(duration);
            monitor_config.interval = Duration::from_secs(interval);
            monitor_config.schema = schema;
            monitor_config.table = table;
            monitor_config.pushgateway_url = pushgateway_url.or(config.alerts.pushgateway_url.clone());
            monitor_config.alert_webhook = alert_webhook.or(config.alerts.webhook_url.clone());
            monitor_config.snapshot_dir = snapshot_dir;

            let pool = config
                .database
                .connect()
                .await
                .context("Database connection failed")?;
            let database = Arc::new(PgDatabaseProbe::new(
                pool,
                &monitor_config.schema,
                &monitor_config.table,
            ));
            let application = Arc::new(HttpApplicationProbe::new(&service_health_url, &service_api_url));

            let mut monitor = DeploymentMonitor::new(monitor_config, database, application);
            monitor.run().await?;
            Ok(())
        }
        Commands::ImportRegions {
            dry_run,
            limit,
            region_type,
            dir,
            validate,
        } => {
            logging::init_logging("import-regions");
            let options = ImportOptions {
                dir,
                limit,
                region_type,
                dry_run,
                validate,
            };
            let importer = RegionImporter::new(options);

            let stats = if dry_run {
                importer.run(None).await?
            } else {
                let pool = config
                    .database
                    .connect()
                    .await
                    .context("Database connection failed")?;
                let store = PgRegionStore::new(pool);
                store.ensure_schema().await?;
                importer.run(Some(&store as &dyn RegionStore)).await?
            };
            print_summary(&stats, dry_run);
            if stats.failed > 0 {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Changelog {
            spec,
            input,
            output,
        } => {
            logging::init_logging("changelog");
            let fixture = load_fixture_spec(&spec)
                .with_context(|| format!("Failed to load fixture spec {}", spec.display()))?;
            let records = load_records(&input)
                .with_context(|| format!("Failed to load records {}", input.display()))?;
            let changelog = build_changelog(&fixture, &records, Utc::now())?;
            write_changelog(&output, &changelog)?;
            println!(
                "Created Liquibase file {} with {} changesets",
                output.display(),
                changelog.change_sets.len()
            );
            Ok(())
        }
        Commands::ValidateOpenapi {
            project_root,
            domain,
        } => {
            logging::init_logging("validate-openapi");
            let mut validator = DomainValidator::new(&project_root);
            let passed = match domain {
                Some(domain) => {
                    let dir = validator.openapi_dir().join(&domain);
                    validator.validate_domain(&dir).await
                }
                None => validator.validate_all().await,
            };
            let report = validator.into_report();
            report.print();
            if !(passed && report.is_valid()) {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::GenerateGo {
            project_root,
            domains,
        } => {
            logging::init_logging("generate-go");
            let domains: Vec<String> = if domains.is_empty() {
                constants::DEFAULT_GO_DOMAINS.iter().map(|d| d.to_string()).collect()
            } else {
                domains
            };
            let generator = GoCodeGenerator::new(&project_root);
            let summary = generator.generate_all(&domains).await;
            summary.print();
            if !summary.failed.is_empty() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::OgenMigration {
            services_dir,
            service,
            report,
        } => {
            logging::init_logging("ogen-migration");
            run_ogen_migration(&services_dir, service, &report).await
        }
    }
}

async fn run_health(
    mut config: OpsConfig,
    once: bool,
    interval: Option<u64>,
    report: Option<PathBuf>,
    overrides: Option<PathBuf>,
    metrics_port: Option<u16>,
) -> Result<()> {
    let overrides = overrides.unwrap_or_else(|| PathBuf::from(constants::HEALTH_OVERRIDE_FILE));
    if overrides.exists() {
        let merged = config.health.merge_overrides(&overrides)?;
        info!("Loaded {} service overrides from {}", merged, overrides.display());
    }
    if let Some(report) = report {
        config.health.report_path = report.display().to_string();
    }
    if let Some(interval) = interval {
        config.health.interval_secs = interval;
    }
    if let Some(port) = metrics_port {
        init_metrics(port);
    }

    let interval = Duration::from_secs(config.health.interval_secs);
    let wants_db = config.health.services.iter().any(|s| s.check_database);
    let mut monitor = HealthMonitor::new(config.health.clone())?.with_cache(config.redis.clone());
    if wants_db {
        match config.database.connect().await {
            Ok(pool) => monitor = monitor.with_database(pool),
            Err(e) => warn!("Database health checks disabled: {}", e),
        }
    }

    if once {
        let report = monitor.run_once().await?;
        let s = &report.summary;
        println!(
            "{} services: {} healthy, {} warning, {} critical ({:.1}% healthy, overall {})",
            s.total_services,
            s.healthy_services,
            s.warning_services,
            s.critical_services,
            s.health_percentage,
            s.overall_status
        );
        return Ok(());
    }

    monitor.run_loop(interval).await?;
    Ok(())
}

async fn run_ogen_migration(services_dir: &Path, service: Option<String>, report: &Path) -> Result<()> {
    let tester = OgenMigrationTester::new(services_dir);
    let services = match service {
        Some(service) => vec![service],
        None => tester.discover_migrated_services()?,
    };
    if services.is_empty() {
        warn!("No ogen-migrated services found in {}", services_dir.display());
        return Ok(());
    }
    info!("Found {} ogen-migrated services", services.len());

    let mut results = Vec::with_capacity(services.len());
    for service in &services {
        let result = tester.validate_service(service).await;
        if result.passed() {
            info!("{}: OK", service);
        } else {
            error!("{}: {} critical issues", service, result.critical_bugs.len());
        }
        results.push(result);
    }

    fs::write(report, render_report(&results))
        .with_context(|| format!("Failed to write report {}", report.display()))?;
    let passed = results.iter().filter(|r| r.passed()).count();
    println!("Report saved to {}", report.display());
    println!("ogen migration validation: {}/{} services passed", passed, results.len());
    if passed != results.len() {
        bail!("{} services failed ogen migration validation", results.len() - passed);
    }
    Ok(())
}
