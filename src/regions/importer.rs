use super::document::{RegionDocument, RegionRecord};
use super::schema::RegionSchema;
use super::store::RegionStore;
use crate::constants;
use crate::error::{OpsError, Result};
use metrics::counter;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument};

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub dir: PathBuf,
    pub limit: Option<usize>,
    pub region_type: Option<String>,
    pub dry_run: bool,
    pub validate: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(constants::DEFAULT_REGIONS_DIR),
            limit: None,
            region_type: None,
            dry_run: false,
            validate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub processed: usize,
    pub imported: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// `*.yaml` files directly under `dir`, sorted by path
pub fn discover_region_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn read_document(path: &Path) -> Result<(Value, RegionDocument)> {
    let raw = fs::read_to_string(path)?;
    let value: Value = serde_yaml::from_str(&raw)?;
    let doc: RegionDocument = serde_json::from_value(value.clone())?;
    Ok((value, doc))
}

pub struct RegionImporter {
    options: ImportOptions,
}

impl RegionImporter {
    pub fn new(options: ImportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// `false` only when the file parses and its `region.type` differs from
    /// the requested one. Unreadable files fall through to the import step.
    fn matches_type(&self, path: &Path) -> bool {
        let Some(wanted) = self.options.region_type.as_deref() else {
            return true;
        };
        match read_document(path) {
            Ok((_, doc)) => doc.region_type() == Some(wanted),
            Err(e) => {
                debug!("Could not pre-read {} for type filter: {}", path.display(), e);
                true
            }
        }
    }

    async fn import_file(&self, path: &Path, store: Option<&dyn RegionStore>) -> Result<RegionRecord> {
        let (value, doc) = read_document(path)?;
        if self.options.validate {
            RegionSchema::embedded()?.validate(&value)?;
        }

        let record = RegionRecord::from_document(&doc, &path.display().to_string())?;
        if self.options.dry_run {
            info!("[DRY RUN] Would import region: {} ({})", record.name, record.region_id);
            return Ok(record);
        }

        let store = store.ok_or_else(|| {
            OpsError::Config("a region store is required unless running with --dry-run".to_string())
        })?;
        store.upsert_region(&record).await?;
        info!("Imported region: {} ({})", record.name, record.region_id);
        Ok(record)
    }

    /// Import every discovered region file. The store is never touched in
    /// dry-run mode and may be `None` there.
    #[instrument(skip(self, store), fields(dir = %self.options.dir.display()))]
    pub async fn run(&self, store: Option<&dyn RegionStore>) -> Result<ImportStats> {
        let dir = &self.options.dir;
        if !dir.is_dir() {
            return Err(OpsError::NotFound(format!(
                "regions directory {}",
                dir.display()
            )));
        }

        let mut files = discover_region_files(dir)?;
        info!("Found {} YAML files", files.len());
        if let Some(limit) = self.options.limit {
            files.truncate(limit);
        }

        let mut stats = ImportStats::default();
        for path in &files {
            if !self.matches_type(path) {
                stats.skipped += 1;
                continue;
            }

            stats.processed += 1;
            match self.import_file(path, store).await {
                Ok(_) => {
                    stats.imported += 1;
                    counter!("gameops_regions_imported_total").increment(1);
                }
                Err(e) => {
                    error!("Failed to import {}: {}", path.display(), e);
                    stats.failed += 1;
                    counter!("gameops_regions_failed_total").increment(1);
                }
            }
        }

        Ok(stats)
    }
}

pub fn print_summary(stats: &ImportStats, dry_run: bool) {
    println!();
    println!("=== World regions import summary ===");
    println!("Processed: {}", stats.processed);
    println!("Imported:  {}", stats.imported);
    println!("Failed:    {}", stats.failed);
    println!("Skipped:   {}", stats.skipped);
    if dry_run {
        println!("Dry run: no data was written to the database");
    }
}
