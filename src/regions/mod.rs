//! World-region YAML import into the `regions` table.

pub mod document;
pub mod importer;
pub mod schema;
pub mod store;

pub use document::{RegionDocument, RegionRecord};
pub use importer::{discover_region_files, print_summary, ImportOptions, ImportStats, RegionImporter};
pub use schema::{validate_region_file, RegionSchema};
pub use store::{InMemoryRegionStore, PgRegionStore, RegionStore};
