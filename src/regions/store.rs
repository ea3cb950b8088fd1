use super::document::RegionRecord;
use crate::error::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

const CREATE_REGIONS_SQL: &str = include_str!("../../migrations/001_create_regions.sql");

const UPSERT_REGION_SQL: &str = r#"
INSERT INTO regions (
    region_id, name, type, area_km2,
    population_2020, population_2050, population_2093,
    sovereign_states, major_powers, conflict_zones, stability_index,
    gdp_total, dominant_sectors, trade_hubs, currency_zones,
    class_structure, cultural_diversity, education_level, healthcare_access, migration_patterns,
    cybernetics_adoption, ai_integration, network_infrastructure, megacities, research_centers,
    climate_zones, natural_resources, environmental_issues, protected_areas,
    major_factions, conflict_types, strategic_resources,
    cities, timeline_events, subregions, game_regions,
    source_file, version, status
) VALUES (
    $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
    $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
    $31, $32, $33, $34, $35, $36, $37, $38, $39
)
ON CONFLICT (region_id) DO UPDATE SET
    name = EXCLUDED.name,
    type = EXCLUDED.type,
    area_km2 = EXCLUDED.area_km2,
    population_2020 = EXCLUDED.population_2020,
    population_2050 = EXCLUDED.population_2050,
    population_2093 = EXCLUDED.population_2093,
    sovereign_states = EXCLUDED.sovereign_states,
    major_powers = EXCLUDED.major_powers,
    conflict_zones = EXCLUDED.conflict_zones,
    stability_index = EXCLUDED.stability_index,
    gdp_total = EXCLUDED.gdp_total,
    dominant_sectors = EXCLUDED.dominant_sectors,
    trade_hubs = EXCLUDED.trade_hubs,
    currency_zones = EXCLUDED.currency_zones,
    class_structure = EXCLUDED.class_structure,
    cultural_diversity = EXCLUDED.cultural_diversity,
    education_level = EXCLUDED.education_level,
    healthcare_access = EXCLUDED.healthcare_access,
    migration_patterns = EXCLUDED.migration_patterns,
    cybernetics_adoption = EXCLUDED.cybernetics_adoption,
    ai_integration = EXCLUDED.ai_integration,
    network_infrastructure = EXCLUDED.network_infrastructure,
    megacities = EXCLUDED.megacities,
    research_centers = EXCLUDED.research_centers,
    climate_zones = EXCLUDED.climate_zones,
    natural_resources = EXCLUDED.natural_resources,
    environmental_issues = EXCLUDED.environmental_issues,
    protected_areas = EXCLUDED.protected_areas,
    major_factions = EXCLUDED.major_factions,
    conflict_types = EXCLUDED.conflict_types,
    strategic_resources = EXCLUDED.strategic_resources,
    cities = EXCLUDED.cities,
    timeline_events = EXCLUDED.timeline_events,
    subregions = EXCLUDED.subregions,
    game_regions = EXCLUDED.game_regions,
    source_file = EXCLUDED.source_file,
    version = EXCLUDED.version,
    status = EXCLUDED.status,
    updated_at = NOW()
"#;

/// Persistence for imported regions
#[async_trait]
pub trait RegionStore: Send + Sync {
    /// Insert the region or overwrite the row with the same `region_id`
    async fn upsert_region(&self, record: &RegionRecord) -> Result<()>;
}

pub struct PgRegionStore {
    pool: PgPool,
}

impl PgRegionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `regions` table if it does not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(CREATE_REGIONS_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RegionStore for PgRegionStore {
    async fn upsert_region(&self, r: &RegionRecord) -> Result<()> {
        sqlx::query(UPSERT_REGION_SQL)
            .bind(&r.region_id)
            .bind(&r.name)
            .bind(&r.region_type)
            .bind(r.area_km2)
            .bind(r.population_2020)
            .bind(r.population_2050)
            .bind(r.population_2093)
            .bind(r.sovereign_states)
            .bind(&r.major_powers)
            .bind(&r.conflict_zones)
            .bind(r.stability_index)
            .bind(r.gdp_total)
            .bind(&r.dominant_sectors)
            .bind(&r.trade_hubs)
            .bind(&r.currency_zones)
            .bind(&r.class_structure)
            .bind(&r.cultural_diversity)
            .bind(&r.education_level)
            .bind(&r.healthcare_access)
            .bind(&r.migration_patterns)
            .bind(&r.cybernetics_adoption)
            .bind(&r.ai_integration)
            .bind(&r.network_infrastructure)
            .bind(&r.megacities)
            .bind(&r.research_centers)
            .bind(&r.climate_zones)
            .bind(&r.natural_resources)
            .bind(&r.environmental_issues)
            .bind(&r.protected_areas)
            .bind(&r.major_factions)
            .bind(&r.conflict_types)
            .bind(&r.strategic_resources)
            .bind(&r.cities)
            .bind(&r.timeline_events)
            .bind(&r.subregions)
            .bind(&r.game_regions)
            .bind(&r.source_file)
            .bind(&r.version)
            .bind(&r.status)
            .execute(&self.pool)
            .await?;

        debug!("Upserted region {}", r.region_id);
        Ok(())
    }
}

/// In-memory store for dry runs and tests
#[derive(Clone, Default)]
pub struct InMemoryRegionStore {
    regions: Arc<Mutex<HashMap<String, RegionRecord>>>,
}

impl InMemoryRegionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, region_id: &str) -> Option<RegionRecord> {
        self.regions.lock().await.get(region_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.regions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RegionStore for InMemoryRegionStore {
    async fn upsert_region(&self, record: &RegionRecord) -> Result<()> {
        let mut regions = self.regions.lock().await;
        regions.insert(record.region_id.clone(), record.clone());
        debug!("Stored region {} in memory", record.region_id);
        Ok(())
    }
}
