use crate::constants;
use crate::error::{OpsError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type Section = BTreeMap<String, Value>;

/// A world-region YAML document. Sections are free-form; only the keys the
/// `regions` table needs are read out of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionDocument {
    #[serde(default)]
    pub metadata: Option<Section>,
    #[serde(default)]
    pub region: Option<Section>,
    #[serde(default)]
    pub political: Option<Section>,
    #[serde(default)]
    pub economic: Option<Section>,
    #[serde(default)]
    pub social: Option<Section>,
    #[serde(default)]
    pub technology: Option<Section>,
    #[serde(default)]
    pub environment: Option<Section>,
    #[serde(default)]
    pub military: Option<Section>,
    #[serde(default)]
    pub cities: Option<Value>,
    #[serde(default)]
    pub timeline_events: Option<Value>,
    #[serde(default)]
    pub subregions: Option<Value>,
    #[serde(default)]
    pub game_regions: Option<Value>,
}

impl RegionDocument {
    /// `region.type` if present
    pub fn region_type(&self) -> Option<&str> {
        self.region
            .as_ref()
            .and_then(|r| r.get("type"))
            .and_then(Value::as_str)
    }
}

fn get<'a>(section: &'a Option<Section>, key: &str) -> Option<&'a Value> {
    section.as_ref().and_then(|s| s.get(key))
}

/// Empty, zero, false and null carry no information for the row
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn json(value: Option<&Value>) -> Option<Value> {
    value.filter(|v| !is_blank(v)).cloned()
}

fn float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(['_', ','], "").parse().ok(),
        _ => None,
    }
}

fn integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => s.trim().replace(['_', ','], "").parse().ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// One row of the `regions` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub region_id: String,
    pub name: String,
    pub region_type: String,
    pub area_km2: Option<f64>,
    pub population_2020: Option<i64>,
    pub population_2050: Option<i64>,
    pub population_2093: Option<i64>,
    pub sovereign_states: Option<i64>,
    pub major_powers: Option<Value>,
    pub conflict_zones: Option<Value>,
    pub stability_index: Option<f64>,
    pub gdp_total: Option<f64>,
    pub dominant_sectors: Option<Value>,
    pub trade_hubs: Option<Value>,
    pub currency_zones: Option<Value>,
    pub class_structure: Option<Value>,
    pub cultural_diversity: Option<String>,
    pub education_level: Option<String>,
    pub healthcare_access: Option<String>,
    pub migration_patterns: Option<Value>,
    pub cybernetics_adoption: Option<String>,
    pub ai_integration: Option<String>,
    pub network_infrastructure: Option<String>,
    pub megacities: Option<Value>,
    pub research_centers: Option<Value>,
    pub climate_zones: Option<Value>,
    pub natural_resources: Option<Value>,
    pub environmental_issues: Option<Value>,
    pub protected_areas: Option<Value>,
    pub major_factions: Option<Value>,
    pub conflict_types: Option<Value>,
    pub strategic_resources: Option<Value>,
    pub cities: Option<Value>,
    pub timeline_events: Option<Value>,
    pub subregions: Option<Value>,
    pub game_regions: Option<Value>,
    pub source_file: String,
    pub version: String,
    pub status: String,
}

impl RegionRecord {
    pub fn from_document(doc: &RegionDocument, source_file: &str) -> Result<Self> {
        let region_id = text(get(&doc.metadata, "id"))
            .ok_or_else(|| OpsError::MissingField(format!("metadata.id in {source_file}")))?;
        let name = text(get(&doc.region, "name")).unwrap_or_default();

        Ok(Self {
            region_id,
            name,
            region_type: text(get(&doc.region, "type"))
                .unwrap_or_else(|| constants::DEFAULT_REGION_TYPE.to_string()),
            area_km2: float(get(&doc.region, "area_km2")),
            population_2020: integer(get(&doc.region, "population_2020")),
            population_2050: integer(get(&doc.region, "population_2050")),
            population_2093: integer(get(&doc.region, "population_2093")),

            sovereign_states: integer(get(&doc.political, "sovereign_states")),
            major_powers: json(get(&doc.political, "major_powers")),
            conflict_zones: json(get(&doc.political, "conflict_zones")),
            stability_index: float(get(&doc.political, "stability_index")),

            gdp_total: float(get(&doc.economic, "gdp_total")),
            dominant_sectors: json(get(&doc.economic, "dominant_sectors")),
            trade_hubs: json(get(&doc.economic, "trade_hubs")),
            currency_zones: json(get(&doc.economic, "currency_zones")),

            class_structure: json(get(&doc.social, "class_structure")),
            cultural_diversity: text(get(&doc.social, "cultural_diversity")),
            education_level: text(get(&doc.social, "education_level")),
            healthcare_access: text(get(&doc.social, "healthcare_access")),
            migration_patterns: json(get(&doc.social, "migration_patterns")),

            cybernetics_adoption: text(get(&doc.technology, "cybernetics_adoption")),
            ai_integration: text(get(&doc.technology, "ai_integration")),
            network_infrastructure: text(get(&doc.technology, "network_infrastructure")),
            megacities: json(get(&doc.technology, "megacities")),
            research_centers: json(get(&doc.technology, "research_centers")),

            climate_zones: json(get(&doc.environment, "climate_zones")),
            natural_resources: json(get(&doc.environment, "natural_resources")),
            environmental_issues: json(get(&doc.environment, "environmental_issues")),
            protected_areas: json(get(&doc.environment, "protected_areas")),

            major_factions: json(get(&doc.military, "major_factions")),
            conflict_types: json(get(&doc.military, "conflict_types")),
            strategic_resources: json(get(&doc.military, "strategic_resources")),

            cities: json(doc.cities.as_ref()),
            timeline_events: json(doc.timeline_events.as_ref()),
            subregions: json(doc.subregions.as_ref()),
            game_regions: json(doc.game_regions.as_ref()),

            source_file: source_file.to_string(),
            version: text(get(&doc.metadata, "version"))
                .unwrap_or_else(|| constants::DEFAULT_REGION_VERSION.to_string()),
            status: constants::REGION_STATUS_ACTIVE.to_string(),
        })
    }
}
