//! Shared defaults for the operational tools.
//!
//! Threshold values mirror the alerting levels the operations team agreed on
//! for the game backend; most of them can be overridden from `gameops.toml`.

// Config file looked up in the working directory when --config is not given
pub const DEFAULT_CONFIG_FILE: &str = "gameops.toml";

// Health monitor
pub const HEALTH_OVERRIDE_FILE: &str = "health_config.json";
pub const HEALTH_REPORT_FILE: &str = "health_report.json";
pub const HEALTH_INTERVAL_SECS: u64 = 30;
pub const HEALTH_REQUEST_TIMEOUT_SECS: u64 = 10;
pub const HEALTH_CONNECT_TIMEOUT_SECS: u64 = 5;
pub const RESPONSE_HEALTHY_MS: f64 = 100.0;
pub const RESPONSE_WARNING_MS: f64 = 500.0;
pub const DB_QUERY_WARNING_MS: f64 = 100.0;
pub const DB_QUERY_CRITICAL_MS: f64 = 500.0;
pub const CACHE_MEMORY_WARNING_MB: f64 = 500.0;
pub const CACHE_MEMORY_CRITICAL_MB: f64 = 1000.0;
pub const CACHE_HIT_RATE_WARNING: f64 = 80.0;
pub const CACHE_HIT_RATE_CRITICAL: f64 = 50.0;
pub const SLOW_QUERY_LIMIT: i64 = 5;

// Post-deployment monitor
pub const DEPLOY_INTERVAL_SECS: u64 = 60;
pub const DEPLOY_DURATION_SECS: u64 = 86_400;
pub const ALERT_ESCALATION_SECS: i64 = 300;
pub const CONNECTION_SPIKE_FACTOR: i64 = 2;
pub const SLOW_QUERY_ALERT_COUNT: i64 = 10;
pub const API_SLOW_SECS: f64 = 2.0;
pub const DEFAULT_WATCHED_SCHEMA: &str = "gameplay";
pub const DEFAULT_WATCHED_TABLE: &str = "quest_definitions";
pub const DEFAULT_SERVICE_HEALTH_URL: &str = "http://quest-service.necpgame.internal/health";
pub const DEFAULT_SERVICE_API_URL: &str = "http://quest-service.necpgame.internal/api/v1/quests?limit=1";
pub const OGEN_REPORT_FILE: &str = "ogen-migration-test-report.md";

// Region import
pub const DEFAULT_REGIONS_DIR: &str = "knowledge/data/world-regions";
pub const DEFAULT_REGION_TYPE: &str = "continent";
pub const DEFAULT_REGION_VERSION: &str = "1.0.0";
pub const REGION_STATUS_ACTIVE: &str = "active";

// OpenAPI layout
pub const OPENAPI_DIR: &str = "proto/openapi";
pub const DOMAIN_ENTRYPOINT: &str = "main.yaml";
pub const HTTP_METHODS: &[&str] = &["get", "post", "put", "delete", "patch", "options", "head"];

/// Path fragments that mark a YAML file as a shared component rather than
/// a standalone spec. Matched against the path relative to the domain dir.
pub const COMPONENT_PATTERNS: &[&str] = &[
    "-ext.yaml",
    "-ext1.yaml",
    "-ext2.yaml",
    "-ext3.yaml",
    "-ext4.yaml",
    "-ext5.yaml",
    "schemas/",
    "paths/",
    "requests/",
    "responses/",
    "combat-damage-service/",
    "combat-sessions-service/",
    "combat-service/",
    "ai-service/",
    "inventory-service/",
    "tournament-service/",
    "clan-war-service/",
    "voice-chat-service/",
    "network-service/",
    "guild-service/",
    "notification-service/",
    "interactive-objects-service/",
];

// External tool timeouts (seconds)
pub const OAPI_CODEGEN_TIMEOUT_SECS: u64 = 30;
pub const REDOCLY_TIMEOUT_SECS: u64 = 60;
pub const OGEN_TIMEOUT_SECS: u64 = 120;
pub const GO_MOD_TIMEOUT_SECS: u64 = 60;
pub const GO_BUILD_TIMEOUT_SECS: u64 = 60;
pub const GO_TEST_TIMEOUT_SECS: u64 = 120;
pub const GO_BENCH_TIMEOUT_SECS: u64 = 300;

/// Enterprise domains generated by `generate-go` when no domain is given
pub const DEFAULT_GO_DOMAINS: &[&str] = &[
    "system-domain",
    "specialized-domain",
    "social-domain",
    "economy-domain",
    "world-domain",
    "arena-domain",
    "auth-expansion-domain",
    "cosmetic-domain",
    "cyberpunk-domain",
    "faction-domain",
    "progression-domain",
    "referral-domain",
    "integration-domain",
    "legacy-domain",
    "misc-domain",
];

/// Files whose presence marks a Go service as migrated to ogen
pub const OGEN_MARKERS: &[&str] = &[
    "pkg/api/oas_schemas_gen.go",
    "server/handlers_ogen.go",
    "ogen-codegen.yaml",
];
