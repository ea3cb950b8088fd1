use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML deserialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema validation failed: {0}")]
    Schema(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Redis error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("Pushgateway returned status {status}: {body}")]
    Pushgateway { status: u16, body: String },
}

/// Failure modes of an external tool invocation (`ogen`, `redocly`, `go`, ...)
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{program} not found in PATH")]
    NotFound { program: String },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, OpsError>;
