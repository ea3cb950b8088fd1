pub mod config;
pub mod constants;
pub mod deploy;
pub mod error;
pub mod health;
pub mod liquibase;
pub mod logging;
pub mod metrics;
pub mod openapi;
pub mod regions;
pub mod tooling;
