//! Checks that domain OpenAPI specs are usable by the Go code generators.

pub mod rules;
pub mod validator;

pub use rules::{check_basic_structure, check_go_generation, has_self_reference, is_component_path, Findings};
pub use validator::{DomainValidator, ValidationReport};
