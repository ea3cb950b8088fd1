//! Wrappers around external code-generation and Go tooling.

pub mod codegen;
pub mod command;
pub mod ogen_migration;

pub use codegen::{GenerationSummary, GoCodeGenerator};
pub use command::{absolute_root, run_tool, ToolOutput};
pub use ogen_migration::{
    parse_benchmark_output, render_report, BenchmarkResult, MigrationResult, OgenMigrationTester,
};
