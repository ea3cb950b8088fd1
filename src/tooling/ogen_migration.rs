use super::command::run_tool;
use crate::constants;
use crate::error::{OpsError, Result, ToolError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// One `go test -bench` result line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkResult {
    pub time_per_op: String,
    pub mem_per_op: String,
    pub allocs_per_op: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationResult {
    pub service: String,
    pub functional_tests_passed: bool,
    pub performance_improved: bool,
    pub memory_usage_reduced: bool,
    pub integration_tests_passed: bool,
    pub critical_bugs: Vec<String>,
    pub performance_metrics: BTreeMap<String, BenchmarkResult>,
    pub recommendations: Vec<String>,
}

impl MigrationResult {
    fn blocked(service: &str, bug: String, recommendation: &str) -> Self {
        Self {
            service: service.to_string(),
            critical_bugs: vec![bug],
            recommendations: vec![recommendation.to_string()],
            ..Self::default()
        }
    }

    pub fn passed(&self) -> bool {
        self.functional_tests_passed && self.critical_bugs.is_empty()
    }
}

/// Parse `go test -bench -benchmem` output.
///
/// `BenchmarkX-8  1000  1234 ns/op  256 B/op  3 allocs/op` gives time from
/// field 2, memory from field 4 and allocations from field 6; the last two
/// are `N/A` when absent.
pub fn parse_benchmark_output(output: &str) -> BTreeMap<String, BenchmarkResult> {
    let mut results = BTreeMap::new();
    for line in output.lines() {
        if !line.starts_with("Benchmark") || !line.contains("/op") {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        let field = |i: usize| parts.get(i).map_or("N/A", |s| *s).to_string();
        results.insert(
            parts[0].to_string(),
            BenchmarkResult {
                time_per_op: parts[2].to_string(),
                mem_per_op: field(4),
                allocs_per_op: field(6),
            },
        );
    }
    results
}

fn has_ogen_marker(service_dir: &Path) -> bool {
    constants::OGEN_MARKERS
        .iter()
        .any(|marker| service_dir.join(marker).exists())
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Failure lines from a `go test -v` run, at most five.
///
/// `go test` reports assertion failures on stdout, so that stream is mined
/// first; stderr only covers build or panic output.
fn test_failures(stdout: &str, stderr: &str) -> Vec<String> {
    let from_stdout: Vec<String> = stdout
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("--- FAIL") || l.starts_with("FAIL") || l.contains("_test.go:"))
        .take(5)
        .map(str::to_string)
        .collect();
    if !from_stdout.is_empty() {
        return from_stdout;
    }
    stderr
        .lines()
        .chain(stdout.lines())
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(5)
        .map(str::to_string)
        .collect()
}

/// Checks services migrated from oapi-codegen to ogen: benchmarks, build
/// and unit tests.
pub struct OgenMigrationTester {
    services_dir: PathBuf,
}

impl OgenMigrationTester {
    pub fn new(services_dir: impl Into<PathBuf>) -> Self {
        Self {
            services_dir: services_dir.into(),
        }
    }

    /// `*-go` service directories carrying at least one ogen marker file, sorted
    pub fn discover_migrated_services(&self) -> Result<Vec<String>> {
        if !self.services_dir.is_dir() {
            return Err(OpsError::NotFound(format!(
                "services directory {}",
                self.services_dir.display()
            )));
        }
        let mut services = Vec::new();
        for entry in fs::read_dir(&self.services_dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if path.is_dir() && name.ends_with("-go") && has_ogen_marker(&path) {
                services.push(name.to_string());
            }
        }
        services.sort();
        Ok(services)
    }

    async fn run_benchmarks(&self, service_dir: &Path) -> BTreeMap<String, BenchmarkResult> {
        if !service_dir.join("server").join("benchmarks_test.go").is_file() {
            warn!("No benchmark file found in {}", service_dir.display());
            return BTreeMap::new();
        }
        match run_tool(
            "go",
            &["test", "-bench=.", "-benchmem", "./server"],
            Some(service_dir),
            Duration::from_secs(constants::GO_BENCH_TIMEOUT_SECS),
        )
        .await
        {
            Ok(output) => parse_benchmark_output(&output.stdout),
            Err(e) => {
                warn!("Benchmarks failed: {}", e);
                BTreeMap::new()
            }
        }
    }

    pub async fn validate_service(&self, service: &str) -> MigrationResult {
        info!("Starting ogen migration validation for {}", service);
        let service_dir = self.services_dir.join(service);
        if !service_dir.is_dir() {
            return MigrationResult::blocked(
                service,
                format!("Service directory not found: {service}"),
                "Service does not exist",
            );
        }
        if !has_ogen_marker(&service_dir) {
            return MigrationResult::blocked(
                service,
                format!("Service not migrated to ogen: {service}"),
                "Migrate service to ogen first",
            );
        }

        let performance_metrics = self.run_benchmarks(&service_dir).await;
        let mut critical_bugs = Vec::new();

        let build = run_tool(
            "go",
            &["build", "."],
            Some(&service_dir),
            Duration::from_secs(constants::GO_BUILD_TIMEOUT_SECS),
        )
        .await;
        let compiled = match build {
            Ok(_) => true,
            Err(ToolError::Timeout { .. }) => {
                critical_bugs.push("Compilation timeout".to_string());
                false
            }
            Err(ToolError::Failed { stderr, .. }) => {
                critical_bugs.push(format!("Compilation failed: {}", truncate(&stderr, 200)));
                false
            }
            Err(e) => {
                critical_bugs.push(format!("Compilation failed: {e}"));
                false
            }
        };

        let tests = run_tool(
            "go",
            &["test", "./...", "-v"],
            Some(&service_dir),
            Duration::from_secs(constants::GO_TEST_TIMEOUT_SECS),
        )
        .await;
        let tests_passed = match tests {
            Ok(_) => true,
            Err(ToolError::Timeout { .. }) => {
                critical_bugs.push("Unit tests timeout".to_string());
                false
            }
            Err(ToolError::Failed { stdout, stderr, .. }) => {
                critical_bugs.extend(
                    test_failures(&stdout, &stderr)
                        .into_iter()
                        .map(|l| format!("Unit test failure: {l}")),
                );
                false
            }
            Err(e) => {
                critical_bugs.push(format!("Unit tests could not run: {e}"));
                false
            }
        };

        let performance_improved = !performance_metrics.is_empty();
        let memory_usage_reduced = performance_metrics
            .values()
            .any(|m| m.allocs_per_op == "0");

        let mut recommendations = Vec::new();
        if !compiled {
            recommendations.push("Fix compilation errors before proceeding".to_string());
        }
        if !tests_passed {
            recommendations.push("Fix failing unit tests".to_string());
        }
        if !performance_improved {
            recommendations.push("Add performance benchmarks to validate ogen gains".to_string());
        }
        if !memory_usage_reduced {
            recommendations.push("Verify memory pooling implementation".to_string());
        }

        MigrationResult {
            service: service.to_string(),
            functional_tests_passed: tests_passed,
            performance_improved,
            memory_usage_reduced,
            integration_tests_passed: tests_passed,
            critical_bugs,
            performance_metrics,
            recommendations,
        }
    }
}

fn mark(ok: bool, otherwise: &str) -> &str {
    if ok {
        "[OK]"
    } else {
        otherwise
    }
}

/// Markdown report over all validated services
pub fn render_report(results: &[MigrationResult]) -> String {
    let total = results.len();
    let passed = results.iter().filter(|r| r.passed()).count();
    let improved = results.iter().filter(|r| r.performance_improved).count();
    let optimized = results.iter().filter(|r| r.memory_usage_reduced).count();
    let rate = if total == 0 {
        0.0
    } else {
        passed as f64 / total as f64 * 100.0
    };

    let mut out = String::new();
    let _ = writeln!(out, "# ogen Migration Testing Report\n");
    let _ = writeln!(out, "## Executive Summary\n");
    let _ = writeln!(out, "- **Total Services Tested:** {total}");
    let _ = writeln!(out, "- **Migration Success Rate:** {passed}/{total} ({rate:.1}%)");
    let _ = writeln!(out, "- **Performance Improved:** {improved}/{total}");
    let _ = writeln!(out, "- **Memory Optimized:** {optimized}/{total}\n");

    for result in results {
        let _ = writeln!(out, "## {}\n", result.service);
        let _ = writeln!(out, "### Test Results");
        let _ = writeln!(out, "- Functional Tests: {}", mark(result.functional_tests_passed, "[ERROR]"));
        let _ = writeln!(out, "- Performance Improved: {}", mark(result.performance_improved, "[WARNING]"));
        let _ = writeln!(out, "- Memory Usage Reduced: {}", mark(result.memory_usage_reduced, "[WARNING]"));
        let _ = writeln!(out, "- Integration Tests: {}\n", mark(result.integration_tests_passed, "[ERROR]"));

        if !result.critical_bugs.is_empty() {
            let _ = writeln!(out, "### Critical Issues");
            for bug in &result.critical_bugs {
                let _ = writeln!(out, "- [ERROR] {bug}");
            }
            out.push('\n');
        }
        if !result.performance_metrics.is_empty() {
            let _ = writeln!(out, "### Performance Metrics");
            for (name, m) in &result.performance_metrics {
                let _ = writeln!(out, "- **{name}:**");
                let _ = writeln!(out, "  - Time/op: {}", m.time_per_op);
                let _ = writeln!(out, "  - Mem/op: {}", m.mem_per_op);
                let _ = writeln!(out, "  - Allocs/op: {}", m.allocs_per_op);
            }
            out.push('\n');
        }
        if !result.recommendations.is_empty() {
            let _ = writeln!(out, "### Recommendations");
            for rec in &result.recommendations {
                let _ = writeln!(out, "- {rec}");
            }
            out.push('\n');
        }
    }

    let _ = writeln!(out, "## Overall Assessment\n");
    if total > 0 && passed == total && results.iter().all(|r| r.performance_improved) {
        let _ = writeln!(out, "### [OK] ogen Migration Successful\n");
        let _ = writeln!(out, "**Ready for production deployment**");
    } else {
        let _ = writeln!(out, "### [WARNING] ogen Migration Issues Found\n");
        let failing: Vec<&str> = results
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.service.as_str())
            .collect();
        if !failing.is_empty() {
            let _ = writeln!(out, "**Services needing fixes:** {}\n", failing.join(", "));
        }
        let _ = writeln!(out, "**Action Required:** Fix issues before production deployment");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BENCH: &str = "\
goos: linux
goarch: amd64
BenchmarkHTTPHandler-8   \t  500000\t      2314 ns/op\t     512 B/op\t       0 allocs/op
BenchmarkJSONEncode-8    \t 1000000\t      1042 ns/op
BenchmarkBroken
PASS
ok  \tcombat-service-go/server\t3.201s
";

    #[test]
    fn parses_benchmark_lines() {
        let results = parse_benchmark_output(BENCH);
        assert_eq!(results.len(), 2);

        let http = &results["BenchmarkHTTPHandler-8"];
        assert_eq!(http.time_per_op, "2314");
        assert_eq!(http.mem_per_op, "512");
        assert_eq!(http.allocs_per_op, "0");

        let json = &results["BenchmarkJSONEncode-8"];
        assert_eq!(json.time_per_op, "1042");
        assert_eq!(json.mem_per_op, "N/A");
        assert_eq!(json.allocs_per_op, "N/A");
    }

    #[test]
    fn test_failures_come_from_stdout() {
        let stdout = "\
=== RUN   TestCreateCharacter
    handler_test.go:42: expected 201, got 500
--- FAIL: TestCreateCharacter (0.00s)
=== RUN   TestListCharacters
--- PASS: TestListCharacters (0.00s)
FAIL
FAIL\tcombat-service-go/server\t0.012s
";
        let failures = test_failures(stdout, "");
        assert_eq!(
            failures,
            vec![
                "handler_test.go:42: expected 201, got 500",
                "--- FAIL: TestCreateCharacter (0.00s)",
                "FAIL",
                "FAIL\tcombat-service-go/server\t0.012s",
            ]
        );

        let build_only = test_failures("", "# combat-service-go/server\nundefined: Handler");
        assert_eq!(build_only, vec!["# combat-service-go/server", "undefined: Handler"]);
    }

    #[test]
    fn discovers_only_marked_go_services() {
        let dir = tempfile::tempdir().unwrap();
        let services = dir.path();
        fs::create_dir_all(services.join("combat-service-go/pkg/api")).unwrap();
        fs::write(services.join("combat-service-go/pkg/api/oas_schemas_gen.go"), "").unwrap();
        fs::create_dir_all(services.join("auth-service-go")).unwrap();
        fs::write(services.join("auth-service-go/ogen-codegen.yaml"), "").unwrap();
        fs::create_dir_all(services.join("legacy-service-go")).unwrap();
        fs::create_dir_all(services.join("web-ui")).unwrap();
        fs::write(services.join("web-ui/ogen-codegen.yaml"), "").unwrap();

        let tester = OgenMigrationTester::new(services);
        assert_eq!(
            tester.discover_migrated_services().unwrap(),
            vec!["auth-service-go".to_string(), "combat-service-go".to_string()]
        );
    }

    #[tokio::test]
    async fn unmigrated_service_is_a_critical_bug() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("legacy-service-go")).unwrap();
        let tester = OgenMigrationTester::new(dir.path());

        let missing = tester.validate_service("ghost-service-go").await;
        assert_eq!(missing.critical_bugs, vec!["Service directory not found: ghost-service-go"]);

        let legacy = tester.validate_service("legacy-service-go").await;
        assert!(!legacy.passed());
        assert_eq!(legacy.recommendations, vec!["Migrate service to ogen first"]);
    }

    #[test]
    fn report_lists_services_needing_fixes() {
        let ok = MigrationResult {
            service: "combat-service-go".to_string(),
            functional_tests_passed: true,
            performance_improved: true,
            memory_usage_reduced: true,
            integration_tests_passed: true,
            performance_metrics: parse_benchmark_output(BENCH),
            ..MigrationResult::default()
        };
        let broken = MigrationResult::blocked(
            "legacy-service-go",
            "Service not migrated to ogen: legacy-service-go".to_string(),
            "Migrate service to ogen first",
        );

        let report = render_report(&[ok.clone(), broken]);
        assert!(report.contains("- **Migration Success Rate:** 1/2 (50.0%)"));
        assert!(report.contains("- **BenchmarkHTTPHandler-8:**"));
        assert!(report.contains("- [ERROR] Service not migrated to ogen: legacy-service-go"));
        assert!(report.contains("**Services needing fixes:** legacy-service-go"));

        let clean = render_report(&[ok]);
        assert!(clean.contains("### [OK] ogen Migration Successful"));
    }
}
