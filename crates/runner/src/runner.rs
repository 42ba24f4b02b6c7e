//! Execution engine: runs each test case and classifies the outcome

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{error, info};

use crate::compare::{ArtifactMismatch, Comparator, ConsoleMismatch};
use crate::error::RunnerResult;
use crate::process::{command_line, run_tool, ToolOutput};
use crate::spec::{TestDescriptor, TestKind};

/// Why a single test case failed. Never aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    #[error("tool crashed with exit code {}", display_code(.exit_code))]
    ToolCrashed { exit_code: Option<i32> },

    #[error("tool could not be started: {reason}")]
    SpawnFailed { reason: String },

    #[error("{mismatch}")]
    Artifact { mismatch: ArtifactMismatch },

    #[error("artifact comparison failed: {reason}")]
    ArtifactUnreadable { reason: String },

    #[error("{mismatch}")]
    Console { mismatch: ConsoleMismatch },

    #[error("console comparison failed: {reason}")]
    ConsoleUnreadable { reason: String },

    #[error("console snapshot could not be written: {reason}")]
    SnapshotFailed { reason: String },

    #[error("console snapshot could not be removed: {reason}")]
    CleanupFailed { reason: String },
}

fn display_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (signal)".to_string(), |c| c.to_string())
}

/// Result of running a single test
#[derive(Debug, Clone, Serialize)]
pub struct TestResult {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub kind: TestKind,
    pub command: Vec<String>,
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub artifact_matches_golden: bool,
    pub stdout_matches_reference: bool,
    pub success: bool,
    pub failure: Option<Failure>,
    pub duration_ms: u64,
}

impl TestResult {
    fn new(test: &TestDescriptor) -> Self {
        Self {
            name: test.display_name(),
            description: test.description().to_string(),
            kind: test.kind(),
            command: test.command().to_vec(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            artifact_matches_golden: false,
            stdout_matches_reference: false,
            success: false,
            failure: None,
            duration_ms: 0,
        }
    }

    fn finish(mut self, failure: Option<Failure>, start: Instant) -> Self {
        self.success = failure.is_none();
        self.failure = failure;
        self.duration_ms = start.elapsed().as_millis() as u64;
        self
    }
}

/// Result of running all tests
#[derive(Debug, Clone, Serialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

impl TestSuiteResult {
    /// `(failed, total)`
    pub fn summary(&self) -> (usize, usize) {
        (self.failed, self.total)
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Path to the tool under test
    pub tool: PathBuf,

    /// Echo command lines and captured tool output
    pub verbose: bool,
}

/// Sequential golden-file test runner
pub struct TestRunner {
    config: RunnerConfig,
    comparator: Comparator,
}

impl TestRunner {
    pub fn new(config: RunnerConfig) -> RunnerResult<Self> {
        Ok(Self::with_comparator(config, Comparator::new()?))
    }

    pub fn with_comparator(config: RunnerConfig, comparator: Comparator) -> Self {
        Self { config, comparator }
    }

    /// Run every test in order. One failing test never stops the others.
    pub fn run(&self, tests: &[TestDescriptor]) -> TestSuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(tests.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} test(s)...", tests.len());

        for test in tests {
            let result = self.run_test(test);
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result
                        .failure
                        .as_ref()
                        .map_or_else(|| "unknown error".to_string(), Failure::to_string)
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Test Results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        TestSuiteResult {
            total: tests.len(),
            passed,
            failed,
            started_at,
            duration_ms,
            results,
        }
    }

    /// Run a single test case.
    pub fn run_test(&self, test: &TestDescriptor) -> TestResult {
        let start = Instant::now();
        let mut result = TestResult::new(test);

        if self.config.verbose {
            info!("TEST {}", result.name);
            if !result.description.is_empty() {
                info!("  {}", result.description);
            }
            info!("  Command: {}", command_line(&self.config.tool, test.command()));
        }

        let output = match run_tool(&self.config.tool, test.command()) {
            Ok(output) => output,
            Err(e) => {
                error!("FAIL: {} could not be started: {}", self.config.tool.display(), e);
                let failure = Failure::SpawnFailed {
                    reason: e.to_string(),
                };
                return result.finish(Some(failure), start);
            }
        };

        result.exit_code = output.exit_code;
        result.stdout = output.stdout_text();
        result.stderr = output.stderr_text();
        self.echo(&output);

        if !output.success() && test.golden_path().is_some() {
            error!(
                "FAIL: {} exited with code {} while producing {}",
                self.config.tool.display(),
                display_code(&output.exit_code),
                test.output_path().display()
            );
            let failure = Failure::ToolCrashed {
                exit_code: output.exit_code,
            };
            return result.finish(Some(failure), start);
        }

        // A failing tool with no artifact expected is judged on stderr alone.
        let console = if output.success() {
            &output.stdout
        } else {
            &output.stderr
        };

        let snapshot = snapshot_path(test.output_path());
        if let Err(e) = std::fs::write(&snapshot, console) {
            error!("FAIL: cannot write {}: {}", snapshot.display(), e);
            let failure = Failure::SnapshotFailed {
                reason: e.to_string(),
            };
            return result.finish(Some(failure), start);
        }

        let artifact = self.check_artifact(test);
        let console = self.check_console(test, &snapshot);
        result.artifact_matches_golden = artifact.is_ok();
        result.stdout_matches_reference = console.is_ok();

        let failure = match artifact.err().or(console.err()) {
            Some(failure) => Some(failure),
            None => clean_up(test.output_path(), &snapshot).err(),
        };

        result.finish(failure, start)
    }

    fn check_artifact(&self, test: &TestDescriptor) -> Result<(), Failure> {
        let Some(golden) = test.golden_path() else {
            return Ok(());
        };
        let output = test.output_path();

        match self.comparator.compare_artifact(Some(golden), output) {
            Ok(Ok(())) => {
                info!("PASS: {} EQUALS {}", output.display(), golden.display());
                Ok(())
            }
            Ok(Err(mismatch)) => {
                error!(
                    "FAIL: {} DOESN'T EQUAL {}: {}",
                    output.display(),
                    golden.display(),
                    mismatch
                );
                Err(Failure::Artifact { mismatch })
            }
            Err(e) => {
                error!(
                    "FAIL: cannot compare {} with {}: {}",
                    output.display(),
                    golden.display(),
                    e
                );
                Err(Failure::ArtifactUnreadable {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn check_console(&self, test: &TestDescriptor, snapshot: &Path) -> Result<(), Failure> {
        let Some(reference) = test.stdout_path() else {
            return Ok(());
        };

        match self.comparator.compare_console(reference, snapshot) {
            Ok(Ok(())) => {
                info!("PASS: {} EQUALS {}", snapshot.display(), reference.display());
                Ok(())
            }
            Ok(Err(mismatch)) => {
                error!(
                    "FAIL: {} DOESN'T EQUAL {}: {}",
                    snapshot.display(),
                    reference.display(),
                    mismatch
                );
                Err(Failure::Console { mismatch })
            }
            Err(e) => {
                error!(
                    "FAIL: cannot compare {} with {}: {}",
                    snapshot.display(),
                    reference.display(),
                    e
                );
                Err(Failure::ConsoleUnreadable {
                    reason: e.to_string(),
                })
            }
        }
    }

    fn echo(&self, output: &ToolOutput) {
        if !self.config.verbose {
            return;
        }
        info!("  Exit code: {}", display_code(&output.exit_code));
        for line in output.stdout_text().lines() {
            info!("  stdout: {}", line);
        }
        for line in output.stderr_text().lines() {
            info!("  stderr: {}", line);
        }
    }

    /// Write test results to a JSON file
    pub fn write_results(results: &TestSuiteResult, path: &Path) -> RunnerResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(path, json)?;

        info!("Results written to: {}", path.display());
        Ok(())
    }
}

/// Remove the transient files of a passing test. The tool is not required
/// to produce an artifact on every path, so only the snapshot must go.
fn clean_up(output: &Path, snapshot: &Path) -> Result<(), Failure> {
    let _ = std::fs::remove_file(output);
    std::fs::remove_file(snapshot).map_err(|e| {
        error!("FAIL: cannot remove {}: {}", snapshot.display(), e);
        Failure::CleanupFailed {
            reason: e.to_string(),
        }
    })
}

/// Where the captured console output of a test is kept: `<output>.stdout`.
pub fn snapshot_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".stdout");
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_path_sits_beside_output() {
        assert_eq!(
            snapshot_path(Path::new("/suite/out.vcd")),
            PathBuf::from("/suite/out.vcd.stdout")
        );
    }

    #[test]
    fn test_clean_up_tolerates_missing_artifact() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("out.vcd");
        let snapshot = snapshot_path(&output);
        std::fs::write(&snapshot, "Processing\n").unwrap();

        assert_eq!(clean_up(&output, &snapshot), Ok(()));
        assert!(!snapshot.exists());
    }

    #[test]
    fn test_clean_up_fails_when_snapshot_cannot_be_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("out.vcd");
        std::fs::write(&output, "artifact").unwrap();

        let failure = clean_up(&output, &snapshot_path(&output)).unwrap_err();

        assert!(matches!(failure, Failure::CleanupFailed { .. }));
        assert!(!output.exists());
    }

    #[test]
    fn test_failure_messages() {
        let crashed = Failure::ToolCrashed { exit_code: Some(2) };
        assert_eq!(crashed.to_string(), "tool crashed with exit code 2");

        let killed = Failure::ToolCrashed { exit_code: None };
        assert_eq!(killed.to_string(), "tool crashed with exit code none (signal)");

        let mismatch = Failure::Artifact {
            mismatch: ArtifactMismatch::ContentDiffers(9),
        };
        assert_eq!(mismatch.to_string(), "content differs at line 9");
    }

    #[test]
    fn test_failure_serializes_with_kind() {
        let failure = Failure::Console {
            mismatch: ConsoleMismatch::LineDiffers(3),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "console");
        assert_eq!(json["mismatch"]["kind"], "line_differs");
        assert_eq!(json["mismatch"]["line"], 3);
    }

    #[test]
    fn test_suite_summary() {
        let suite = TestSuiteResult {
            total: 4,
            passed: 3,
            failed: 1,
            started_at: Utc::now(),
            duration_ms: 12,
            results: vec![],
        };
        assert_eq!(suite.summary(), (1, 4));
        assert!(!suite.is_success());
    }
}
