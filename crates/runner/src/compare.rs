//! Golden comparison of generated artifacts and console output
//!
//! Artifacts are compared line by line. The first lines of a trace carry a
//! generation date and a tool version, so they are checked against an
//! [`ArtifactPolicy`]: a table saying, per header line, whether it is
//! skipped, shape-checked against a pattern, or compared exactly. Every
//! line after the header must match the golden file exactly.
//!
//! Console output is compared after absolute directory prefixes are
//! stripped from both sides, since they depend on where the suite lives.

use regex::Regex;
use serde::Serialize;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

use crate::error::RunnerResult;

/// Date line written by the trace tools, e.g. `$date October 17, 2026 09:15:02`
pub const DATE_PATTERN: &str = r"^\$date .+\d\d?, \d\d\d\d \d\d:\d\d:\d\d";

pub const VERSION_PATTERN: &str = r"^\$version ";

#[cfg(windows)]
const PATH_PATTERN: &str = r#"(^|[\s'"(=])[A-Za-z]:\\(?:[^\\\s'"]+\\)*"#;

#[cfg(not(windows))]
const PATH_PATTERN: &str = r#"(^|[\s'"(=])/(?:[^/\s'"]+/)*"#;

/// Why a generated artifact differs from its golden file. Lines are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "line", rename_all = "snake_case")]
pub enum ArtifactMismatch {
    #[error("date malformed at line {0}")]
    MalformedDate(usize),

    #[error("date trailer differs at line {0}")]
    TrailerMismatch(usize),

    #[error("version malformed at line {0}")]
    MalformedVersion(usize),

    #[error("content differs at line {0}")]
    ContentDiffers(usize),

    #[error("length differs at line {0}")]
    LengthDiffers(usize),
}

/// Why captured console output differs from its reference. Lines are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "line", rename_all = "snake_case")]
pub enum ConsoleMismatch {
    #[error("console output differs at line {0}")]
    LineDiffers(usize),

    #[error("console output length differs at line {0}")]
    LengthDiffers(usize),
}

/// Treatment of a single header line
#[derive(Debug, Clone)]
pub enum LinePolicy {
    /// Consumed from both files, never compared.
    Skip,
    /// The output line must match the pattern; the golden line is ignored.
    Shape(Regex),
    /// Both lines must be identical.
    Exact,
}

#[derive(Debug, Clone)]
pub struct HeaderRule {
    pub policy: LinePolicy,
    pub on_mismatch: fn(usize) -> ArtifactMismatch,
}

impl HeaderRule {
    pub fn skip() -> Self {
        Self {
            policy: LinePolicy::Skip,
            on_mismatch: ArtifactMismatch::ContentDiffers,
        }
    }

    pub fn shape(pattern: &str, on_mismatch: fn(usize) -> ArtifactMismatch) -> RunnerResult<Self> {
        Ok(Self {
            policy: LinePolicy::Shape(Regex::new(pattern)?),
            on_mismatch,
        })
    }

    pub fn exact(on_mismatch: fn(usize) -> ArtifactMismatch) -> Self {
        Self {
            policy: LinePolicy::Exact,
            on_mismatch,
        }
    }
}

/// Per-line header table; lines past the table compare exactly
#[derive(Debug, Clone)]
pub struct ArtifactPolicy {
    header: Vec<HeaderRule>,
}

impl ArtifactPolicy {
    pub fn new(header: Vec<HeaderRule>) -> Self {
        Self { header }
    }

    /// Header marker, date, date trailer, version.
    pub fn trace_header() -> RunnerResult<Self> {
        Ok(Self::new(vec![
            HeaderRule::skip(),
            HeaderRule::shape(DATE_PATTERN, ArtifactMismatch::MalformedDate)?,
            HeaderRule::exact(ArtifactMismatch::TrailerMismatch),
            HeaderRule::shape(VERSION_PATTERN, ArtifactMismatch::MalformedVersion)?,
        ]))
    }

    pub fn header_len(&self) -> usize {
        self.header.len()
    }
}

/// Reads raw lines, treating `\r\n` like `\n`. The terminator is kept so a
/// missing final newline still counts as a difference.
struct LineReader {
    reader: BufReader<File>,
}

impl LineReader {
    fn open(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            reader: BufReader::new(File::open(path)?),
        })
    }

    fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        let mut line = Vec::new();
        if self.reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if line.ends_with(b"\r\n") {
            line.truncate(line.len() - 2);
            line.push(b'\n');
        }
        Ok(Some(line))
    }
}

/// Golden comparator for artifacts and console snapshots
#[derive(Debug, Clone)]
pub struct Comparator {
    policy: ArtifactPolicy,
    path_pattern: Regex,
}

impl Comparator {
    /// Comparator for the trace header layout.
    pub fn new() -> RunnerResult<Self> {
        Self::with_policy(ArtifactPolicy::trace_header()?)
    }

    pub fn with_policy(policy: ArtifactPolicy) -> RunnerResult<Self> {
        Ok(Self {
            policy,
            path_pattern: Regex::new(PATH_PATTERN)?,
        })
    }

    /// Compare `output` against `golden`. Without a golden file there is
    /// nothing to compare and the artifact passes.
    ///
    /// The outer error is an I/O failure (unreadable file); the inner one
    /// is the first mismatch found.
    pub fn compare_artifact(
        &self,
        golden: Option<&Path>,
        output: &Path,
    ) -> RunnerResult<Result<(), ArtifactMismatch>> {
        let Some(golden) = golden else {
            return Ok(Ok(()));
        };

        let mut gold = LineReader::open(golden)?;
        let mut out = LineReader::open(output)?;
        let mut line = 0;

        for rule in &self.policy.header {
            line += 1;
            let gold_line = gold.next_line()?;
            let out_line = out.next_line()?;

            let accepted = match &rule.policy {
                LinePolicy::Skip => true,
                LinePolicy::Shape(pattern) => out_line
                    .as_deref()
                    .is_some_and(|l| pattern.is_match(&String::from_utf8_lossy(l))),
                LinePolicy::Exact => gold_line == out_line,
            };

            if !accepted {
                return Ok(Err((rule.on_mismatch)(line)));
            }
        }

        loop {
            line += 1;
            match (gold.next_line()?, out.next_line()?) {
                (None, None) => return Ok(Ok(())),
                (Some(g), Some(o)) if g == o => {}
                (Some(_), Some(_)) => return Ok(Err(ArtifactMismatch::ContentDiffers(line))),
                _ => return Ok(Err(ArtifactMismatch::LengthDiffers(line))),
            }
        }
    }

    pub fn matches(&self, golden: Option<&Path>, output: &Path) -> bool {
        matches!(self.compare_artifact(golden, output), Ok(Ok(())))
    }

    /// Compare a captured console snapshot against its reference.
    pub fn compare_console(
        &self,
        reference: &Path,
        captured: &Path,
    ) -> RunnerResult<Result<(), ConsoleMismatch>> {
        let reference = std::fs::read(reference)?;
        let captured = std::fs::read(captured)?;
        let reference = String::from_utf8_lossy(&reference);
        let captured = String::from_utf8_lossy(&captured);

        let mut expected = reference.lines();
        let mut actual = captured.lines();
        let mut line = 0;

        loop {
            line += 1;
            match (expected.next(), actual.next()) {
                (None, None) => return Ok(Ok(())),
                (Some(e), Some(a)) if self.redact(e) == self.redact(a) => {}
                (Some(_), Some(_)) => return Ok(Err(ConsoleMismatch::LineDiffers(line))),
                _ => return Ok(Err(ConsoleMismatch::LengthDiffers(line))),
            }
        }
    }

    pub fn stdout_matches(&self, reference: &Path, captured: &Path) -> bool {
        matches!(self.compare_console(reference, captured), Ok(Ok(())))
    }

    /// Strip absolute directory prefixes, keeping file names.
    pub fn redact<'a>(&self, line: &'a str) -> Cow<'a, str> {
        self.path_pattern.replace_all(line, "${1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use test_case::test_case;

    const BODY: &str = "$end\n$timescale 1 us\n$end\n$scope module top $end\n$var wire 1 ! sig $end\n#0\n1!\n#10\n0!\n";

    fn artifact(date: &str, trailer: &str, version: &str, body: &str) -> String {
        format!("$comment tracecheck $end\n{date}\n{trailer}\n{version}\n{body}")
    }

    fn golden() -> String {
        artifact(
            "$date December 8, 2014 14:15:00",
            "$end",
            "$version Tracer v.1.0.0",
            BODY,
        )
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
            }
        }

        fn write(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            std::fs::write(&path, content).unwrap();
            path
        }
    }

    fn compare(gold: &str, output: &str) -> Result<(), ArtifactMismatch> {
        let fixture = Fixture::new();
        let gold = fixture.write("gold.vcd", gold);
        let output = fixture.write("out.vcd", output);
        Comparator::new()
            .unwrap()
            .compare_artifact(Some(&gold), &output)
            .unwrap()
    }

    #[test]
    fn test_artifact_reflexive() {
        assert_eq!(compare(&golden(), &golden()), Ok(()));
    }

    #[test]
    fn test_volatile_lines_tolerated() {
        let output = artifact(
            "$date October 17, 2026 09:15:02",
            "$end",
            "$version Tracer v.2.4.1",
            BODY,
        );
        assert_eq!(compare(&golden(), &output), Ok(()));
    }

    #[test]
    fn test_header_marker_ignored() {
        let output = golden().replacen("$comment tracecheck $end", "anything at all", 1);
        assert_eq!(compare(&golden(), &output), Ok(()));
    }

    #[test]
    fn test_trailer_difference_rejected() {
        let output = artifact(
            "$date December 8, 2014 14:15:00",
            "$end extra",
            "$version Tracer v.1.0.0",
            BODY,
        );
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::TrailerMismatch(3))
        );
    }

    #[test]
    fn test_malformed_date_rejected() {
        let output = artifact("$date yesterday", "$end", "$version Tracer v.1.0.0", BODY);
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::MalformedDate(2))
        );
    }

    #[test]
    fn test_malformed_date_rejected_even_if_golden_agrees() {
        let bad = artifact("$date yesterday", "$end", "$version Tracer v.1.0.0", BODY);
        assert_eq!(compare(&bad, &bad), Err(ArtifactMismatch::MalformedDate(2)));
    }

    #[test]
    fn test_malformed_version_rejected() {
        let output = artifact(
            "$date December 8, 2014 14:15:00",
            "$end",
            "version Tracer v.1.0.0",
            BODY,
        );
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::MalformedVersion(4))
        );
    }

    #[test]
    fn test_content_difference_reports_line() {
        let output = golden().replace("#10\n", "#11\n");
        // header (4) + $end, $timescale, $end, $scope, $var, #0, 1! => #10 is line 12
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::ContentDiffers(12))
        );
    }

    #[test]
    fn test_extra_output_line_is_length_difference() {
        let output = format!("{}#20\n", golden());
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::LengthDiffers(14))
        );
    }

    #[test]
    fn test_truncated_output_is_length_difference() {
        let output = golden().replace("#10\n0!\n", "");
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::LengthDiffers(12))
        );
    }

    #[test]
    fn test_crlf_line_endings_equivalent() {
        let output = golden().replace('\n', "\r\n");
        assert_eq!(compare(&golden(), &output), Ok(()));
    }

    #[test]
    fn test_missing_final_newline_is_difference() {
        let output = golden().trim_end().to_string();
        assert_eq!(
            compare(&golden(), &output),
            Err(ArtifactMismatch::ContentDiffers(13))
        );
    }

    #[test]
    fn test_no_golden_passes_vacuously() {
        let comparator = Comparator::new().unwrap();
        assert!(comparator.matches(None, Path::new("/does/not/exist.vcd")));
    }

    #[test]
    fn test_missing_output_is_io_error() {
        let fixture = Fixture::new();
        let gold = fixture.write("gold.vcd", &golden());
        let comparator = Comparator::new().unwrap();

        assert!(comparator
            .compare_artifact(Some(&gold), &fixture.dir.path().join("missing.vcd"))
            .is_err());
        assert!(!comparator.matches(Some(&gold), &fixture.dir.path().join("missing.vcd")));
    }

    #[test]
    fn test_custom_policy_table() {
        let policy = ArtifactPolicy::new(vec![HeaderRule::shape(
            r"^# generated ",
            ArtifactMismatch::MalformedVersion,
        )
        .unwrap()]);
        let comparator = Comparator::with_policy(policy).unwrap();
        assert_eq!(comparator.policy.header_len(), 1);

        let fixture = Fixture::new();
        let gold = fixture.write("gold.txt", "# generated yesterday\nA\nB\n");
        let out = fixture.write("out.txt", "# generated today\nA\nC\n");
        assert_eq!(
            comparator.compare_artifact(Some(&gold), &out).unwrap(),
            Err(ArtifactMismatch::ContentDiffers(3))
        );
    }

    fn compare_console(reference: &str, captured: &str) -> Result<(), ConsoleMismatch> {
        let fixture = Fixture::new();
        let reference = fixture.write("expected.txt", reference);
        let captured = fixture.write("out.vcd.stdout", captured);
        Comparator::new()
            .unwrap()
            .compare_console(&reference, &captured)
            .unwrap()
    }

    #[test]
    fn test_stdout_matches_contract() {
        let fixture = Fixture::new();
        let reference = fixture.write("expected.txt", "Processing /ci/suite/in.txt\ndone\n");
        let same = fixture.write("same.stdout", "Processing /tmp/run/in.txt\ndone\n");
        let other = fixture.write("other.stdout", "Processing /tmp/run/in.txt\n");
        let comparator = Comparator::new().unwrap();

        #[cfg(unix)]
        assert!(comparator.stdout_matches(&reference, &same));
        assert!(!comparator.stdout_matches(&reference, &other));
        assert!(!comparator.stdout_matches(&reference, &fixture.dir.path().join("absent")));
    }

    #[test]
    fn test_console_identical() {
        assert_eq!(compare_console("a\nb\n", "a\nb\n"), Ok(()));
    }

    #[test]
    fn test_console_reports_first_divergent_line() {
        assert_eq!(
            compare_console("one\ntwo\nthree\n", "one\ntwo\nTHREE\n"),
            Err(ConsoleMismatch::LineDiffers(3))
        );
    }

    #[test]
    fn test_console_missing_line() {
        assert_eq!(
            compare_console("one\ntwo\n", "one\n"),
            Err(ConsoleMismatch::LengthDiffers(2))
        );
    }

    #[test]
    fn test_console_extra_line() {
        assert_eq!(
            compare_console("one\n", "one\nwarning\n"),
            Err(ConsoleMismatch::LengthDiffers(2))
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_console_ignores_absolute_directories() {
        assert_eq!(
            compare_console(
                "Reading /home/ci/suite/a.txt\nDone.\n",
                "Reading /tmp/.tmpX1y2/a.txt\nDone.\n"
            ),
            Ok(())
        );
        assert_eq!(
            compare_console(
                "Reading /home/ci/suite/a.txt\n",
                "Reading /tmp/.tmpX1y2/b.txt\n"
            ),
            Err(ConsoleMismatch::LineDiffers(1))
        );
    }

    #[cfg(unix)]
    #[test_case("Cannot open /home/alice/suite/a.txt", "Cannot open a.txt" ; "trailing path")]
    #[test_case("/var/tmp/run/out.vcd written", "out.vcd written" ; "leading path")]
    #[test_case("Reading '/srv/data/in.log'", "Reading 'in.log'" ; "quoted path")]
    #[test_case("output=/a/b/c.vcd", "output=c.vcd" ; "assignment")]
    #[test_case("see docs/usage.txt", "see docs/usage.txt" ; "relative path untouched")]
    #[test_case("ratio 1/2", "ratio 1/2" ; "not a path")]
    fn test_redact(line: &str, expected: &str) {
        let comparator = Comparator::new().unwrap();
        assert_eq!(comparator.redact(line), expected);
    }
}
