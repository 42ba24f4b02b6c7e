//! Tracecheck Test Runner
//!
//! Functional tests for command-line trace generation tools. A test
//! directory holds a `test.yaml` document plus the input, golden and
//! console-reference files it names. Each test element becomes a fully
//! built command line; the runner executes the tool under test and
//! compares what it produced with the golden references.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TestCatalog (YAML)                     │
//! │    ├── invocation { info, common, unique }                  │
//! │    │     └── -t <unit> [-c <name>] [-u <fmt>] -o <out> <in> │
//! │    └── merge { info, common, unique.sources[] }             │
//! │          └── -o <out> [-t <unit>] <source token>...         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── run_tool(tool, command) -> ToolOutput                │
//! │    ├── compare_artifact(golden, output)                     │
//! │    │     └── ArtifactPolicy: skip | shape | exact per line  │
//! │    └── compare_console(reference, snapshot)                 │
//! │          └── absolute directories redacted                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod compare;
pub mod error;
pub mod node;
pub mod params;
pub mod process;
pub mod runner;
pub mod spec;

pub use catalog::{CatalogOptions, TestCatalog, UnknownTagPolicy};
pub use compare::{ArtifactMismatch, ArtifactPolicy, Comparator, ConsoleMismatch};
pub use error::{RunnerError, RunnerResult};
pub use runner::{Failure, RunnerConfig, TestResult, TestRunner, TestSuiteResult};
pub use spec::{TestDescriptor, TestKind, TestKindRegistry};
