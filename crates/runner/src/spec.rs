//! Declarative test case descriptors
//!
//! Every element of the test document describes one invocation of the tool
//! under test. The element's tag selects the test kind, and each kind knows
//! how to turn its `unique` block into a command line. The result is a
//! [`TestDescriptor`]: the command is fully built and all file names are
//! resolved against the test directory.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::RunnerResult;
use crate::node::ConfigNode;
use crate::params::{Field, ParameterSet};

/// Kind of tool invocation a test performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Single-source conversion
    Invocation,
    /// Multi-source merge
    Merge,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Invocation => write!(f, "invocation"),
            TestKind::Merge => write!(f, "merge"),
        }
    }
}

/// Informational block, both fields optional
#[derive(Debug, Clone, Default)]
pub struct TestInfo {
    pub name: String,
    pub description: String,
}

const INFO_FIELDS: &[Field] = &[Field::optional("name"), Field::optional("description")];

impl TestInfo {
    pub fn from_node(node: Option<&ConfigNode<'_>>) -> RunnerResult<Self> {
        let params = ParameterSet::read(node, INFO_FIELDS)?;
        Ok(Self {
            name: params.get("name").to_string(),
            description: params.get("description").to_string(),
        })
    }
}

const COMMON_FIELDS: &[Field] = &[
    Field::required("output_file", "Missing output file"),
    Field::required("golden_file", "Missing golden file"),
    Field::optional("stdout_file"),
];

// With a console reference the golden artifact becomes optional.
const STDOUT_ONLY_FIELDS: &[Field] = &[
    Field::required("output_file", "Missing output file"),
    Field::optional("golden_file"),
    Field::optional("stdout_file"),
];

/// Files shared by every test kind, resolved against the test directory
#[derive(Debug, Clone)]
pub struct CommonFields {
    pub output_path: PathBuf,
    /// `None` for console-only tests
    pub golden_path: Option<PathBuf>,
    pub stdout_path: Option<PathBuf>,
}

impl CommonFields {
    pub fn from_node(node: Option<&ConfigNode<'_>>, base_dir: &Path) -> RunnerResult<Self> {
        let has_stdout_reference = node
            .and_then(|n| n.child("stdout_file"))
            .and_then(|c| c.text())
            .is_some_and(|text| !text.trim().is_empty());

        let schema = if has_stdout_reference {
            STDOUT_ONLY_FIELDS
        } else {
            COMMON_FIELDS
        };
        let params = ParameterSet::read(node, schema)?;

        Ok(Self {
            output_path: base_dir.join(params.get("output_file")),
            golden_path: params.optional("golden_file").map(|f| base_dir.join(f)),
            stdout_path: params.optional("stdout_file").map(|f| base_dir.join(f)),
        })
    }
}

/// Capabilities every test kind provides
pub trait TestCase {
    fn kind(&self) -> TestKind;
    fn info(&self) -> &TestInfo;
    fn common(&self) -> &CommonFields;
    /// Arguments passed to the tool under test, in order.
    fn command(&self) -> Vec<String>;
}

fn path_token(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

const INVOCATION_FIELDS: &[Field] = &[
    Field::required("input_file", "Missing input file"),
    Field::required("time_unit", "Missing time unit"),
    Field::optional("line_counter"),
    Field::optional("user_format"),
];

/// Converts a single input file
#[derive(Debug, Clone)]
pub struct InvocationTest {
    info: TestInfo,
    common: CommonFields,
    input_path: PathBuf,
    time_unit: String,
    line_counter: Option<String>,
    user_format: Option<String>,
}

impl InvocationTest {
    pub fn from_node(node: &ConfigNode<'_>, base_dir: &Path) -> RunnerResult<Self> {
        let info = TestInfo::from_node(node.child("info").as_ref())?;
        let common = CommonFields::from_node(node.child("common").as_ref(), base_dir)?;
        let unique = ParameterSet::read(node.child("unique").as_ref(), INVOCATION_FIELDS)?;

        Ok(Self {
            info,
            common,
            input_path: base_dir.join(unique.get("input_file")),
            time_unit: unique.get("time_unit").to_string(),
            line_counter: unique.optional("line_counter").map(String::from),
            user_format: unique.optional("user_format").map(String::from),
        })
    }
}

impl TestCase for InvocationTest {
    fn kind(&self) -> TestKind {
        TestKind::Invocation
    }

    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn common(&self) -> &CommonFields {
        &self.common
    }

    fn command(&self) -> Vec<String> {
        let mut command = vec!["-t".to_string(), self.time_unit.clone()];

        if let Some(counter) = &self.line_counter {
            command.push("-c".to_string());
            command.push(counter.clone());
        }

        if let Some(format) = &self.user_format {
            command.push("-u".to_string());
            command.push(format.clone());
        }

        command.push("-o".to_string());
        command.push(path_token(&self.common.output_path));
        command.push(path_token(&self.input_path));
        command
    }
}

const SOURCE_FIELDS: &[Field] = &[
    Field::required("format", "Missing source format."),
    Field::required("time_stamp", "Missing source time stamp."),
    Field::required("time_unit", "Missing source time unit."),
    Field::optional("prefix"),
    Field::optional("line_counter"),
    Field::required("input_file", "Missing source input file."),
];

/// One input stream of a merge
#[derive(Debug, Clone)]
pub struct Source {
    pub format: String,
    pub time_stamp: String,
    pub time_unit: String,
    pub prefix: String,
    pub line_counter: String,
    pub input_path: PathBuf,
}

impl Source {
    pub fn from_node(node: Option<&ConfigNode<'_>>, base_dir: &Path) -> RunnerResult<Self> {
        let params = ParameterSet::read(node, SOURCE_FIELDS)?;

        Ok(Self {
            format: params.get("format").to_string(),
            time_stamp: params.get("time_stamp").to_string(),
            time_unit: params.get("time_unit").to_string(),
            prefix: params.get("prefix").to_string(),
            line_counter: params.get("line_counter").to_string(),
            input_path: base_dir.join(params.get("input_file")),
        })
    }

    /// Single command-line token. Empty optional fields keep their slot.
    pub fn token(&self) -> String {
        let input = path_token(&self.input_path);
        [
            self.format.as_str(),
            self.time_stamp.as_str(),
            self.time_unit.as_str(),
            self.prefix.as_str(),
            self.line_counter.as_str(),
            input.as_str(),
        ]
        .join(",")
    }
}

const MERGE_FIELDS: &[Field] = &[Field::optional("time_unit")];

/// Merges one or more sources into a single trace
#[derive(Debug, Clone)]
pub struct MergeTest {
    info: TestInfo,
    common: CommonFields,
    time_unit: Option<String>,
    sources: Vec<Source>,
}

impl MergeTest {
    pub fn from_node(node: &ConfigNode<'_>, base_dir: &Path) -> RunnerResult<Self> {
        let info = TestInfo::from_node(node.child("info").as_ref())?;
        let common = CommonFields::from_node(node.child("common").as_ref(), base_dir)?;

        let unique = node.child("unique");
        let params = ParameterSet::read(unique.as_ref(), MERGE_FIELDS)?;

        let source_nodes = unique
            .and_then(|u| u.child("sources"))
            .map(|sources| source_items(&sources))
            .unwrap_or_default();

        if source_nodes.is_empty() {
            // Report what a lone source would be missing.
            Source::from_node(None, base_dir)?;
        }

        let sources = source_nodes
            .iter()
            .map(|item| Source::from_node(Some(item), base_dir))
            .collect::<RunnerResult<Vec<_>>>()?;

        Ok(Self {
            info,
            common,
            time_unit: params.optional("time_unit").map(String::from),
            sources,
        })
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }
}

/// Accepts `- {format: ..}` items, `- source: {..}` items, or a single
/// `source:` mapping.
fn source_items<'a>(sources: &ConfigNode<'a>) -> Vec<ConfigNode<'a>> {
    let items = sources.items();
    if items.is_empty() {
        return sources
            .children()
            .into_iter()
            .filter(|child| child.tag() == "source")
            .collect();
    }

    items
        .into_iter()
        .map(|item| {
            item.child("source")
                .filter(ConfigNode::is_mapping)
                .unwrap_or(item)
        })
        .collect()
}

impl TestCase for MergeTest {
    fn kind(&self) -> TestKind {
        TestKind::Merge
    }

    fn info(&self) -> &TestInfo {
        &self.info
    }

    fn common(&self) -> &CommonFields {
        &self.common
    }

    fn command(&self) -> Vec<String> {
        let mut command = vec!["-o".to_string(), path_token(&self.common.output_path)];

        if let Some(unit) = &self.time_unit {
            command.push("-t".to_string());
            command.push(unit.clone());
        }

        command.extend(self.sources.iter().map(Source::token));
        command
    }
}

/// A fully built test case, immutable once constructed
#[derive(Debug, Clone)]
pub struct TestDescriptor {
    kind: TestKind,
    info: TestInfo,
    command: Vec<String>,
    output_path: PathBuf,
    golden_path: Option<PathBuf>,
    stdout_path: Option<PathBuf>,
}

impl TestDescriptor {
    pub fn from_case(case: &dyn TestCase) -> Self {
        let common = case.common();
        Self {
            kind: case.kind(),
            info: case.info().clone(),
            command: case.command(),
            output_path: common.output_path.clone(),
            golden_path: common.golden_path.clone(),
            stdout_path: common.stdout_path.clone(),
        }
    }

    pub fn kind(&self) -> TestKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn description(&self) -> &str {
        &self.info.description
    }

    /// Name for log lines, falling back to the output file name.
    pub fn display_name(&self) -> String {
        if !self.info.name.is_empty() {
            return self.info.name.clone();
        }
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.kind.to_string())
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn golden_path(&self) -> Option<&Path> {
        self.golden_path.as_deref()
    }

    pub fn stdout_path(&self) -> Option<&Path> {
        self.stdout_path.as_deref()
    }
}

/// Builds a descriptor from a test element and the test directory
pub type Constructor = fn(&ConfigNode<'_>, &Path) -> RunnerResult<TestDescriptor>;

fn build_invocation(node: &ConfigNode<'_>, base_dir: &Path) -> RunnerResult<TestDescriptor> {
    InvocationTest::from_node(node, base_dir).map(|test| TestDescriptor::from_case(&test))
}

fn build_merge(node: &ConfigNode<'_>, base_dir: &Path) -> RunnerResult<TestDescriptor> {
    MergeTest::from_node(node, base_dir).map(|test| TestDescriptor::from_case(&test))
}

/// Maps document tags to test kind constructors
#[derive(Clone)]
pub struct TestKindRegistry {
    constructors: HashMap<String, Constructor>,
}

impl fmt::Debug for TestKindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.constructors.keys().collect();
        tags.sort();
        f.debug_struct("TestKindRegistry").field("tags", &tags).finish()
    }
}

impl TestKindRegistry {
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    pub fn register(&mut self, tag: impl Into<String>, constructor: Constructor) -> &mut Self {
        self.constructors.insert(tag.into(), constructor);
        self
    }

    pub fn get(&self, tag: &str) -> Option<Constructor> {
        self.constructors.get(tag).copied()
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.constructors.contains_key(tag)
    }
}

impl Default for TestKindRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register("invocation", build_invocation)
            .register("maker", build_invocation)
            .register("merge", build_merge);
        registry
    }
}
