//! Test catalog loaded from a test directory

use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{RunnerError, RunnerResult};
use crate::node::ConfigNode;
use crate::spec::{TestDescriptor, TestKindRegistry};

/// Name of the test document inside every test directory
pub const CATALOG_FILE: &str = "test.yaml";

const ROOT_SHAPE: &str = "The test document must be a sequence of test elements";

/// What to do with elements whose tag names no registered test kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownTagPolicy {
    /// Skip with a warning, so older runners accept newer documents.
    #[default]
    Skip,
    /// Fail the whole load.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogOptions {
    pub unknown_tags: UnknownTagPolicy,
    pub registry: TestKindRegistry,
}

impl CatalogOptions {
    pub fn strict() -> Self {
        Self {
            unknown_tags: UnknownTagPolicy::Reject,
            ..Default::default()
        }
    }
}

fn unknown_tag(policy: UnknownTagPolicy, tag: &str, position: usize) -> RunnerResult<()> {
    match policy {
        UnknownTagPolicy::Skip => {
            warn!("Skipping unknown test kind <{}> at position {}", tag, position);
            Ok(())
        }
        UnknownTagPolicy::Reject => Err(RunnerError::UnknownTestKind(tag.to_string())),
    }
}

/// Ordered test descriptors of one test directory
#[derive(Debug, Clone)]
pub struct TestCatalog {
    base_dir: PathBuf,
    tests: Vec<TestDescriptor>,
}

impl TestCatalog {
    /// Load `test.yaml` from `base_dir` with lenient tag handling.
    pub fn load(base_dir: &Path) -> RunnerResult<Self> {
        Self::load_with(base_dir, &CatalogOptions::default())
    }

    pub fn load_with(base_dir: &Path, options: &CatalogOptions) -> RunnerResult<Self> {
        let base_dir = std::path::absolute(base_dir)?;
        let path = base_dir.join(CATALOG_FILE);

        if !path.is_file() {
            return Err(RunnerError::CatalogNotFound(path));
        }

        debug!("Loading test catalog from {}", path.display());
        let content = std::fs::read_to_string(&path)?;
        Self::from_yaml(&content, &base_dir, options)
    }

    /// Build a catalog from document text. File names resolve against
    /// `base_dir`. Nothing is returned unless every element is valid.
    ///
    /// The root must be a sequence of single-key mappings (a lone mapping
    /// is also accepted). Sequence items that are not mappings go through
    /// the unknown-tag policy like any unregistered tag.
    pub fn from_yaml(yaml: &str, base_dir: &Path, options: &CatalogOptions) -> RunnerResult<Self> {
        let document: Value = serde_yaml::from_str(yaml)?;
        let root = ConfigNode::root(&document);
        let items = match &document {
            Value::Sequence(_) => root.items(),
            Value::Mapping(_) => vec![root],
            _ => {
                return Err(RunnerError::Configuration(vec![ROOT_SHAPE.to_string()]));
            }
        };

        let mut tests = Vec::new();
        let mut position = 0;

        for item in items {
            if !item.is_mapping() {
                position += 1;
                let tag = item.text().unwrap_or_default();
                unknown_tag(options.unknown_tags, &tag, position)?;
                continue;
            }

            for element in item.children() {
                position += 1;
                let tag = element.tag();
                let Some(build) = options.registry.get(tag) else {
                    unknown_tag(options.unknown_tags, tag, position)?;
                    continue;
                };

                let test = build(&element, base_dir).map_err(|e| RunnerError::InvalidTest {
                    index: position,
                    tag: tag.to_string(),
                    source: Box::new(e),
                })?;
                debug!("Loaded {} test '{}'", test.kind(), test.display_name());
                tests.push(test);
            }
        }

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            tests,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn tests(&self) -> &[TestDescriptor] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
