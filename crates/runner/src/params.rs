//! Schema-validated parameter sets
//!
//! A schema lists the fields a block of the test document may carry. A
//! field with a non-empty missing message is required; reading fails with
//! every missing message at once, so a test author sees all problems in a
//! single pass.

use std::collections::BTreeMap;

use crate::error::{RunnerError, RunnerResult};
use crate::node::ConfigNode;

/// One schema entry.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    /// Empty for optional fields.
    pub missing: &'static str,
}

impl Field {
    pub const fn required(name: &'static str, missing: &'static str) -> Self {
        Self { name, missing }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self { name, missing: "" }
    }

    pub fn is_required(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Values read from a single block, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    values: BTreeMap<&'static str, String>,
}

impl ParameterSet {
    /// Read the schema fields from the direct children of `node`.
    ///
    /// An absent node reads as an empty one. Blank values count as absent
    /// and are never stored. Children not named in the schema are ignored.
    pub fn read(node: Option<&ConfigNode<'_>>, schema: &[Field]) -> RunnerResult<Self> {
        let mut values = BTreeMap::new();

        if let Some(node) = node {
            for child in node.children() {
                let Some(field) = schema.iter().find(|f| f.name == child.tag()) else {
                    continue;
                };
                if let Some(text) = child.text() {
                    let text = text.trim();
                    if !text.is_empty() {
                        values.insert(field.name, text.to_string());
                    }
                }
            }
        }

        let errors: Vec<String> = schema
            .iter()
            .filter(|field| field.is_required() && !values.contains_key(field.name))
            .map(|field| field.missing.to_string())
            .collect();

        if !errors.is_empty() {
            return Err(RunnerError::Configuration(errors));
        }

        Ok(Self { values })
    }

    /// Field value, empty when the field was not supplied.
    pub fn get(&self, name: &str) -> &str {
        self.optional(name).unwrap_or_default()
    }

    pub fn optional(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}
