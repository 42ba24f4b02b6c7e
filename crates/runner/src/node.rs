//! Read-only view over the YAML test document
//!
//! The test document is treated as a tree of tagged nodes: mapping keys
//! are tags, and a sequence of mappings contributes every entry of every
//! item as a child, in document order. This keeps the descriptors free of
//! any knowledge about how the YAML happens to be nested.

use serde_yaml::{Mapping, Value};

#[derive(Debug, Clone, Copy)]
pub struct ConfigNode<'a> {
    tag: &'a str,
    value: &'a Value,
}

impl<'a> ConfigNode<'a> {
    /// Wrap a document root.
    pub fn root(value: &'a Value) -> Self {
        Self { tag: "", value }
    }

    pub fn tag(&self) -> &'a str {
        self.tag
    }

    /// Direct children in document order.
    pub fn children(&self) -> Vec<ConfigNode<'a>> {
        match self.value {
            Value::Mapping(map) => entries(map).collect(),
            Value::Sequence(items) => items
                .iter()
                .filter_map(Value::as_mapping)
                .flat_map(entries)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// First direct child with the given tag.
    pub fn child(&self, tag: &str) -> Option<ConfigNode<'a>> {
        self.children().into_iter().find(|child| child.tag == tag)
    }

    /// Items of a sequence node. Each item keeps this node's tag.
    pub fn items(&self) -> Vec<ConfigNode<'a>> {
        match self.value {
            Value::Sequence(items) => items
                .iter()
                .map(|value| ConfigNode { tag: self.tag, value })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Text content of a scalar node. Null and nested structures have none.
    ///
    /// Numbers are rendered from their parsed value, so `1.50` reads back as
    /// `1.5`. Values whose exact spelling matters belong in quotes.
    pub fn text(&self) -> Option<String> {
        match self.value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        self.value.is_mapping()
    }
}

fn entries(map: &Mapping) -> impl Iterator<Item = ConfigNode<'_>> {
    map.iter()
        .filter_map(|(key, value)| key.as_str().map(|tag| ConfigNode { tag, value }))
}
