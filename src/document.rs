//! Fetched documents and their metadata envelope.

use crate::urn::Urn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A fetched JSON resource plus the `_metadata` envelope the processor
/// maintains. The body is treated opaquely except for fields a handler
/// explicitly reads.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
pub struct Document {
    #[serde(rename = "_metadata", default)]
    pub metadata: Metadata,
    #[serde(flatten)]
    body: Map<String, Value>,
}

impl Document {
    /// Wraps a fetched body. Array bodies (GitHub list endpoints) become
    /// `{"elements": [...]}` so page processing reads uniformly.
    pub fn new(body: Value) -> Self {
        let body = match body {
            Value::Array(elements) => {
                let mut map = Map::new();
                map.insert("elements".to_owned(), Value::Array(elements));
                map
            }
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("value".to_owned(), other);
                map
            }
        };
        Self { metadata: Metadata::default(), body }
    }

    /// Wraps a fetched body and records where and when it was fetched.
    pub fn fetched(body: Value, origin: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        let mut document = Self::new(body);
        document.metadata.origin = Some(origin.into());
        document.metadata.fetched_at = Some(fetched_at);
        document
    }

    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.body.get(name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.body.get_mut(name)
    }

    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Reads an identifier field, accepting both JSON strings and numbers.
    pub fn id_field(&self, name: &str) -> Option<String> {
        match self.field(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Page elements; empty when the body is not a wrapped list.
    pub fn elements(&self) -> &[Value] {
        self.field("elements").and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.metadata.links.get(name)
    }

    pub fn set_link(&mut self, name: impl Into<String>, link: Link) {
        self.metadata.links.insert(name.into(), link);
    }

    /// The canonical identity recorded for this document, if any.
    pub fn self_href(&self) -> Option<&Urn> {
        match self.link("self")? {
            Link::SelfLink { href } => Some(href),
            _ => None,
        }
    }
}

/// Processor bookkeeping stored alongside the fetched body.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub links: BTreeMap<String, Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    /// Source URL the body was fetched from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// A typed link attached to a document.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Link {
    /// Canonical identity of this document.
    #[serde(rename = "self")]
    SelfLink { href: Urn },
    /// The collection this document belongs to.
    Siblings { href: Urn },
    /// Singular reference to another document (or set of documents).
    Resource { href: LinkTarget },
    /// Subordinate multi-document set owned by this document.
    Collection { href: Urn },
    /// Non-owned association to a set.
    Relation { href: Urn },
}

/// Either one URN or an array of URNs.
#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
#[serde(untagged)]
pub enum LinkTarget {
    One(Urn),
    Many(Vec<Urn>),
}

impl From<Urn> for LinkTarget {
    fn from(urn: Urn) -> Self {
        Self::One(urn)
    }
}

impl From<Vec<Urn>> for LinkTarget {
    fn from(urns: Vec<Urn>) -> Self {
        Self::Many(urns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_bodies_are_wrapped() {
        let document = Document::new(json!([{"id": 1}, {"id": 2}]));
        assert_eq!(2, document.elements().len());
        // object bodies pass through
        let document = Document::new(json!({"id": 3}));
        assert!(document.elements().is_empty());
        assert_eq!(Some("3".to_owned()), document.id_field("id"));
    }

    #[test]
    fn test_id_field_accepts_strings_and_numbers() {
        let document = Document::new(json!({"id": 42, "sha": "abc"}));
        assert_eq!(Some("42".to_owned()), document.id_field("id"));
        assert_eq!(Some("abc".to_owned()), document.id_field("sha"));
        assert_eq!(None, document.id_field("missing"));
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut document = Document::new(json!({"id": 7, "name": "acme"}));
        document.set_link("self", Link::SelfLink { href: "urn:org:7".into() });
        document.set_link("siblings", Link::Siblings { href: "urn:orgs".into() });
        document.metadata.version = Some(4);

        let encoded = serde_json::to_value(&document).unwrap();
        // envelope is embedded beside the body fields
        assert_eq!("acme", encoded["name"]);
        assert_eq!("self", encoded["_metadata"]["links"]["self"]["type"]);
        assert_eq!("urn:org:7", encoded["_metadata"]["links"]["self"]["href"]);

        let decoded: Document = serde_json::from_value(encoded).unwrap();
        assert_eq!(document, decoded);
    }
}
