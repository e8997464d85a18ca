//! Resource documents - loosely-typed JSON trees with typed field-path access.
//!
//! Every resource flowing through the engine (composite, environment,
//! observed, desired) is a [`ResourceDocument`]. Field paths are
//! dot-delimited and case-sensitive; numeric segments index into lists.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::rules::TagSet;

/// A failed field-path lookup. Callers decide whether this is recoverable;
/// the resolvers treat it as "no contribution", the merge applier treats a
/// type mismatch on the tag field as a per-resource failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("field not found: {0}")]
    NotFound(String),

    #[error("field {path} is not a {expected}")]
    TypeMismatch { path: String, expected: &'static str },
}

/// One resource's specification or status as a tree of maps, lists and
/// scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceDocument(Value);

impl ResourceDocument {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Look up the value at a dot-delimited field path.
    pub fn value_at(&self, path: &str) -> Result<&Value, FieldError> {
        let mut current = &self.0;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map
                    .get(segment)
                    .ok_or_else(|| FieldError::NotFound(path.to_string()))?,
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index))
                    .ok_or_else(|| FieldError::NotFound(path.to_string()))?,
                _ => return Err(FieldError::NotFound(path.to_string())),
            };
        }
        Ok(current)
    }

    /// Read a tag map (string keys to string values) at a field path.
    pub fn tags_at(&self, path: &str) -> Result<TagSet, FieldError> {
        let map = self
            .value_at(path)?
            .as_object()
            .ok_or_else(|| FieldError::TypeMismatch {
                path: path.to_string(),
                expected: "map of strings",
            })?;

        let mut tags = TagSet::new();
        for (key, value) in map {
            let value = value.as_str().ok_or_else(|| FieldError::TypeMismatch {
                path: format!("{path}.{key}"),
                expected: "string",
            })?;
            tags.insert(key.clone(), value.to_string());
        }
        Ok(tags)
    }

    /// Read a list of strings at a field path.
    pub fn string_list_at(&self, path: &str) -> Result<Vec<String>, FieldError> {
        let items = self
            .value_at(path)?
            .as_array()
            .ok_or_else(|| FieldError::TypeMismatch {
                path: path.to_string(),
                expected: "list of strings",
            })?;

        items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| FieldError::TypeMismatch {
                        path: path.to_string(),
                        expected: "list of strings",
                    })
            })
            .collect()
    }

    /// Write a value at a field path, creating intermediate maps as needed.
    /// List segments must address an existing index; a scalar in the middle
    /// of the path is a type mismatch.
    pub fn set(&mut self, path: &str, value: Value) -> Result<(), FieldError> {
        let (parent, leaf) = match path.rsplit_once('.') {
            Some((parent_path, leaf)) => (self.container_at_mut(parent_path, path)?, leaf),
            None => (&mut self.0, path),
        };

        match parent {
            Value::Object(map) => {
                map.insert(leaf.to_string(), value);
                Ok(())
            }
            Value::Array(items) => {
                let slot = leaf
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get_mut(index))
                    .ok_or_else(|| FieldError::NotFound(path.to_string()))?;
                *slot = value;
                Ok(())
            }
            _ => Err(FieldError::TypeMismatch {
                path: path.to_string(),
                expected: "map or list",
            }),
        }
    }

    fn container_at_mut(&mut self, path: &str, full_path: &str) -> Result<&mut Value, FieldError> {
        let mut current = &mut self.0;
        for segment in path.split('.') {
            current = match current {
                Value::Object(map) => map
                    .entry(segment.to_string())
                    .or_insert_with(|| Value::Object(Map::new())),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get_mut(index))
                    .ok_or_else(|| FieldError::NotFound(full_path.to_string()))?,
                _ => {
                    return Err(FieldError::TypeMismatch {
                        path: full_path.to_string(),
                        expected: "map or list",
                    })
                }
            };
        }
        Ok(current)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.0.get("apiVersion")?.as_str()
    }

    pub fn kind(&self) -> Option<&str> {
        self.0.get("kind")?.as_str()
    }

    pub fn name(&self) -> Option<&str> {
        self.0.get("metadata")?.get("name")?.as_str()
    }

    /// The API group, derived from `apiVersion`. An apiVersion without a
    /// slash (`v1`) belongs to the empty core group.
    pub fn group(&self) -> Option<&str> {
        let api_version = self.api_version()?;
        Some(match api_version.split_once('/') {
            Some((group, _version)) => group,
            None => "",
        })
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.0
            .get("metadata")?
            .get("annotations")?
            .get(key)?
            .as_str()
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.0.get("metadata")?.get("labels")?.get(key)?.as_str()
    }
}

impl From<Value> for ResourceDocument {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn vpc() -> ResourceDocument {
        ResourceDocument::new(json!({
            "apiVersion": "ec2.aws.upbound.io/v1beta1",
            "kind": "VPC",
            "metadata": {
                "name": "test-vpc",
                "annotations": {"team": "platform"},
                "labels": {"env": "dev"},
            },
            "spec": {
                "forProvider": {
                    "region": "us-west-1",
                    "tags": {"owner": "alice"},
                },
                "subnets": [
                    {"cidr": "10.0.0.0/24"},
                    {"cidr": "10.0.1.0/24"},
                ],
            },
        }))
    }

    #[test]
    fn value_at_walks_nested_maps() {
        let doc = vpc();
        assert_eq!(
            doc.value_at("spec.forProvider.region").unwrap(),
            &json!("us-west-1")
        );
    }

    #[test]
    fn value_at_indexes_lists() {
        let doc = vpc();
        assert_eq!(
            doc.value_at("spec.subnets.1.cidr").unwrap(),
            &json!("10.0.1.0/24")
        );
    }

    #[test]
    fn value_at_missing_path_is_not_found() {
        let doc = vpc();
        assert_eq!(
            doc.value_at("spec.forProvider.missing"),
            Err(FieldError::NotFound("spec.forProvider.missing".to_string()))
        );
    }

    #[test]
    fn value_at_through_scalar_is_not_found() {
        let doc = vpc();
        assert!(matches!(
            doc.value_at("spec.forProvider.region.nested"),
            Err(FieldError::NotFound(_))
        ));
    }

    #[test]
    fn tags_at_reads_string_map() {
        let doc = vpc();
        let tags = doc.tags_at("spec.forProvider.tags").unwrap();
        assert_eq!(tags.get("owner").map(String::as_str), Some("alice"));
    }

    #[test]
    fn tags_at_rejects_non_map() {
        let doc = vpc();
        assert!(matches!(
            doc.tags_at("spec.forProvider.region"),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn tags_at_rejects_non_string_values() {
        let doc = ResourceDocument::new(json!({"spec": {"tags": {"count": 3}}}));
        assert!(matches!(
            doc.tags_at("spec.tags"),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn string_list_at_reads_keys() {
        let doc = ResourceDocument::new(json!({"spec": {"keys": ["a", "b"]}}));
        assert_eq!(
            doc.string_list_at("spec.keys").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn set_creates_intermediate_maps() {
        let mut doc = ResourceDocument::new(json!({}));
        doc.set("spec.forProvider.tags", json!({"a": "1"})).unwrap();
        assert_eq!(
            doc.as_value(),
            &json!({"spec": {"forProvider": {"tags": {"a": "1"}}}})
        );
    }

    #[test]
    fn set_overwrites_existing_value() {
        let mut doc = vpc();
        doc.set("spec.forProvider.region", json!("eu-west-1")).unwrap();
        assert_eq!(
            doc.value_at("spec.forProvider.region").unwrap(),
            &json!("eu-west-1")
        );
    }

    #[test]
    fn set_through_scalar_is_type_mismatch() {
        let mut doc = vpc();
        assert!(matches!(
            doc.set("spec.forProvider.region.nested", json!("x")),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn group_and_kind_accessors() {
        let doc = vpc();
        assert_eq!(doc.group(), Some("ec2.aws.upbound.io"));
        assert_eq!(doc.kind(), Some("VPC"));
        assert_eq!(doc.name(), Some("test-vpc"));
    }

    #[test]
    fn core_group_is_empty() {
        let doc = ResourceDocument::new(json!({"apiVersion": "v1", "kind": "ConfigMap"}));
        assert_eq!(doc.group(), Some(""));
    }

    #[test]
    fn annotation_and_label_lookup() {
        let doc = vpc();
        assert_eq!(doc.annotation("team"), Some("platform"));
        assert_eq!(doc.label("env"), Some("dev"));
        assert_eq!(doc.annotation("missing"), None);
    }
}
