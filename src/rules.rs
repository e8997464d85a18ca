//! Rule configuration - the per-invocation tag management policy.
//!
//! Three rule families share one shape: a source kind (literal value or a
//! field path into the composite or environment document) plus the fields
//! that source needs. Add and ignore rules additionally carry a merge
//! policy. The raw optional fields collapse into closed source enums via
//! [`AddRule::source`] and friends; a field-path kind without a path is a
//! fatal configuration error.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Result, TagManagerError};

/// A resource tag map. Keys are unique; ordering is irrelevant to the
/// algebra but kept deterministic for stable output.
pub type TagSet = BTreeMap<String, String>;

/// Where a rule sources its tags or keys from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SourceKind {
    /// Static values inline in the rule.
    #[default]
    FromValue,
    /// A field path into the composite resource document.
    FromCompositeFieldPath,
    /// A field path into the supplemental environment document.
    FromEnvironmentFieldPath,
}

/// What happens when a resolved tag key already exists on the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TagPolicy {
    /// Overwrite the existing value.
    #[default]
    Replace,
    /// Keep the existing value.
    Retain,
}

/// A resolved tag-map source, one variant per kind with only the fields
/// that kind needs.
#[derive(Debug, Clone, PartialEq)]
pub enum TagMapSource<'a> {
    Literal(&'a TagSet),
    CompositeFieldPath(&'a str),
    EnvironmentFieldPath(&'a str),
}

/// A resolved key-list source.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyListSource<'a> {
    Literal(&'a [String]),
    CompositeFieldPath(&'a str),
    EnvironmentFieldPath(&'a str),
}

/// Tags to add to every eligible resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AddRule {
    #[serde(rename = "type")]
    pub kind: SourceKind,

    /// Field path to read tags from, for the field-path source kinds.
    pub from_field_path: Option<String>,

    /// Inline tags, for the `FromValue` source kind.
    pub tags: TagSet,

    pub policy: TagPolicy,
}

/// Tag keys whose observed values are carried over unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct IgnoreRule {
    #[serde(rename = "type")]
    pub kind: SourceKind,

    pub from_field_path: Option<String>,

    /// Inline keys, for the `FromValue` source kind.
    pub keys: Vec<String>,

    pub policy: TagPolicy,
}

/// Tag keys deleted from every eligible resource. Removal is unconditional,
/// so there is no policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoveRule {
    #[serde(rename = "type")]
    pub kind: SourceKind,

    pub from_field_path: Option<String>,

    pub keys: Vec<String>,
}

/// The full rule configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    pub add_tags: Vec<AddRule>,
    pub ignore_tags: Vec<IgnoreRule>,
    pub remove_tags: Vec<RemoveRule>,
}

fn require_path<'a>(
    from_field_path: &'a Option<String>,
    family: &str,
    kind: SourceKind,
) -> Result<&'a str> {
    from_field_path.as_deref().ok_or_else(|| {
        TagManagerError::InvalidRule(format!(
            "{family} rule with type {kind:?} requires fromFieldPath"
        ))
    })
}

impl AddRule {
    /// Collapse the raw fields into a closed source description.
    pub fn source(&self) -> Result<TagMapSource<'_>> {
        match self.kind {
            SourceKind::FromValue => Ok(TagMapSource::Literal(&self.tags)),
            SourceKind::FromCompositeFieldPath => Ok(TagMapSource::CompositeFieldPath(
                require_path(&self.from_field_path, "addTags", self.kind)?,
            )),
            SourceKind::FromEnvironmentFieldPath => Ok(TagMapSource::EnvironmentFieldPath(
                require_path(&self.from_field_path, "addTags", self.kind)?,
            )),
        }
    }
}

impl IgnoreRule {
    pub fn source(&self) -> Result<KeyListSource<'_>> {
        match self.kind {
            SourceKind::FromValue => Ok(KeyListSource::Literal(&self.keys)),
            SourceKind::FromCompositeFieldPath => Ok(KeyListSource::CompositeFieldPath(
                require_path(&self.from_field_path, "ignoreTags", self.kind)?,
            )),
            SourceKind::FromEnvironmentFieldPath => Ok(KeyListSource::EnvironmentFieldPath(
                require_path(&self.from_field_path, "ignoreTags", self.kind)?,
            )),
        }
    }
}

impl RemoveRule {
    pub fn source(&self) -> Result<KeyListSource<'_>> {
        match self.kind {
            SourceKind::FromValue => Ok(KeyListSource::Literal(&self.keys)),
            SourceKind::FromCompositeFieldPath => Ok(KeyListSource::CompositeFieldPath(
                require_path(&self.from_field_path, "removeTags", self.kind)?,
            )),
            SourceKind::FromEnvironmentFieldPath => Ok(KeyListSource::EnvironmentFieldPath(
                require_path(&self.from_field_path, "removeTags", self.kind)?,
            )),
        }
    }
}

impl RuleSet {
    /// Validate the whole configuration up front so a malformed rule aborts
    /// the invocation before any resource is mutated.
    pub fn validate(&self) -> Result<()> {
        for rule in &self.add_tags {
            rule.source()?;
        }
        for rule in &self.ignore_tags {
            rule.source()?;
        }
        for rule in &self.remove_tags {
            rule.source()?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.add_tags.is_empty() && self.ignore_tags.is_empty() && self.remove_tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn add_rule_defaults_to_value_source_and_replace() {
        let rule: AddRule = serde_json::from_value(serde_json::json!({
            "tags": {"a": "1"}
        }))
        .unwrap();
        assert_eq!(rule.kind, SourceKind::FromValue);
        assert_eq!(rule.policy, TagPolicy::Replace);
        assert!(matches!(rule.source().unwrap(), TagMapSource::Literal(_)));
    }

    #[test]
    fn add_rule_parses_wire_format() {
        let rule: AddRule = serde_json::from_value(serde_json::json!({
            "type": "FromCompositeFieldPath",
            "fromFieldPath": "spec.parameters.tags",
            "policy": "Retain"
        }))
        .unwrap();
        assert_eq!(
            rule.source().unwrap(),
            TagMapSource::CompositeFieldPath("spec.parameters.tags")
        );
        assert_eq!(rule.policy, TagPolicy::Retain);
    }

    #[test]
    fn field_path_kind_without_path_is_invalid() {
        let rule = AddRule {
            kind: SourceKind::FromCompositeFieldPath,
            ..AddRule::default()
        };
        assert!(rule.source().is_err());
    }

    #[test]
    fn validate_catches_bad_remove_rule() {
        let rules = RuleSet {
            remove_tags: vec![RemoveRule {
                kind: SourceKind::FromEnvironmentFieldPath,
                ..RemoveRule::default()
            }],
            ..RuleSet::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn rule_set_parses_all_families() {
        let rules: RuleSet = serde_json::from_value(serde_json::json!({
            "addTags": [{"tags": {"a": "1"}}],
            "ignoreTags": [{"keys": ["b"], "policy": "Retain"}],
            "removeTags": [{"keys": ["c"]}]
        }))
        .unwrap();
        assert_eq!(rules.add_tags.len(), 1);
        assert_eq!(rules.ignore_tags.len(), 1);
        assert_eq!(rules.remove_tags.len(), 1);
        assert!(rules.validate().is_ok());
        assert!(!rules.is_empty());
    }
}
