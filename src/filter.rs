//! Eligibility filtering - decides whether a resource may be touched at all.
//!
//! Two independent gates run before any mutation: a per-resource opt-out
//! flag (annotation, with a legacy label fallback) and a static group/kind
//! eligibility table built offline by the schema crawler. Both gates fail
//! closed: an unknown kind is never mutated.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::document::ResourceDocument;
use crate::error::Result;

/// Set to `"true"` on a resource to opt it out of tag management.
pub const IGNORE_RESOURCE_ANNOTATION: &str = "tag-manager.fn.crossplane.io/ignore-resource";

/// Legacy opt-out label, consulted only when the annotation is absent.
pub const IGNORE_RESOURCE_LABEL: &str = "tag-manager.fn.crossplane.io/ignore-resource";

/// Static map from `"{group}/{kind}"` to whether that kind supports tags.
/// Generated offline, loaded once per process, never mutated at runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EligibilityTable(HashMap<String, bool>);

impl EligibilityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the generated table artifact (a YAML mapping of `group/kind` to
    /// bool) from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let table: Self = serde_yaml_ng::from_str(&content)?;
        debug!(
            entries = table.0.len(),
            path = %path.as_ref().display(),
            "loaded eligibility table"
        );
        Ok(table)
    }

    pub fn insert(&mut self, group_kind: impl Into<String>, supported: bool) {
        self.0.insert(group_kind.into(), supported);
    }

    /// Whether `{group}/{kind}` supports tags. Absent entries are not
    /// eligible.
    pub fn supports(&self, group: &str, kind: &str) -> bool {
        self.0
            .get(&format!("{group}/{kind}"))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, bool)> for EligibilityTable {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The per-resource opt-out flag. The annotation is authoritative when
/// present, regardless of value; otherwise the legacy label is consulted.
/// A resource without a kind is ignored outright.
pub fn is_ignored(resource: &ResourceDocument) -> bool {
    if resource.kind().is_none() {
        return true;
    }
    if let Some(value) = resource.annotation(IGNORE_RESOURCE_ANNOTATION) {
        return value.eq_ignore_ascii_case("true");
    }
    if let Some(value) = resource.label(IGNORE_RESOURCE_LABEL) {
        return value.eq_ignore_ascii_case("true");
    }
    false
}

/// The capability gate: true only when the resource has a well-formed
/// group/kind that the table marks as supporting tags.
pub fn supports_tags(resource: &ResourceDocument, table: &EligibilityTable) -> bool {
    match (resource.group(), resource.kind()) {
        (Some(group), Some(kind)) => table.supports(group, kind),
        _ => false,
    }
}
