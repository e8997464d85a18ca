//! Tag merge and removal appliers.
//!
//! The merge algebra is fixed and order-sensitive: Retain entries fill only
//! missing keys, then Replace entries overwrite unconditionally. A key
//! present in both buckets is therefore governed by Replace.

use serde_json::Value;

use super::DESIRED_TAGS_PATH;
use crate::document::{FieldError, ResourceDocument};
use crate::rules::TagSet;

/// Tags accumulated across all rules of one kind for one resource, split by
/// conflict policy. Created empty per resource per invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagUpdater {
    /// Overwrite the desired value when the key matches.
    pub replace: TagSet,
    /// Keep the desired value when the key matches.
    pub retain: TagSet,
}

impl TagUpdater {
    pub fn is_empty(&self) -> bool {
        self.replace.is_empty() && self.retain.is_empty()
    }
}

/// Merge an updater onto the resource's desired tag map.
///
/// An absent tag field counts as an empty map; a tag field of an
/// incompatible type is a per-resource failure. An empty updater is a no-op
/// and never fabricates the tag field.
pub fn merge_tags(desired: &mut ResourceDocument, updater: &TagUpdater) -> Result<(), FieldError> {
    if updater.is_empty() {
        return Ok(());
    }

    let mut tags = match desired.tags_at(DESIRED_TAGS_PATH) {
        Ok(tags) => tags,
        Err(FieldError::NotFound(_)) => TagSet::new(),
        Err(err) => return Err(err),
    };

    for (key, value) in &updater.retain {
        tags.entry(key.clone()).or_insert_with(|| value.clone());
    }
    for (key, value) in &updater.replace {
        tags.insert(key.clone(), value.clone());
    }

    write_tags(desired, &tags)
}

/// Delete the listed keys from the resource's desired tag map. Absent keys
/// and a wholly absent tag field are no-ops.
pub fn remove_tags(desired: &mut ResourceDocument, keys: &[String]) -> Result<(), FieldError> {
    if keys.is_empty() {
        return Ok(());
    }

    let mut tags = match desired.tags_at(DESIRED_TAGS_PATH) {
        Ok(tags) => tags,
        Err(FieldError::NotFound(_)) => return Ok(()),
        Err(err) => return Err(err),
    };

    let mut changed = false;
    for key in keys {
        changed |= tags.remove(key.as_str()).is_some();
    }
    if !changed {
        return Ok(());
    }

    write_tags(desired, &tags)
}

fn write_tags(desired: &mut ResourceDocument, tags: &TagSet) -> Result<(), FieldError> {
    let map: serde_json::Map<String, Value> = tags
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect();
    desired.set(DESIRED_TAGS_PATH, Value::Object(map))
}
