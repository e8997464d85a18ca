//! Source resolution and policy classification.
//!
//! Field resolution is a pure read and never aborts the invocation: a
//! missing path, wrong type, or absent document degrades to an empty
//! contribution from that rule, logged at debug.

use tracing::debug;

use super::merge::TagUpdater;
use super::OBSERVED_TAGS_PATH;
use crate::document::ResourceDocument;
use crate::error::Result;
use crate::rules::{
    AddRule, IgnoreRule, KeyListSource, RemoveRule, TagMapSource, TagPolicy, TagSet,
};

/// The read-only documents a rule's field path may address.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSet<'a> {
    /// The primary resource under composition.
    pub composite: &'a ResourceDocument,
    /// Optional supplemental environment document.
    pub environment: Option<&'a ResourceDocument>,
}

fn resolve_tag_map(source: TagMapSource<'_>, docs: DocumentSet<'_>) -> TagSet {
    match source {
        TagMapSource::Literal(tags) => tags.clone(),
        TagMapSource::CompositeFieldPath(path) => match docs.composite.tags_at(path) {
            Ok(tags) => tags,
            Err(err) => {
                debug!(path, error = %err, "unable to read tags from composite field");
                TagSet::new()
            }
        },
        TagMapSource::EnvironmentFieldPath(path) => {
            let Some(environment) = docs.environment else {
                debug!(path, "no environment document in request, skipping rule");
                return TagSet::new();
            };
            match environment.tags_at(path) {
                Ok(tags) => tags,
                Err(err) => {
                    debug!(path, error = %err, "unable to read tags from environment field");
                    TagSet::new()
                }
            }
        }
    }
}

fn resolve_key_list(source: KeyListSource<'_>, docs: DocumentSet<'_>) -> Vec<String> {
    match source {
        KeyListSource::Literal(keys) => keys.to_vec(),
        KeyListSource::CompositeFieldPath(path) => match docs.composite.string_list_at(path) {
            Ok(keys) => keys,
            Err(err) => {
                debug!(path, error = %err, "unable to read keys from composite field");
                Vec::new()
            }
        },
        KeyListSource::EnvironmentFieldPath(path) => {
            let Some(environment) = docs.environment else {
                debug!(path, "no environment document in request, skipping rule");
                return Vec::new();
            };
            match environment.string_list_at(path) {
                Ok(keys) => keys,
                Err(err) => {
                    debug!(path, error = %err, "unable to read keys from environment field");
                    Vec::new()
                }
            }
        }
    }
}

/// Fold the add rules into one updater, classifying each rule's resolved
/// tags by policy. Later rules win within a bucket.
pub fn resolve_add_tags(rules: &[AddRule], docs: DocumentSet<'_>) -> Result<TagUpdater> {
    let mut updater = TagUpdater::default();
    for rule in rules {
        let tags = resolve_tag_map(rule.source()?, docs);
        match rule.policy {
            TagPolicy::Retain => updater.retain.extend(tags),
            TagPolicy::Replace => updater.replace.extend(tags),
        }
    }
    Ok(updater)
}

/// Resolve tags to carry over unchanged from the resource's observed state.
///
/// Returns `None` when there is no observed counterpart (a newly created
/// resource has nothing to ignore yet) or its tag map is unreadable. Each
/// rule's candidate keys are intersected with the observed tags and the
/// matches classified by policy.
pub fn resolve_ignore_tags(
    rules: &[IgnoreRule],
    docs: DocumentSet<'_>,
    observed: Option<&ResourceDocument>,
) -> Result<Option<TagUpdater>> {
    let Some(observed) = observed else {
        return Ok(None);
    };

    let observed_tags = match observed.tags_at(OBSERVED_TAGS_PATH) {
        Ok(tags) => tags,
        Err(err) => {
            debug!(
                name = observed.name().unwrap_or_default(),
                error = %err,
                "unable to read tags from observed resource"
            );
            return Ok(None);
        }
    };

    let mut updater = TagUpdater::default();
    for rule in rules {
        let mut matched = TagSet::new();
        for key in resolve_key_list(rule.source()?, docs) {
            if let Some(value) = observed_tags.get(&key) {
                matched.insert(key, value.clone());
            }
        }
        match rule.policy {
            TagPolicy::Retain => updater.retain.extend(matched),
            TagPolicy::Replace => updater.replace.extend(matched),
        }
    }
    Ok(Some(updater))
}

/// Resolve the flat key list to remove, concatenated in rule order.
/// Duplicates are permitted; removal is idempotent anyway.
pub fn resolve_remove_tags(rules: &[RemoveRule], docs: DocumentSet<'_>) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    for rule in rules {
        keys.extend(resolve_key_list(rule.source()?, docs));
    }
    Ok(keys)
}
