//! The tag management engine - per-invocation orchestration.
//!
//! One invocation takes a snapshot of observed and desired resource
//! documents plus a rule set and returns the mutated desired set with an
//! overall status. For each desired resource that passes the eligibility
//! filter the pipeline runs add-merge, ignore-merge (against the observed
//! counterpart), then removal, in that fixed order. The computation is
//! idempotent and keeps no state across invocations.

pub mod merge;
pub mod resolve;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

use crate::document::ResourceDocument;
use crate::error::Result;
use crate::filter::{self, EligibilityTable};
use crate::rules::RuleSet;

pub use merge::TagUpdater;
pub use resolve::DocumentSet;

/// Where the desired tag map lives on a composed resource.
pub const DESIRED_TAGS_PATH: &str = "spec.forProvider.tags";

/// Where the last-applied tag map lives on an observed resource.
pub const OBSERVED_TAGS_PATH: &str = "status.atProvider.tags";

/// One invocation's inputs: the rule configuration and the resource
/// snapshot handed over by the hosting pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub rules: RuleSet,

    /// The primary resource under composition, read-only.
    pub composite: ResourceDocument,

    /// Optional supplemental environment document, read-only.
    #[serde(default)]
    pub environment: Option<ResourceDocument>,

    /// Last-applied state per resource name, read-only.
    #[serde(default)]
    pub observed: BTreeMap<String, ResourceDocument>,

    /// About-to-be-applied state per resource name; the mutation target.
    #[serde(default)]
    pub desired: BTreeMap<String, ResourceDocument>,
}

impl Request {
    /// Parse a request snapshot from YAML (JSON is a subset).
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }
}

/// The overall status of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "severity")]
pub enum Outcome {
    /// The invocation completed; the message summarizes what was done,
    /// even when zero resources were eligible.
    Normal { message: String },

    /// A top-level input was malformed; no resource was mutated.
    Fatal { message: String },
}

impl Outcome {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Outcome::Fatal { .. })
    }
}

/// The mutated desired set plus the invocation status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub outcome: Outcome,
    pub desired: BTreeMap<String, ResourceDocument>,
}

/// The engine itself: stateless apart from the injected read-only
/// eligibility table.
pub struct Engine {
    table: EligibilityTable,
}

impl Engine {
    pub fn new(table: EligibilityTable) -> Self {
        Self { table }
    }

    /// Run one invocation over a snapshot.
    ///
    /// Malformed rule configuration is fatal and leaves the desired set
    /// untouched. Per-resource failures (an existing tag field of an
    /// incompatible type) stop that resource at the failure point and are
    /// reported in the summary; other resources continue.
    pub fn run(&self, request: Request) -> Response {
        let Request {
            rules,
            composite,
            environment,
            observed,
            mut desired,
        } = request;

        if let Err(err) = rules.validate() {
            warn!(error = %err, "aborting invocation, no resources mutated");
            return Response {
                outcome: Outcome::Fatal {
                    message: err.to_string(),
                },
                desired,
            };
        }

        let docs = DocumentSet {
            composite: &composite,
            environment: environment.as_ref(),
        };

        let total = desired.len();
        let mut processed = 0usize;
        let mut skipped = 0usize;
        let mut failed: Vec<String> = Vec::new();

        for (name, resource) in desired.iter_mut() {
            if filter::is_ignored(resource) {
                debug!(resource = name.as_str(), "resource opted out of tag management");
                skipped += 1;
                continue;
            }
            if !filter::supports_tags(resource, &self.table) {
                trace!(resource = name.as_str(), "resource kind does not support tags");
                skipped += 1;
                continue;
            }

            match Self::process_resource(&rules, docs, observed.get(name.as_str()), resource) {
                Ok(()) => processed += 1,
                Err(err) => {
                    warn!(resource = name.as_str(), error = %err, "tag mutation failed");
                    failed.push(name.clone());
                }
            }
        }

        let mut message =
            format!("processed tags on {processed} of {total} desired resources ({skipped} skipped)");
        if !failed.is_empty() {
            message.push_str(&format!(", failed: {}", failed.join(", ")));
        }
        info!(processed, skipped, failures = failed.len(), "invocation complete");

        Response {
            outcome: Outcome::Normal { message },
            desired,
        }
    }

    fn process_resource(
        rules: &RuleSet,
        docs: DocumentSet<'_>,
        observed: Option<&ResourceDocument>,
        resource: &mut ResourceDocument,
    ) -> Result<()> {
        let add = resolve::resolve_add_tags(&rules.add_tags, docs)?;
        merge::merge_tags(resource, &add)?;

        // Ignore-merge runs after add-merge with the same two-pass algebra,
        // so an ignore Retain entry protects only keys the add rules left
        // alone.
        if let Some(ignore) = resolve::resolve_ignore_tags(&rules.ignore_tags, docs, observed)? {
            merge::merge_tags(resource, &ignore)?;
        }

        let keys = resolve::resolve_remove_tags(&rules.remove_tags, docs)?;
        merge::remove_tags(resource, &keys)?;
        Ok(())
    }
}
