//! A stateless policy engine that manages tags on composed resource
//! documents.
//!
//! Invoked once per pipeline cycle with a snapshot of observed and desired
//! resources plus a rule set, it resolves tag values from literal,
//! composite-field and environment-field sources, merges them under a
//! Replace/Retain conflict policy, carries over selected observed tags,
//! removes listed keys, and gates everything behind a per-kind eligibility
//! table and a per-resource opt-out flag.

pub mod document;
pub mod engine;
pub mod error;
pub mod filter;
pub mod rules;

pub use error::{Result, TagManagerError};
