//! Outcome classification: the Result Bridge and the Version Shim.

mod bridge;
mod shim;

pub use bridge::{classify, Failure};
pub use shim::{clean_message, default_rules, ShimRule, VersionRange, VersionShim};
