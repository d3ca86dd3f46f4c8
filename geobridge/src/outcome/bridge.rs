//! Result Bridge.
//!
//! The one place a raw outcome becomes a user-visible result. Both call
//! styles pass through [`classify`], so identical native failures produce
//! identical [`ErrorRecord`]s whether they are returned or settle a future.

use std::any::Any;

use super::shim::VersionShim;
use crate::engine::{EngineVersion, NativeError};
use crate::error::{ErrorKind, ErrorRecord};

/// An unclassified failure raised while executing an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// The engine reported an error code.
    Native(NativeError),
    /// The core itself rejected the call (closed handle, bad argument).
    Record(ErrorRecord),
    /// The native call unwound instead of returning.
    Panicked(String),
}

impl Failure {
    /// Builds a failure from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(message)
    }
}

impl From<NativeError> for Failure {
    fn from(err: NativeError) -> Self {
        Self::Native(err)
    }
}

impl From<ErrorRecord> for Failure {
    fn from(err: ErrorRecord) -> Self {
        Self::Record(err)
    }
}

/// Classifies a raw outcome.
///
/// Native errors go through the Version Shim. Core records pass through
/// untouched. A panic in the native layer becomes a `NativeFailure`.
pub fn classify<T>(
    outcome: Result<T, Failure>,
    shim: &VersionShim,
    version: EngineVersion,
) -> Result<T, ErrorRecord> {
    outcome.map_err(|failure| match failure {
        Failure::Native(err) => shim.normalize(err.code, &err.message, version),
        Failure::Record(record) => record,
        Failure::Panicked(message) => ErrorRecord::new(
            ErrorKind::NativeFailure,
            format!("native call aborted: {message}"),
        ),
    })
}
