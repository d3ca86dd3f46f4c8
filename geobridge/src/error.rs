//! Error records shared by the blocking and non-blocking call paths.
//!
//! Every failure that reaches user code is an [`ErrorRecord`]. A blocking call
//! returns it as `Err`, an `_async` call settles its future with the very same
//! value, so callers can match on [`ErrorKind`] without caring which call style
//! produced it.

use std::fmt;
use thiserror::Error;

use crate::registry::ResourceKind;

/// Stable classification of a failure.
///
/// The set is closed: new engine versions are accommodated by adding shim
/// rules, never by adding kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad call parameters.
    InvalidArgument,
    /// Access after close or reclamation, or after an ancestor closed.
    ResourceClosed,
    /// Missing file, path or driver.
    NotFound,
    /// The engine cannot recognize or open the input.
    UnsupportedFormat,
    /// Native error code not otherwise classified.
    NativeFailure,
    /// Interrupted by a cancellation signal below the core.
    Aborted,
}

impl ErrorKind {
    /// Returns the kind name as used in messages and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::ResourceClosed => "ResourceClosed",
            Self::NotFound => "NotFound",
            Self::UnsupportedFormat => "UnsupportedFormat",
            Self::NativeFailure => "NativeFailure",
            Self::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified failure.
///
/// Carries the stable kind, the human-readable message and, when the failure
/// came from the native engine, the raw native error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ErrorRecord {
    kind: ErrorKind,
    message: String,
    native_code: Option<i32>,
}

impl ErrorRecord {
    /// Creates a record without a native code.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            native_code: None,
        }
    }

    /// Attaches the originating native error code.
    pub fn with_native_code(mut self, code: i32) -> Self {
        self.native_code = Some(code);
        self
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, message)
    }

    /// The resource itself has been closed or reclaimed.
    pub fn resource_closed(kind: ResourceKind) -> Self {
        Self::new(
            ErrorKind::ResourceClosed,
            format!("{kind} object has already been closed"),
        )
    }

    /// An ancestor of the resource has been closed.
    pub fn ancestor_closed(kind: ResourceKind, ancestor: ResourceKind) -> Self {
        Self::new(
            ErrorKind::ResourceClosed,
            format!("{kind} is no longer valid: its parent {ancestor} has been closed"),
        )
    }

    /// The classified kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The native error code, if the failure originated in the engine.
    pub fn native_code(&self) -> Option<i32> {
        self.native_code
    }

    /// Returns true if this record reports access to a closed resource.
    pub fn is_closed(&self) -> bool {
        self.kind == ErrorKind::ResourceClosed
    }
}
