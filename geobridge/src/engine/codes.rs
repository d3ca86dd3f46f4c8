//! Native error codes.
//!
//! These are the `CPLE_*` numbers the native engine attaches to its errors.
//! Only the Version Shim interprets them.

pub const NONE: i32 = 0;
pub const APP_DEFINED: i32 = 1;
pub const OUT_OF_MEMORY: i32 = 2;
pub const FILE_IO: i32 = 3;
pub const OPEN_FAILED: i32 = 4;
pub const ILLEGAL_ARG: i32 = 5;
pub const NOT_SUPPORTED: i32 = 6;
pub const ASSERTION_FAILED: i32 = 7;
pub const NO_WRITE_ACCESS: i32 = 8;
pub const USER_INTERRUPT: i32 = 9;
pub const OBJECT_NULL: i32 = 10;
pub const HTTP_RESPONSE: i32 = 11;
pub const AWS_BUCKET_NOT_FOUND: i32 = 12;
pub const AWS_OBJECT_NOT_FOUND: i32 = 13;
pub const AWS_ACCESS_DENIED: i32 = 14;
pub const AWS_INVALID_CREDENTIALS: i32 = 15;
pub const AWS_SIGNATURE_DOES_NOT_MATCH: i32 = 16;

/// Returns the symbolic name of a native error code, for diagnostics.
pub fn name(code: i32) -> &'static str {
    match code {
        NONE => "None",
        APP_DEFINED => "AppDefined",
        OUT_OF_MEMORY => "OutOfMemory",
        FILE_IO => "FileIO",
        OPEN_FAILED => "OpenFailed",
        ILLEGAL_ARG => "IllegalArg",
        NOT_SUPPORTED => "NotSupported",
        ASSERTION_FAILED => "AssertionFailed",
        NO_WRITE_ACCESS => "NoWriteAccess",
        USER_INTERRUPT => "UserInterrupt",
        OBJECT_NULL => "ObjectNull",
        HTTP_RESPONSE => "HttpResponse",
        AWS_BUCKET_NOT_FOUND => "AWSBucketNotFound",
        AWS_OBJECT_NOT_FOUND => "AWSObjectNotFound",
        AWS_ACCESS_DENIED => "AWSAccessDenied",
        AWS_INVALID_CREDENTIALS => "AWSInvalidCredentials",
        AWS_SIGNATURE_DOES_NOT_MATCH => "AWSSignatureDoesNotMatch",
        _ => "Unknown",
    }
}
