//! Stable error codes shared by the crate's error enums.

/// Maps an error to a stable `E_*` code hosts can translate into a
/// user-visible notification.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}
