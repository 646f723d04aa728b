//! Error Kind - Classification of errors
//!
//! Defines the [`ErrorKind`] enum shared by every crate in the workspace.

use serde::Serialize;

/// Error classification
///
/// Kinds describe *who* has to act on an error: the caller (bad input,
/// missing credentials), the environment (storage, upstream service), or
/// nobody but the developers (internal).
///
/// ## Notes
/// * `non_exhaustive` - variants may be added later
///
/// ## Examples
/// ```rust
/// use kernel::error::kind::ErrorKind;
///
/// let kind = ErrorKind::StorageUnavailable;
/// assert_eq!(kind.as_str(), "Storage Unavailable");
/// assert!(kind.is_transient());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorKind {
    /// Input failed validation
    InvalidInput,
    /// Credentials missing or rejected by a remote service
    Unauthorized,
    /// Referenced record does not exist
    NotFound,
    /// Caller exceeded a usage limit
    RateLimited,
    /// A storage medium is disabled, full, or unreadable
    StorageUnavailable,
    /// A remote service answered with an error
    Upstream,
    /// A remote service did not answer in time
    Timeout,
    /// Bug or broken invariant
    Internal,
}

impl ErrorKind {
    /// Human readable label
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "Invalid Input",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::NotFound => "Not Found",
            ErrorKind::RateLimited => "Rate Limited",
            ErrorKind::StorageUnavailable => "Storage Unavailable",
            ErrorKind::Upstream => "Upstream Error",
            ErrorKind::Timeout => "Timeout",
            ErrorKind::Internal => "Internal Error",
        }
    }

    /// Whether retrying the same operation later may succeed
    #[inline]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            ErrorKind::StorageUnavailable | ErrorKind::Upstream | ErrorKind::Timeout
        )
    }

    /// Whether the caller has to change the request
    #[inline]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidInput
                | ErrorKind::Unauthorized
                | ErrorKind::NotFound
                | ErrorKind::RateLimited
        )
    }

    /// Classify an HTTP status returned by a remote service
    ///
    /// ## Examples
    /// ```rust
    /// use kernel::error::kind::ErrorKind;
    /// assert_eq!(ErrorKind::from_http_status(401), ErrorKind::Unauthorized);
    /// assert_eq!(ErrorKind::from_http_status(502), ErrorKind::Upstream);
    /// ```
    pub const fn from_http_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::InvalidInput,
            401 | 403 => ErrorKind::Unauthorized,
            404 => ErrorKind::NotFound,
            408 | 504 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimited,
            _ => ErrorKind::Upstream,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
