//! Error types for kernel network operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. Batches of
//! independent operations collect their failures in an [`ErrorList`]
//! instead of stopping at the first one.

use std::fmt;
use std::io;
use thiserror::Error;

/// Result type alias for kernel network operations.
pub type Result<T> = std::result::Result<T, NetdraError>;

/// Errors that can occur while touching namespaces, netlink or sysctls.
#[derive(Debug, Error)]
pub enum NetdraError {
    /// Opening or entering a network namespace failed.
    #[error("network namespace {path}: {source}")]
    Namespace {
        /// Namespace path (e.g. `/var/run/netns/pod1`).
        path: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// A netlink request was rejected by the kernel or could not be sent.
    #[error("netlink {operation} failed: {source}")]
    Netlink {
        /// The operation that failed (e.g. "route add 10.0.0.0/24").
        operation: String,
        /// The kernel errno wrapped as an IO error.
        #[source]
        source: io::Error,
    },

    /// The kernel replied with something we could not decode.
    #[error("netlink protocol error during {operation}: {message}")]
    Protocol {
        /// The operation in flight.
        operation: String,
        /// Error message.
        message: String,
    },

    /// A named link does not exist in the target namespace.
    #[error("link {name} not found in namespace {namespace}")]
    LinkNotFound {
        /// Interface name.
        name: String,
        /// Namespace path.
        namespace: String,
    },

    /// Writing a sysctl failed.
    #[error("failed to set sysctl {key}: {source}")]
    Sysctl {
        /// Sysctl key relative to `/proc/sys`.
        key: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Input could not be parsed or is out of range.
    #[error("invalid {field}: {message}")]
    Invalid {
        /// The offending field (e.g. "routes[2].destination").
        field: String,
        /// Error message.
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl NetdraError {
    /// Creates a netlink error from an IO error.
    pub fn netlink(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Netlink {
            operation: operation.into(),
            source,
        }
    }

    /// Creates a protocol error.
    pub fn protocol(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Protocol {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid input error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the kernel errno carried by this error, if any.
    pub fn errno(&self) -> Option<i32> {
        match self {
            NetdraError::Netlink { source, .. }
            | NetdraError::Namespace { source, .. }
            | NetdraError::Sysctl { source, .. }
            | NetdraError::Io(source) => source.raw_os_error(),
            _ => None,
        }
    }

    /// Returns true if the kernel reported that the object already exists.
    ///
    /// Re-applying an entry that is already programmed is a success.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, NetdraError::Netlink { .. }) && self.errno() == Some(libc::EEXIST)
    }

    /// Returns true if the kernel reported that the object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            NetdraError::LinkNotFound { .. } => true,
            NetdraError::Netlink { .. } => {
                matches!(self.errno(), Some(libc::ENODEV) | Some(libc::ENOENT))
            }
            _ => false,
        }
    }
}

/// Accumulated failures of a batch of independent operations.
///
/// `Display` joins every member with a newline, so a single log line or
/// status message carries the whole batch.
#[derive(Debug, Default)]
pub struct ErrorList {
    errors: Vec<NetdraError>,
}

impl ErrorList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one failure.
    pub fn push(&mut self, error: NetdraError) {
        self.errors.push(error);
    }

    /// Returns true if nothing failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of collected failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Iterates over the collected failures in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, NetdraError> {
        self.errors.iter()
    }

    /// `Ok(())` if empty, otherwise the list itself.
    pub fn into_result(self) -> std::result::Result<(), ErrorList> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}

impl From<NetdraError> for ErrorList {
    fn from(error: NetdraError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}
