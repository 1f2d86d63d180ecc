//! Error types and status codes for the Archipelago crates.
//!
//! Every context entry point and every host operation reports a signed status
//! code: `0` is success, negative codes are the error kinds below, positive
//! codes are interface-defined warnings. [`ArchiError`] is the Rust carrier
//! for every non-zero status.

use thiserror::Error;

/// Offset of application exit codes derived from negative status codes.
pub const EXIT_CODE_BASE: i32 = 64;

/// First status code reserved for interface-defined errors.
pub const USER_CODE_BASE: i32 = -16;

/// Errors reported by the Archipelago subsystems.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchiError {
    /// Unexpected internal failure. Must be rare and always logged.
    #[error("internal failure: {reason}")]
    Failure { reason: String },

    /// A caller violated a precondition (null where not allowed,
    /// out-of-range index, duplicate key).
    #[error("interface misuse: {reason}")]
    Misuse { reason: String },

    /// A named parameter or slot value is present but invalid.
    #[error("invalid value of `{name}`: {reason}")]
    Value { name: String, reason: String },

    /// A named parameter, slot or registry key is not recognised.
    #[error("unknown key `{key}`")]
    Key { key: String },

    /// A required entry point or capability of an interface is absent.
    #[error("interface `{interface}` does not provide `{capability}`")]
    Interface {
        interface: String,
        capability: String,
    },

    /// An OS-level resource could not be obtained.
    #[error("resource unavailable: {resource}")]
    Resource { resource: String },

    /// Memory allocation failed.
    #[error("out of memory: {reason}")]
    NoMemory { reason: String },

    /// External data is structurally invalid.
    #[error("invalid data format: {reason}")]
    Format { reason: String },

    /// Interface-defined status code (warnings are positive, user errors
    /// are `<= USER_CODE_BASE`).
    #[error("status code {code}")]
    User { code: i32 },
}

/// Result type for Archipelago operations.
pub type ArchiResult<T> = std::result::Result<T, ArchiError>;

impl ArchiError {
    /// Creates a new internal failure error.
    pub fn failure<S: Into<String>>(reason: S) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    /// Creates a new misuse error.
    pub fn misuse<S: Into<String>>(reason: S) -> Self {
        Self::Misuse {
            reason: reason.into(),
        }
    }

    /// Creates a new invalid-value error for a named parameter or slot.
    pub fn value<S: Into<String>>(name: S, reason: S) -> Self {
        Self::Value {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new unknown-key error.
    pub fn key<S: Into<String>>(key: S) -> Self {
        Self::Key { key: key.into() }
    }

    /// Creates a new missing-capability error.
    pub fn interface<S: Into<String>>(interface: S, capability: S) -> Self {
        Self::Interface {
            interface: interface.into(),
            capability: capability.into(),
        }
    }

    /// Creates a new unavailable-resource error.
    pub fn resource<S: Into<String>>(resource: S) -> Self {
        Self::Resource {
            resource: resource.into(),
        }
    }

    /// Creates a new allocation error.
    pub fn no_memory<S: Into<String>>(reason: S) -> Self {
        Self::NoMemory {
            reason: reason.into(),
        }
    }

    /// Creates a new format error.
    pub fn format<S: Into<String>>(reason: S) -> Self {
        Self::Format {
            reason: reason.into(),
        }
    }

    /// Wraps an interface-defined status code. `code` must be non-zero;
    /// zero would mean success and is coerced to an internal failure.
    pub fn user(code: i32) -> Self {
        if code == 0 {
            Self::failure("zero status wrapped as an error")
        } else {
            Self::User { code }
        }
    }

    /// Returns the signed status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Failure { .. } => -1,
            Self::Misuse { .. } => -2,
            Self::Value { .. } => -3,
            Self::Key { .. } => -4,
            Self::Interface { .. } => -5,
            Self::Resource { .. } => -6,
            Self::NoMemory { .. } => -7,
            Self::Format { .. } => -8,
            Self::User { code } => *code,
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        exit_code(self.code())
    }

    /// Returns the error kind name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Failure { .. } => "failure",
            Self::Misuse { .. } => "misuse",
            Self::Value { .. } => "value",
            Self::Key { .. } => "key",
            Self::Interface { .. } => "interface",
            Self::Resource { .. } => "resource",
            Self::NoMemory { .. } => "no-memory",
            Self::Format { .. } => "format",
            Self::User { code } if *code > 0 => "warning",
            Self::User { .. } => "user",
        }
    }
}

/// Maps a signed status code to a process exit code.
///
/// Non-negative statuses map to themselves, negative statuses to
/// `EXIT_CODE_BASE - code` (so status `-6` becomes exit code `70`).
pub fn exit_code(status: i32) -> i32 {
    if status >= 0 {
        status
    } else {
        EXIT_CODE_BASE - status
    }
}
