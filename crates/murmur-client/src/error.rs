//! Client error types.
//!
//! One failure type covers the whole taxonomy so the presentation layer has
//! a single reporting path: a mutation rejected locally for a missing
//! session looks the same, structurally, as a backend rejection or a
//! transport failure.

use murmur_core::{handle::ConfigError, identity::GatewayError, service::ServiceError};
use thiserror::Error;

/// Errors from session, synchronization, and mutation operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The operation requires an authenticated session. Rejected locally;
    /// no remote call was issued.
    #[error("not authenticated: cannot {operation}")]
    NotAuthenticated {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// The operation is not valid in the current session state.
    #[error("invalid transition: cannot {operation} while {state}")]
    InvalidTransition {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state it was attempted in.
        state: &'static str,
    },

    /// Tweet content failed the local pre-check. Rejected before dispatch.
    #[error("invalid content: {reason}")]
    InvalidContent {
        /// What was wrong with the content.
        reason: String,
    },

    /// The identity provider gateway reported a failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The backend rejected the call or the call could not complete.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Endpoint configuration or handle construction failed.
    ///
    /// Fatal: no remote operation can succeed until reconfigured. The
    /// presentation layer should degrade to read-only rather than crash.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Only configuration failures are fatal. Precondition violations,
    /// gateway failures, domain rejections, and transport failures are
    /// transient: prior state is retained and the operation can be retried.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::NotAuthenticated { .. }
            | Self::InvalidTransition { .. }
            | Self::InvalidContent { .. }
            | Self::Gateway(_)
            | Self::Service(_) => false,
        }
    }
}
