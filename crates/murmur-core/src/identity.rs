//! Authenticated identity and the external identity provider gateway.
//!
//! The identity provider is an external collaborator: it runs the
//! interactive login redirect and issues a signed principal. The client
//! never implements cryptographic identity itself; it only holds the opaque
//! [`Identity`] the gateway hands back.

use async_trait::async_trait;
use murmur_proto::UserId;
use thiserror::Error;

/// An authenticated principal obtained from the identity provider.
///
/// Immutable for the lifetime of a session; absent when unauthenticated.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    principal: String,
}

impl Identity {
    /// Wrap a principal issued by the gateway.
    pub fn new(principal: impl Into<String>) -> Self {
        Self { principal: principal.into() }
    }

    /// The principal text.
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// The user ID this identity maps to in the data model.
    pub fn user_id(&self) -> UserId {
        UserId::new(self.principal.clone())
    }
}

// Principals are not secrets, but they are stable per-user identifiers;
// keep them out of logs emitted at default levels.
impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("principal", &format!("<{} chars>", self.principal.len()))
            .finish()
    }
}

/// The caller a service handle is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// No identity; may only perform public reads.
    Anonymous,
    /// An authenticated principal.
    Authenticated(Identity),
}

impl Caller {
    /// The identity, if authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    /// The user ID for the wire envelope; `None` when anonymous.
    pub fn user_id(&self) -> Option<UserId> {
        self.identity().map(Identity::user_id)
    }
}

/// Errors from the identity provider gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The interactive login did not complete (provider error or user
    /// cancellation). Not fatal; the session returns to unauthenticated.
    #[error("login failed: {reason}")]
    LoginFailed {
        /// Provider-supplied description.
        reason: String,
    },

    /// The gateway itself could not be reached.
    #[error("gateway unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },
}

/// External identity provider.
///
/// `login` models the interactive redirect as a suspension point: the call
/// suspends until the redirect completes and resolves with the fresh
/// identity or a failure. There is no callback registration.
#[async_trait]
pub trait IdentityGateway: Send + Sync {
    /// The identity of an already-authenticated session, if one exists.
    ///
    /// Covers both the "is authenticated" query and the "current identity"
    /// query: `Ok(None)` means not authenticated.
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError>;

    /// Run the interactive login flow to completion.
    async fn login(&self) -> Result<Identity, GatewayError>;

    /// End the provider-side session.
    async fn logout(&self) -> Result<(), GatewayError>;
}
