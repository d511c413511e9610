//! Service handles: the capability through which remote operations run.
//!
//! A [`ServiceHandle`] binds exactly one [`Caller`] to one remote endpoint.
//! The session controller owns the current handle and replaces it whenever
//! the bound identity changes; a generation stamp lets late-arriving results
//! from a replaced handle be recognized and discarded.
//!
//! Construction is pure local setup. The only failure mode is malformed
//! endpoint configuration, which is fatal at startup rather than retryable.

use std::sync::Arc;

use murmur_proto::{ProfileLookup, Tweet, TweetId, UserId, UserProfile};
use thiserror::Error;

use crate::{
    identity::Caller,
    service::{BackendService, ServiceError},
};

/// Errors from endpoint configuration and handle construction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The endpoint address could not be parsed.
    #[error("malformed endpoint {address:?}: {reason}")]
    MalformedEndpoint {
        /// The offending address string.
        address: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The connector could not set up a service for the endpoint.
    #[error("connector failed for {address}: {reason}")]
    ConnectorFailed {
        /// The endpoint address.
        address: String,
        /// Description of the failure.
        reason: String,
    },
}

/// A parsed remote endpoint address (`scheme://host:port`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    scheme: String,
    host: String,
    port: u16,
}

impl Endpoint {
    /// Parse an endpoint address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MalformedEndpoint`] when the scheme, host, or
    /// port is missing or invalid.
    pub fn parse(address: &str) -> Result<Self, ConfigError> {
        let malformed = |reason: &str| ConfigError::MalformedEndpoint {
            address: address.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = address.split_once("://").ok_or_else(|| malformed("missing scheme"))?;

        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
            return Err(malformed("invalid scheme"));
        }

        let (host, port) = rest.rsplit_once(':').ok_or_else(|| malformed("missing port"))?;

        if host.is_empty() {
            return Err(malformed("empty host"));
        }

        let port: u16 = port.parse().map_err(|_| malformed("invalid port"))?;

        Ok(Self { scheme: scheme.to_string(), host: host.to_string(), port })
    }

    /// The URL scheme.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// The host name.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Produces a [`BackendService`] for an endpoint.
///
/// Implementations perform local setup only; they must not do network I/O.
/// The harness supplies an in-process loopback connector, a production
/// build supplies a real transport.
pub trait Connector: Send + Sync {
    /// Set up a service bound to `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ConnectorFailed`] when local setup is
    /// impossible (e.g. an unsupported scheme).
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn BackendService>, ConfigError>;
}

/// Constructs service handles bound to one fixed endpoint.
pub struct HandleFactory {
    endpoint: Endpoint,
    connector: Arc<dyn Connector>,
}

impl HandleFactory {
    /// Parse the endpoint address and build a factory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the address is malformed. Callers treat
    /// this as a fatal startup error.
    pub fn new(address: &str, connector: Arc<dyn Connector>) -> Result<Self, ConfigError> {
        let endpoint = Endpoint::parse(address)?;
        tracing::debug!(endpoint = %endpoint, "handle factory configured");
        Ok(Self { endpoint, connector })
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Bind a handle for `caller`, stamped with `generation`.
    pub fn bind(&self, caller: Caller, generation: u64) -> Result<ServiceHandle, ConfigError> {
        let service = self.connector.connect(&self.endpoint)?;
        Ok(ServiceHandle { caller, generation, service })
    }
}

/// A capability bound to exactly one caller and one endpoint.
///
/// Read-only after construction and cheap to clone; concurrent invocations
/// are safe. Every operation delegates to the underlying service with the
/// bound caller injected.
#[derive(Clone)]
pub struct ServiceHandle {
    caller: Caller,
    generation: u64,
    service: Arc<dyn BackendService>,
}

impl ServiceHandle {
    /// The caller this handle is bound to.
    pub fn caller(&self) -> &Caller {
        &self.caller
    }

    /// The session generation this handle was bound under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Create a tweet.
    pub async fn create_tweet(&self, content: &str) -> Result<Tweet, ServiceError> {
        self.service.create_tweet(&self.caller, content).await
    }

    /// Like a tweet.
    pub async fn like_tweet(&self, id: TweetId) -> Result<Tweet, ServiceError> {
        self.service.like_tweet(&self.caller, id).await
    }

    /// Retweet a tweet.
    pub async fn retweet(&self, id: TweetId) -> Result<Tweet, ServiceError> {
        self.service.retweet(&self.caller, id).await
    }

    /// Follow a user.
    pub async fn follow_user(&self, target: &UserId) -> Result<(), ServiceError> {
        self.service.follow_user(&self.caller, target).await
    }

    /// Read the full tweet collection.
    pub async fn get_all_tweets(&self) -> Result<Vec<Tweet>, ServiceError> {
        self.service.get_all_tweets(&self.caller).await
    }

    /// Read the followee feed for `user`.
    pub async fn get_user_feed(&self, user: &UserId) -> Result<Vec<Tweet>, ServiceError> {
        self.service.get_user_feed(&self.caller, user).await
    }

    /// Read a user's profile.
    pub async fn get_user_profile(&self, user: &UserId) -> Result<ProfileLookup, ServiceError> {
        self.service.get_user_profile(&self.caller, user).await
    }

    /// Create or update the caller's profile.
    pub async fn update_user_profile(
        &self,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ServiceError> {
        self.service.update_user_profile(&self.caller, username, bio).await
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("caller", &self.caller)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
