//! The typed remote-procedure surface of the micro-blogging backend.
//!
//! The backend is out of scope for this repository; everything it does is
//! reached through [`BackendService`]. Domain rejections and transport
//! failures are both ordinary [`ServiceError`] values so callers have one
//! failure path regardless of cause.

use async_trait::async_trait;
use murmur_proto::{ProfileLookup, Tweet, TweetId, UserId, UserProfile};
use thiserror::Error;

use crate::identity::Caller;

/// Errors from remote operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The backend processed the call and rejected it (domain error).
    #[error("rejected: {reason}")]
    Rejected {
        /// Backend-supplied reason.
        reason: String,
    },

    /// The call itself could not complete (network or endpoint failure).
    #[error("transport failure: {reason}")]
    Transport {
        /// Description of the failure.
        reason: String,
    },
}

impl ServiceError {
    /// Shorthand for a domain rejection.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected { reason: reason.into() }
    }

    /// Shorthand for a transport failure.
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport { reason: reason.into() }
    }
}

/// Remote operations consumed by the client.
///
/// Every method takes the caller explicitly; the backend authorizes
/// mutations against it. Reads marked public accept an anonymous caller.
#[async_trait]
pub trait BackendService: Send + Sync {
    /// Create a tweet. Requires an authenticated caller.
    async fn create_tweet(&self, caller: &Caller, content: &str) -> Result<Tweet, ServiceError>;

    /// Increment a tweet's like counter. Two likes are two increments;
    /// the backend does not deduplicate.
    async fn like_tweet(&self, caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError>;

    /// Increment a tweet's retweet counter.
    async fn retweet(&self, caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError>;

    /// Add `target` to the caller's following set (and the caller to
    /// `target`'s followers). Requires an authenticated caller.
    async fn follow_user(&self, caller: &Caller, target: &UserId) -> Result<(), ServiceError>;

    /// Read the full tweet collection, ordered by creation. Public.
    async fn get_all_tweets(&self, caller: &Caller) -> Result<Vec<Tweet>, ServiceError>;

    /// Read tweets authored by `user`'s followees, ordered by creation.
    /// Requires an authenticated caller.
    async fn get_user_feed(&self, caller: &Caller, user: &UserId)
    -> Result<Vec<Tweet>, ServiceError>;

    /// Read a user's profile. Absent profiles are a valid outcome, not an
    /// error; see [`ProfileLookup`].
    async fn get_user_profile(
        &self,
        caller: &Caller,
        user: &UserId,
    ) -> Result<ProfileLookup, ServiceError>;

    /// Create or update the caller's profile. Requires an authenticated
    /// caller.
    async fn update_user_profile(
        &self,
        caller: &Caller,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ServiceError>;
}
