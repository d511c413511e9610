//! Core entities of the micro-blogging data model.
//!
//! All durable state lives behind the remote service boundary: the backend
//! creates tweets, advances counters, and maintains the follow graph. These
//! types are the client's read-only view of that state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Unique tweet identifier assigned by the backend.
pub type TweetId = u64;

/// Opaque user identifier (principal text from the identity provider).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Create a user ID from principal text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The principal text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maximum tweet length in characters.
pub const MAX_TWEET_CHARS: usize = 280;

/// Validate tweet content against the length bounds.
///
/// Counts characters, not bytes, so multi-byte content is not penalized.
/// The backend enforces the same bounds; the client-side check exists so an
/// invalid post is rejected before any remote call is issued.
///
/// # Errors
///
/// Returns a human-readable reason when content is empty or over-length.
pub fn validate_content(content: &str) -> Result<(), String> {
    if content.is_empty() {
        return Err("tweet content must not be empty".to_string());
    }

    let chars = content.chars().count();
    if chars > MAX_TWEET_CHARS {
        return Err(format!("tweet content is {chars} characters, maximum is {MAX_TWEET_CHARS}"));
    }

    Ok(())
}

/// A single tweet as stored by the backend.
///
/// Created only by the backend in response to a post; counters are advanced
/// only by the backend in response to like/retweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tweet {
    /// Backend-assigned unique identifier.
    pub id: TweetId,
    /// Tweet text, 1 to [`MAX_TWEET_CHARS`] characters.
    pub content: String,
    /// Identifier of the authoring user.
    pub author: UserId,
    /// Creation time in nanoseconds; non-decreasing across tweet IDs.
    pub timestamp_ns: u64,
    /// Like counter.
    pub likes: u64,
    /// Retweet counter.
    pub retweets: u64,
}

/// A user's profile, created lazily by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The owning user.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Free-form biography text.
    pub bio: String,
    /// Users this profile follows.
    pub following: BTreeSet<UserId>,
    /// Users following this profile.
    pub followers: BTreeSet<UserId>,
}

impl UserProfile {
    /// An empty profile for a user that has not set a username or bio yet.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            username: String::new(),
            bio: String::new(),
            following: BTreeSet::new(),
            followers: BTreeSet::new(),
        }
    }
}

/// Outcome of a profile read.
///
/// Backend revisions disagree on the shape of `get user profile`: some
/// return an optional value, some a result-with-error. Both are adapted
/// into this tagged variant at the boundary so internal logic never sees
/// two incompatible shapes.
///
/// `NotFound` is a valid terminal state ("no profile yet"), distinct from
/// `Failed` which reports an error while leaving prior state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileLookup {
    /// The profile exists.
    Found(UserProfile),
    /// No profile has been created for this user yet.
    NotFound,
    /// The read failed with the given reason.
    Failed(String),
}

impl ProfileLookup {
    /// Adapt the optional-value response shape.
    pub fn from_option(profile: Option<UserProfile>) -> Self {
        profile.map_or(Self::NotFound, Self::Found)
    }

    /// Adapt the result-with-error response shape.
    ///
    /// These revisions have no distinct absent case; an error is an error.
    pub fn from_result(result: Result<UserProfile, String>) -> Self {
        match result {
            Ok(profile) => Self::Found(profile),
            Err(reason) => Self::Failed(reason),
        }
    }
}
