//! CBOR wire envelope for remote operations.
//!
//! Every operation the client consumes is expressible as a [`Request`], and
//! every backend reply as a [`Response`]. A transport carries the encoded
//! envelope; the caller travels alongside the request because the backend
//! authorizes mutations against it.
//!
//! Decoding is total: garbled input produces [`CodecError::Decode`], never a
//! panic.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{ProfileLookup, Tweet, TweetId, UserId};

/// Errors from envelope encoding or decoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serialization to CBOR failed.
    #[error("encode failed: {reason}")]
    Encode {
        /// Description of the serializer failure.
        reason: String,
    },

    /// Deserialization from CBOR failed.
    #[error("decode failed: {reason}")]
    Decode {
        /// Description of the deserializer failure.
        reason: String,
    },
}

/// A remote operation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Request {
    /// Create a tweet with the given content.
    CreateTweet {
        /// Tweet text.
        content: String,
    },
    /// Increment the like counter of a tweet.
    LikeTweet {
        /// Target tweet.
        tweet_id: TweetId,
    },
    /// Increment the retweet counter of a tweet.
    Retweet {
        /// Target tweet.
        tweet_id: TweetId,
    },
    /// Add a user to the caller's following set.
    FollowUser {
        /// User to follow.
        target: UserId,
    },
    /// Read the full tweet collection.
    GetAllTweets,
    /// Read tweets authored by the given user's followees.
    GetUserFeed {
        /// Whose feed to read.
        user: UserId,
    },
    /// Read a user's profile.
    GetUserProfile {
        /// Whose profile to read.
        user: UserId,
    },
    /// Create or update the caller's profile.
    UpdateUserProfile {
        /// New display name.
        username: String,
        /// New biography text.
        bio: String,
    },
}

/// A request together with the caller it was issued under.
///
/// `caller` is `None` for anonymous reads. The backend rejects mutations
/// whose envelope carries no caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Authenticated caller, if any.
    pub caller: Option<UserId>,
    /// The operation.
    pub request: Request,
}

/// A backend reply.
///
/// Domain errors travel as `Err(reason)` inside the variant; they are an
/// expected reply, not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Response {
    /// Reply to a tweet mutation: the authoritative tweet, or a rejection.
    Tweet(Result<Tweet, String>),
    /// Reply to a collection read.
    Tweets(Vec<Tweet>),
    /// Reply to an operation with no payload: success, or a rejection.
    Ack(Result<(), String>),
    /// Reply to a profile read.
    Profile(ProfileLookup),
    /// Reply to a profile update: the stored profile, or a rejection.
    ProfileUpdated(Result<crate::types::UserProfile, String>),
}

/// Encode a request envelope to CBOR.
pub fn encode_request(envelope: &RequestEnvelope) -> Result<Bytes, CodecError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(envelope, &mut buf)
        .map_err(|e| CodecError::Encode { reason: e.to_string() })?;
    Ok(Bytes::from(buf))
}

/// Decode a request envelope from CBOR.
pub fn decode_request(bytes: &[u8]) -> Result<RequestEnvelope, CodecError> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode { reason: e.to_string() })
}

/// Encode a response to CBOR.
pub fn encode_response(response: &Response) -> Result<Bytes, CodecError> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(response, &mut buf)
        .map_err(|e| CodecError::Encode { reason: e.to_string() })?;
    Ok(Bytes::from(buf))
}

/// Decode a response from CBOR.
pub fn decode_response(bytes: &[u8]) -> Result<Response, CodecError> {
    ciborium::de::from_reader(bytes).map_err(|e| CodecError::Decode { reason: e.to_string() })
}
