//! Murmur protocol types.
//!
//! Shared data model for the Murmur micro-blogging client and the CBOR wire
//! envelope used between a service handle and a backend transport.
//!
//! # Components
//!
//! - [`Tweet`], [`UserProfile`]: entities owned by the remote backend. The
//!   client never mutates them locally; it always re-fetches.
//! - [`ProfileLookup`]: single internal shape for the two profile-read
//!   response shapes observed across backend revisions.
//! - [`Request`], [`Response`]: CBOR envelope covering every remote
//!   operation the client consumes.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod types;
mod wire;

pub use types::{
    MAX_TWEET_CHARS, ProfileLookup, Tweet, TweetId, UserId, UserProfile, validate_content,
};
pub use wire::{
    CodecError, Request, RequestEnvelope, Response, decode_request, decode_response,
    encode_request, encode_response,
};
