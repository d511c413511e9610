//! In-process loopback transport.
//!
//! Every call is pushed through the real CBOR envelope codec on both sides
//! before reaching the model backend, so the test suites exercise the same
//! serialization path a production transport would. Domain rejections
//! travel inside the response payload; transport faults and codec failures
//! surface as [`ServiceError::Transport`].

use std::sync::Arc;

use async_trait::async_trait;
use murmur_core::{
    handle::{ConfigError, Connector, Endpoint},
    identity::{Caller, Identity},
    service::{BackendService, ServiceError},
};
use murmur_proto::{
    ProfileLookup, Request, RequestEnvelope, Response, Tweet, TweetId, UserId, UserProfile,
    decode_request, decode_response, encode_request, encode_response,
};

/// Scheme the loopback connector accepts.
pub const LOOPBACK_SCHEME: &str = "loop";

/// A [`BackendService`] that round-trips every call through the wire codec
/// before delegating to the wrapped service.
pub struct WireService {
    inner: Arc<dyn BackendService>,
}

impl WireService {
    /// Wrap `inner` behind the codec.
    pub fn new(inner: Arc<dyn BackendService>) -> Self {
        Self { inner }
    }

    /// Serve one encoded request: decode, dispatch, encode the reply.
    ///
    /// Rejections become payload errors; a transport fault from the inner
    /// service aborts the exchange, as a lost reply would.
    async fn serve(&self, wire: &[u8]) -> Result<Response, ServiceError> {
        let envelope = decode_request(wire).map_err(|e| ServiceError::transport(e.to_string()))?;
        let caller = match envelope.caller {
            Some(user) => Caller::Authenticated(Identity::new(user.as_str())),
            None => Caller::Anonymous,
        };

        let response = match envelope.request {
            Request::CreateTweet { content } => {
                Response::Tweet(reject_to_payload(self.inner.create_tweet(&caller, &content).await)?)
            },
            Request::LikeTweet { tweet_id } => {
                Response::Tweet(reject_to_payload(self.inner.like_tweet(&caller, tweet_id).await)?)
            },
            Request::Retweet { tweet_id } => {
                Response::Tweet(reject_to_payload(self.inner.retweet(&caller, tweet_id).await)?)
            },
            Request::FollowUser { target } => {
                Response::Ack(reject_to_payload(self.inner.follow_user(&caller, &target).await)?)
            },
            Request::GetAllTweets => Response::Tweets(self.inner.get_all_tweets(&caller).await?),
            Request::GetUserFeed { user } => {
                Response::Tweets(self.inner.get_user_feed(&caller, &user).await?)
            },
            Request::GetUserProfile { user } => {
                Response::Profile(self.inner.get_user_profile(&caller, &user).await?)
            },
            Request::UpdateUserProfile { username, bio } => Response::ProfileUpdated(
                reject_to_payload(self.inner.update_user_profile(&caller, &username, &bio).await)?,
            ),
        };
        Ok(response)
    }

    /// Encode a request, serve it, and decode the reply.
    async fn exchange(&self, caller: &Caller, request: Request) -> Result<Response, ServiceError> {
        let envelope = RequestEnvelope { caller: caller.user_id(), request };
        let wire = encode_request(&envelope).map_err(|e| ServiceError::transport(e.to_string()))?;

        let response = self.serve(&wire).await?;

        let reply = encode_response(&response).map_err(|e| ServiceError::transport(e.to_string()))?;
        decode_response(&reply).map_err(|e| ServiceError::transport(e.to_string()))
    }
}

/// Move a domain rejection into the response payload; let transport faults
/// propagate.
fn reject_to_payload<T>(result: Result<T, ServiceError>) -> Result<Result<T, String>, ServiceError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(ServiceError::Rejected { reason }) => Ok(Err(reason)),
        Err(transport @ ServiceError::Transport { .. }) => Err(transport),
    }
}

/// Lift a payload error back into a domain rejection.
fn payload_to_reject<T>(payload: Result<T, String>) -> Result<T, ServiceError> {
    payload.map_err(ServiceError::rejected)
}

fn unexpected<T>(response: &Response) -> Result<T, ServiceError> {
    Err(ServiceError::transport(format!("unexpected response shape: {response:?}")))
}

#[async_trait]
impl BackendService for WireService {
    async fn create_tweet(&self, caller: &Caller, content: &str) -> Result<Tweet, ServiceError> {
        match self.exchange(caller, Request::CreateTweet { content: content.to_string() }).await? {
            Response::Tweet(payload) => payload_to_reject(payload),
            other => unexpected(&other),
        }
    }

    async fn like_tweet(&self, caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError> {
        match self.exchange(caller, Request::LikeTweet { tweet_id: id }).await? {
            Response::Tweet(payload) => payload_to_reject(payload),
            other => unexpected(&other),
        }
    }

    async fn retweet(&self, caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError> {
        match self.exchange(caller, Request::Retweet { tweet_id: id }).await? {
            Response::Tweet(payload) => payload_to_reject(payload),
            other => unexpected(&other),
        }
    }

    async fn follow_user(&self, caller: &Caller, target: &UserId) -> Result<(), ServiceError> {
        match self.exchange(caller, Request::FollowUser { target: target.clone() }).await? {
            Response::Ack(payload) => payload_to_reject(payload),
            other => unexpected(&other),
        }
    }

    async fn get_all_tweets(&self, caller: &Caller) -> Result<Vec<Tweet>, ServiceError> {
        match self.exchange(caller, Request::GetAllTweets).await? {
            Response::Tweets(tweets) => Ok(tweets),
            other => unexpected(&other),
        }
    }

    async fn get_user_feed(
        &self,
        caller: &Caller,
        user: &UserId,
    ) -> Result<Vec<Tweet>, ServiceError> {
        match self.exchange(caller, Request::GetUserFeed { user: user.clone() }).await? {
            Response::Tweets(tweets) => Ok(tweets),
            other => unexpected(&other),
        }
    }

    async fn get_user_profile(
        &self,
        caller: &Caller,
        user: &UserId,
    ) -> Result<ProfileLookup, ServiceError> {
        match self.exchange(caller, Request::GetUserProfile { user: user.clone() }).await? {
            Response::Profile(lookup) => Ok(lookup),
            other => unexpected(&other),
        }
    }

    async fn update_user_profile(
        &self,
        caller: &Caller,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ServiceError> {
        let request = Request::UpdateUserProfile {
            username: username.to_string(),
            bio: bio.to_string(),
        };
        match self.exchange(caller, request).await? {
            Response::ProfileUpdated(payload) => payload_to_reject(payload),
            other => unexpected(&other),
        }
    }
}

/// Connects handles to an in-process backend through [`WireService`].
pub struct LoopbackConnector {
    backend: Arc<dyn BackendService>,
}

impl LoopbackConnector {
    /// A connector serving `backend` over the loopback wire.
    pub fn new(backend: Arc<dyn BackendService>) -> Self {
        Self { backend }
    }
}

impl Connector for LoopbackConnector {
    fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn BackendService>, ConfigError> {
        if endpoint.scheme() != LOOPBACK_SCHEME {
            return Err(ConfigError::ConnectorFailed {
                address: endpoint.to_string(),
                reason: format!("unsupported scheme {:?}", endpoint.scheme()),
            });
        }
        Ok(Arc::new(WireService::new(Arc::clone(&self.backend))))
    }
}
