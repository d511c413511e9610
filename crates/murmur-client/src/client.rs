//! Top-level client wiring the session, synchronizer, and dispatcher.

use std::sync::Arc;

use murmur_core::{
    handle::{Connector, HandleFactory},
    identity::{Identity, IdentityGateway},
};
use murmur_proto::{Tweet, TweetId, UserId, UserProfile};

use crate::{
    dispatch::MutationDispatcher,
    error::ClientError,
    feed::FeedSynchronizer,
    session::{SessionController, SessionPhase},
};

/// The Murmur client.
///
/// Owns the session controller, feed synchronizer, and mutation dispatcher;
/// the presentation layer talks only to this type and never to the remote
/// service directly.
pub struct Client {
    session: Arc<SessionController>,
    feed: Arc<FeedSynchronizer>,
    dispatch: MutationDispatcher,
}

impl Client {
    /// Build a client against one fixed remote endpoint.
    ///
    /// # Errors
    ///
    /// Returns a fatal [`ClientError::Config`] when the endpoint address is
    /// malformed; no remote operation can ever succeed in that case and the
    /// presentation layer should degrade to unavailable.
    pub fn new(
        gateway: Arc<dyn IdentityGateway>,
        connector: Arc<dyn Connector>,
        endpoint: &str,
    ) -> Result<Self, ClientError> {
        let factory = HandleFactory::new(endpoint, connector)?;
        let session = Arc::new(SessionController::new(gateway, factory));
        let feed = Arc::new(FeedSynchronizer::new(Arc::clone(&session)));
        let dispatch = MutationDispatcher::new(Arc::clone(&session), Arc::clone(&feed));
        Ok(Self { session, feed, dispatch })
    }

    /// Resume an existing session and perform the initial fetches.
    ///
    /// Called exactly once at startup. When a provider session exists the
    /// client comes up authenticated and syncs both feed and profile;
    /// otherwise only the public feed is fetched.
    pub async fn initialize(&self) -> Result<SessionPhase, ClientError> {
        let phase = self.session.initialize().await?;
        match phase {
            SessionPhase::Authenticated => self.sync_quietly().await,
            _ => {
                if let Err(e) = self.feed.refresh_feed().await {
                    tracing::warn!(error = %e, "initial feed fetch failed");
                }
            },
        }
        Ok(phase)
    }

    /// Run the interactive login flow, then sync feed and profile.
    ///
    /// A failed sync after a successful login does not fail the login; the
    /// synchronizer reports it and retains prior state.
    pub async fn login(&self) -> Result<Identity, ClientError> {
        let identity = self.session.login().await?;
        self.sync_quietly().await;
        Ok(identity)
    }

    /// End the session: invalidate the handle, clear the profile, and ask
    /// the gateway to end the provider-side session.
    ///
    /// In-flight fetches are not cancelled; their results are discarded by
    /// the generation check when they resolve.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.session.begin_logout().await?;
        self.feed.clear_profile().await;
        self.session.finish_logout().await
    }

    async fn sync_quietly(&self) {
        if let Err(e) = self.feed.sync().await {
            tracing::warn!(error = %e, "post-login sync failed");
        }
    }

    /// The current session phase.
    pub async fn phase(&self) -> SessionPhase {
        self.session.phase().await
    }

    /// The current identity, if authenticated.
    pub async fn identity(&self) -> Option<Identity> {
        self.session.identity().await
    }

    /// The last successfully fetched feed snapshot.
    pub async fn feed(&self) -> Vec<Tweet> {
        self.feed.feed().await
    }

    /// Whether a feed refresh is in flight.
    pub async fn is_loading(&self) -> bool {
        self.feed.is_loading().await
    }

    /// The current user's profile, if fetched and present.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.feed.profile().await
    }

    /// Replace the feed snapshot with a fresh full fetch.
    pub async fn refresh_feed(&self) -> Result<(), ClientError> {
        self.feed.refresh_feed().await
    }

    /// Re-fetch the current user's profile.
    pub async fn refresh_profile(&self) -> Result<(), ClientError> {
        self.feed.refresh_profile().await
    }

    /// Read the tweets authored by the current user's followees.
    pub async fn following_feed(&self) -> Result<Vec<Tweet>, ClientError> {
        self.feed.following_feed().await
    }

    /// Post a new tweet and resync the feed.
    pub async fn post(&self, content: &str) -> Result<Tweet, ClientError> {
        self.dispatch.post(content).await
    }

    /// Like a tweet and resync the feed.
    pub async fn like(&self, id: TweetId) -> Result<Tweet, ClientError> {
        self.dispatch.like(id).await
    }

    /// Retweet a tweet and resync the feed.
    pub async fn retweet(&self, id: TweetId) -> Result<Tweet, ClientError> {
        self.dispatch.retweet(id).await
    }

    /// Follow a user and resync the profile.
    pub async fn follow(&self, target: &UserId) -> Result<(), ClientError> {
        self.dispatch.follow(target).await
    }

    /// Create or update the current user's profile and resync it.
    pub async fn update_profile(
        &self,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ClientError> {
        self.dispatch.update_profile(username, bio).await
    }
}
