//! Mutation dispatcher.
//!
//! All five write operations share one contract: the session must be
//! authenticated (checked locally, no remote call otherwise), the call runs
//! through the current handle, and success triggers a resynchronization so
//! the locally observed state always reflects the backend's authoritative
//! counters rather than a locally guessed delta. Nothing is ever mutated
//! optimistically on the client.

use std::sync::Arc;

use murmur_proto::{Tweet, TweetId, UserId, UserProfile, validate_content};

use crate::{error::ClientError, feed::FeedSynchronizer, session::SessionController};

/// Validates preconditions and relays mutations to the service handle.
pub struct MutationDispatcher {
    session: Arc<SessionController>,
    feed: Arc<FeedSynchronizer>,
}

impl MutationDispatcher {
    /// Create a dispatcher over the given session and synchronizer.
    pub fn new(session: Arc<SessionController>, feed: Arc<FeedSynchronizer>) -> Self {
        Self { session, feed }
    }

    /// Post a new tweet.
    ///
    /// Content is validated locally before dispatch (non-empty, at most 280
    /// characters) in addition to whatever the backend enforces; the two
    /// checks are defense in depth, not substitutes.
    pub async fn post(&self, content: &str) -> Result<Tweet, ClientError> {
        validate_content(content).map_err(|reason| ClientError::InvalidContent { reason })?;

        let handle = self.session.authenticated_handle("post").await?;
        let tweet = handle.create_tweet(content).await?;
        tracing::info!(id = tweet.id, "tweet created");

        self.resync_feed().await;
        Ok(tweet)
    }

    /// Like a tweet. Two likes are two increments; the backend does not
    /// deduplicate.
    pub async fn like(&self, id: TweetId) -> Result<Tweet, ClientError> {
        let handle = self.session.authenticated_handle("like").await?;
        let tweet = handle.like_tweet(id).await?;

        self.resync_feed().await;
        Ok(tweet)
    }

    /// Retweet a tweet.
    pub async fn retweet(&self, id: TweetId) -> Result<Tweet, ClientError> {
        let handle = self.session.authenticated_handle("retweet").await?;
        let tweet = handle.retweet(id).await?;

        self.resync_feed().await;
        Ok(tweet)
    }

    /// Follow a user.
    pub async fn follow(&self, target: &UserId) -> Result<(), ClientError> {
        let handle = self.session.authenticated_handle("follow").await?;
        handle.follow_user(target).await?;
        tracing::info!(target = %target, "followed user");

        self.resync_profile().await;
        Ok(())
    }

    /// Create or update the current user's profile.
    pub async fn update_profile(
        &self,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ClientError> {
        let handle = self.session.authenticated_handle("update profile").await?;
        let profile = handle.update_user_profile(username, bio).await?;

        self.resync_profile().await;
        Ok(profile)
    }

    /// Post-mutation feed refresh. The mutation already succeeded; a
    /// refresh failure retains the previous snapshot and is reported by the
    /// synchronizer, so it does not fail the mutation.
    async fn resync_feed(&self) {
        if let Err(e) = self.feed.refresh_feed().await {
            tracing::warn!(error = %e, "post-mutation feed refresh failed");
        }
    }

    /// Post-mutation profile refresh, same policy as [`Self::resync_feed`].
    async fn resync_profile(&self) {
        if let Err(e) = self.feed.refresh_profile().await {
            tracing::warn!(error = %e, "post-mutation profile refresh failed");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use murmur_proto::MAX_TWEET_CHARS;

    use super::*;
    use crate::testutil::{FakeGateway, counting_factory};

    fn unauthenticated_world() -> (MutationDispatcher, Arc<crate::testutil::CountingService>) {
        let gateway = Arc::new(FakeGateway::logged_out());
        let (factory, service) = counting_factory();
        let session = Arc::new(SessionController::new(gateway, factory));
        let feed = Arc::new(FeedSynchronizer::new(Arc::clone(&session)));
        (MutationDispatcher::new(session, feed), service)
    }

    async fn authenticated_world() -> (MutationDispatcher, Arc<crate::testutil::CountingService>) {
        let gateway = Arc::new(FakeGateway::login_succeeds("alice"));
        let (factory, service) = counting_factory();
        let session = Arc::new(SessionController::new(gateway, factory));
        session.login().await.unwrap();
        let feed = Arc::new(FeedSynchronizer::new(Arc::clone(&session)));
        (MutationDispatcher::new(session, feed), service)
    }

    #[tokio::test]
    async fn mutations_while_unauthenticated_issue_no_remote_call() {
        let (dispatch, service) = unauthenticated_world();

        assert!(matches!(
            dispatch.post("hello").await,
            Err(ClientError::NotAuthenticated { operation: "post" })
        ));
        assert!(dispatch.like(7).await.is_err());
        assert!(dispatch.retweet(7).await.is_err());
        assert!(dispatch.follow(&UserId::new("bob")).await.is_err());
        assert!(dispatch.update_profile("alice", "bio").await.is_err());

        assert_eq!(service.calls(), 0, "precondition violations must stay local");
    }

    #[tokio::test]
    async fn overlong_content_rejected_before_dispatch() {
        let (dispatch, service) = authenticated_world().await;

        let too_long = "x".repeat(MAX_TWEET_CHARS + 1);
        assert!(matches!(
            dispatch.post(&too_long).await,
            Err(ClientError::InvalidContent { .. })
        ));
        assert_eq!(service.calls(), 0, "invalid content must not reach the backend");
    }

    #[tokio::test]
    async fn empty_content_rejected_before_dispatch() {
        let (dispatch, service) = authenticated_world().await;

        assert!(dispatch.post("").await.is_err());
        assert_eq!(service.calls(), 0);
    }

    #[tokio::test]
    async fn successful_post_triggers_feed_refresh() {
        let (dispatch, service) = authenticated_world().await;

        dispatch.post("hello world").await.unwrap();
        // One create call plus one full-collection read.
        assert_eq!(service.calls(), 2);
    }

    #[tokio::test]
    async fn successful_follow_triggers_profile_refresh() {
        let (dispatch, service) = authenticated_world().await;

        dispatch.follow(&UserId::new("bob")).await.unwrap();
        // One follow call plus one profile read.
        assert_eq!(service.calls(), 2);
    }
}
