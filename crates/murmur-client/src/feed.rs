//! Feed synchronizer.
//!
//! Pulls the full tweet collection and the caller's own profile through the
//! current service handle, and replays the effect of mutations by
//! re-fetching. Every refresh is a total replace: the snapshot is swapped
//! wholesale on success and left untouched on failure, so no error can
//! leave it partially updated.
//!
//! Concurrent refreshes are not serialized; within one session generation
//! the last completion wins, which can (rarely) overwrite a newer snapshot
//! with an older one when responses resolve out of issue order. That is an
//! accepted limitation, not masked here. Results that cross a session
//! transition are recognized by their generation stamp and discarded.

use std::sync::Arc;

use murmur_core::service::ServiceError;
use murmur_proto::{Tweet, UserProfile};
use tokio::sync::Mutex;

use crate::{error::ClientError, session::SessionController};

struct FeedState {
    tweets: Vec<Tweet>,
    loading: bool,
}

/// Keeps the feed snapshot and the current user's profile in sync with the
/// backend's authoritative state.
pub struct FeedSynchronizer {
    session: Arc<SessionController>,
    feed: Mutex<FeedState>,
    profile: Mutex<Option<UserProfile>>,
}

impl FeedSynchronizer {
    /// Create a synchronizer with an empty snapshot.
    pub fn new(session: Arc<SessionController>) -> Self {
        Self {
            session,
            feed: Mutex::new(FeedState { tweets: Vec::new(), loading: false }),
            profile: Mutex::new(None),
        }
    }

    /// Replace the feed snapshot with a fresh full fetch.
    ///
    /// The read surface is public: when unauthenticated the fetch runs
    /// through an anonymous handle. On failure the previous snapshot is
    /// retained unchanged and the failure is reported (non-fatal). A result
    /// issued under a generation that is no longer current is discarded.
    pub async fn refresh_feed(&self) -> Result<(), ClientError> {
        let handle = self.session.read_handle().await?;
        self.feed.lock().await.loading = true;

        let result = handle.get_all_tweets().await;
        let current = self.session.generation().await;

        let mut feed = self.feed.lock().await;
        feed.loading = false;

        match result {
            Ok(tweets) => {
                if handle.generation() != current {
                    tracing::debug!(
                        issued = handle.generation(),
                        current,
                        "discarding stale feed result"
                    );
                    return Ok(());
                }
                tracing::debug!(count = tweets.len(), "feed snapshot replaced");
                feed.tweets = tweets;
                Ok(())
            },
            Err(e) => {
                tracing::warn!(error = %e, "feed refresh failed; snapshot retained");
                Err(e.into())
            },
        }
    }

    /// Re-fetch the current user's profile.
    ///
    /// Only valid while authenticated. An absent profile is a valid
    /// terminal state and clears the stored profile without an error; an
    /// explicit backend error leaves the previous profile unchanged and is
    /// reported. A result arriving after logout is discarded.
    pub async fn refresh_profile(&self) -> Result<(), ClientError> {
        let handle = self.session.authenticated_handle("refresh profile").await?;
        let Some(user) = handle.caller().user_id() else {
            return Err(ClientError::NotAuthenticated { operation: "refresh profile" });
        };

        let result = handle.get_user_profile(&user).await;
        let current = self.session.generation().await;

        match result {
            Ok(lookup) => {
                if handle.generation() != current {
                    tracing::debug!(
                        issued = handle.generation(),
                        current,
                        "discarding stale profile result"
                    );
                    return Ok(());
                }
                match lookup {
                    murmur_proto::ProfileLookup::Found(profile) => {
                        tracing::debug!(user = %profile.user_id, "profile replaced");
                        *self.profile.lock().await = Some(profile);
                        Ok(())
                    },
                    murmur_proto::ProfileLookup::NotFound => {
                        tracing::debug!(user = %user, "no profile yet");
                        *self.profile.lock().await = None;
                        Ok(())
                    },
                    murmur_proto::ProfileLookup::Failed(reason) => {
                        tracing::warn!(%reason, "profile refresh failed; profile retained");
                        Err(ServiceError::rejected(reason).into())
                    },
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "profile refresh failed; profile retained");
                Err(e.into())
            },
        }
    }

    /// Read the tweets authored by the current user's followees.
    ///
    /// An authenticated read-through; does not replace the global snapshot.
    pub async fn following_feed(&self) -> Result<Vec<Tweet>, ClientError> {
        let handle = self.session.authenticated_handle("read following feed").await?;
        let Some(user) = handle.caller().user_id() else {
            return Err(ClientError::NotAuthenticated { operation: "read following feed" });
        };
        Ok(handle.get_user_feed(&user).await?)
    }

    /// Issue both refreshes for one causal event (login, completed
    /// mutation). Both are always issued; their completion order relative
    /// to each other is unconstrained.
    pub async fn sync(&self) -> Result<(), ClientError> {
        let (feed, profile) = tokio::join!(self.refresh_feed(), self.refresh_profile());
        feed?;
        profile
    }

    /// The last successfully fetched snapshot.
    pub async fn feed(&self) -> Vec<Tweet> {
        self.feed.lock().await.tweets.clone()
    }

    /// Whether a feed refresh is in flight.
    pub async fn is_loading(&self) -> bool {
        self.feed.lock().await.loading
    }

    /// The current user's profile, if fetched and present.
    pub async fn profile(&self) -> Option<UserProfile> {
        self.profile.lock().await.clone()
    }

    /// Drop the stored profile. Runs on logout; the public feed snapshot is
    /// deliberately retained.
    pub async fn clear_profile(&self) {
        *self.profile.lock().await = None;
    }
}
