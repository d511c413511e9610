//! In-memory model backend.
//!
//! The oracle the client is verified against: it implements the backend's
//! authoritative rules (authorization, content validation, counters, the
//! follow graph, lazy profile creation, monotonic timestamps) entirely in
//! memory. Fault injection hooks simulate transport failures and profile
//! storage errors; a gate can hold profile reads open to reproduce the
//! logout race.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};

use async_trait::async_trait;
use murmur_core::{
    env::Environment,
    identity::{Caller, Identity},
    service::{BackendService, ServiceError},
};
use murmur_proto::{ProfileLookup, Tweet, TweetId, UserId, UserProfile, validate_content};
use tokio::sync::Notify;

/// Operations that can have faults injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// `create_tweet`
    CreateTweet,
    /// `like_tweet`
    LikeTweet,
    /// `retweet`
    Retweet,
    /// `follow_user`
    FollowUser,
    /// `get_all_tweets`
    GetAllTweets,
    /// `get_user_feed`
    GetUserFeed,
    /// `get_user_profile`
    GetUserProfile,
    /// `update_user_profile`
    UpdateUserProfile,
}

/// Releases profile reads held by [`ModelBackend::hold_profile_reads`].
pub struct ProfileGate {
    notify: Arc<Notify>,
}

impl ProfileGate {
    /// Let one held profile read proceed.
    ///
    /// Stores a permit, so releasing before the read arrives also works.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

struct State {
    tweets: BTreeMap<TweetId, Tweet>,
    next_id: TweetId,
    last_timestamp_ns: u64,
    profiles: HashMap<UserId, UserProfile>,
}

/// The in-memory backend oracle.
pub struct ModelBackend<E: Environment> {
    env: E,
    epoch: Instant,
    state: Mutex<State>,
    faults: Mutex<HashMap<Op, usize>>,
    profile_failures: Mutex<VecDeque<String>>,
    profile_gate: Mutex<Option<Arc<Notify>>>,
    calls: AtomicUsize,
}

impl<E: Environment> ModelBackend<E> {
    /// Create an empty backend drawing timestamps from `env`.
    pub fn new(env: E) -> Self {
        let epoch = env.now();
        Self {
            env,
            epoch,
            state: Mutex::new(State {
                tweets: BTreeMap::new(),
                next_id: 0,
                last_timestamp_ns: 0,
                profiles: HashMap::new(),
            }),
            faults: Mutex::new(HashMap::new()),
            profile_failures: Mutex::new(VecDeque::new()),
            profile_gate: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the next `count` calls of `op` with a transport error.
    pub fn fail_next(&self, op: Op, count: usize) {
        *self
            .faults
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(op)
            .or_insert(0) += count;
    }

    /// Make the next profile read return an explicit
    /// [`ProfileLookup::Failed`] with `reason` (a domain error, distinct
    /// from a transport fault).
    pub fn fail_profile_lookup(&self, reason: &str) {
        self.profile_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reason.to_string());
    }

    /// Hold profile reads until the returned gate is released.
    pub fn hold_profile_reads(&self) -> ProfileGate {
        let notify = Arc::new(Notify::new());
        *self.profile_gate.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(Arc::clone(&notify));
        ProfileGate { notify }
    }

    /// Total number of remote calls observed, fault-injected ones included.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The authoritative tweet collection, in creation order.
    pub fn tweets(&self) -> Vec<Tweet> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tweets
            .values()
            .cloned()
            .collect()
    }

    /// The authoritative profile for `user`, if one exists.
    pub fn profile_of(&self, user: &UserId) -> Option<UserProfile> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).profiles.get(user).cloned()
    }

    /// Seed a profile directly, bypassing the service surface.
    pub fn seed_profile(&self, user: &UserId, username: &str, bio: &str) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let profile =
            state.profiles.entry(user.clone()).or_insert_with(|| UserProfile::empty(user.clone()));
        profile.username = username.to_string();
        profile.bio = bio.to_string();
    }

    fn observe(&self, op: Op) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(remaining) = faults.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ServiceError::transport(format!("injected fault for {op:?}")));
            }
        }
        Ok(())
    }

    fn authenticated(caller: &Caller) -> Result<&Identity, ServiceError> {
        caller.identity().ok_or_else(|| ServiceError::rejected("authentication required"))
    }

    fn next_timestamp_ns(&self, state: &mut State) -> u64 {
        let elapsed = u64::try_from((self.env.now() - self.epoch).as_nanos()).unwrap_or(u64::MAX);
        // Never goes backwards, even if the environment's clock stalls.
        state.last_timestamp_ns = state.last_timestamp_ns.max(elapsed);
        state.last_timestamp_ns
    }
}

#[async_trait]
impl<E: Environment> BackendService for ModelBackend<E> {
    async fn create_tweet(&self, caller: &Caller, content: &str) -> Result<Tweet, ServiceError> {
        self.observe(Op::CreateTweet)?;
        let identity = Self::authenticated(caller)?;
        validate_content(content).map_err(ServiceError::rejected)?;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let timestamp_ns = self.next_timestamp_ns(&mut state);
        let id = state.next_id;
        state.next_id += 1;

        let tweet = Tweet {
            id,
            content: content.to_string(),
            author: identity.user_id(),
            timestamp_ns,
            likes: 0,
            retweets: 0,
        };
        state.tweets.insert(id, tweet.clone());
        Ok(tweet)
    }

    async fn like_tweet(&self, _caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError> {
        self.observe(Op::LikeTweet)?;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let tweet = state
            .tweets
            .get_mut(&id)
            .ok_or_else(|| ServiceError::rejected(format!("no such tweet: {id}")))?;
        tweet.likes += 1;
        Ok(tweet.clone())
    }

    async fn retweet(&self, _caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError> {
        self.observe(Op::Retweet)?;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let tweet = state
            .tweets
            .get_mut(&id)
            .ok_or_else(|| ServiceError::rejected(format!("no such tweet: {id}")))?;
        tweet.retweets += 1;
        Ok(tweet.clone())
    }

    async fn follow_user(&self, caller: &Caller, target: &UserId) -> Result<(), ServiceError> {
        self.observe(Op::FollowUser)?;
        let identity = Self::authenticated(caller)?;
        let follower = identity.user_id();

        if follower == *target {
            return Err(ServiceError::rejected("cannot follow yourself"));
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state
            .profiles
            .entry(follower.clone())
            .or_insert_with(|| UserProfile::empty(follower.clone()))
            .following
            .insert(target.clone());
        state
            .profiles
            .entry(target.clone())
            .or_insert_with(|| UserProfile::empty(target.clone()))
            .followers
            .insert(follower);
        Ok(())
    }

    async fn get_all_tweets(&self, _caller: &Caller) -> Result<Vec<Tweet>, ServiceError> {
        self.observe(Op::GetAllTweets)?;
        Ok(self.tweets())
    }

    async fn get_user_feed(
        &self,
        caller: &Caller,
        user: &UserId,
    ) -> Result<Vec<Tweet>, ServiceError> {
        self.observe(Op::GetUserFeed)?;
        Self::authenticated(caller)?;

        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let following = state.profiles.get(user).map(|p| p.following.clone()).unwrap_or_default();
        Ok(state.tweets.values().filter(|t| following.contains(&t.author)).cloned().collect())
    }

    async fn get_user_profile(
        &self,
        _caller: &Caller,
        user: &UserId,
    ) -> Result<ProfileLookup, ServiceError> {
        self.observe(Op::GetUserProfile)?;

        let gate =
            self.profile_gate.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(notify) = gate {
            notify.notified().await;
        }

        if let Some(reason) =
            self.profile_failures.lock().unwrap_or_else(PoisonError::into_inner).pop_front()
        {
            return Ok(ProfileLookup::Failed(reason));
        }

        Ok(ProfileLookup::from_option(self.profile_of(user)))
    }

    async fn update_user_profile(
        &self,
        caller: &Caller,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ServiceError> {
        self.observe(Op::UpdateUserProfile)?;
        let identity = Self::authenticated(caller)?;
        let user = identity.user_id();

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let profile =
            state.profiles.entry(user.clone()).or_insert_with(|| UserProfile::empty(user));
        profile.username = username.to_string();
        profile.bio = bio.to_string();
        Ok(profile.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::env::TestEnv;

    fn alice() -> Caller {
        Caller::Authenticated(Identity::new("alice"))
    }

    fn bob() -> Caller {
        Caller::Authenticated(Identity::new("bob"))
    }

    #[tokio::test]
    async fn anonymous_cannot_post() {
        let backend = ModelBackend::new(TestEnv::new());
        let result = backend.create_tweet(&Caller::Anonymous, "hello").await;
        assert!(matches!(result, Err(ServiceError::Rejected { .. })));
    }

    #[tokio::test]
    async fn post_assigns_sequential_ids_and_zero_counters() {
        let backend = ModelBackend::new(TestEnv::new());

        let first = backend.create_tweet(&alice(), "one").await.unwrap();
        let second = backend.create_tweet(&alice(), "two").await.unwrap();

        assert_eq!(first.id, 0);
        assert_eq!(second.id, 1);
        assert_eq!((first.likes, first.retweets), (0, 0));
    }

    #[tokio::test]
    async fn timestamps_are_non_decreasing() {
        let env = TestEnv::new();
        let backend = ModelBackend::new(env.clone());

        let first = backend.create_tweet(&alice(), "one").await.unwrap();
        env.advance(std::time::Duration::from_millis(5));
        let second = backend.create_tweet(&alice(), "two").await.unwrap();
        let third = backend.create_tweet(&alice(), "three").await.unwrap();

        assert!(second.timestamp_ns > first.timestamp_ns);
        assert!(third.timestamp_ns >= second.timestamp_ns);
    }

    #[tokio::test]
    async fn server_side_content_validation() {
        let backend = ModelBackend::new(TestEnv::new());

        assert!(backend.create_tweet(&alice(), "").await.is_err());
        let over = "x".repeat(281);
        assert!(backend.create_tweet(&alice(), &over).await.is_err());
    }

    #[tokio::test]
    async fn like_unknown_tweet_is_a_domain_error() {
        let backend = ModelBackend::new(TestEnv::new());
        assert!(matches!(
            backend.like_tweet(&alice(), 99).await,
            Err(ServiceError::Rejected { .. })
        ));
    }

    #[tokio::test]
    async fn follow_updates_both_sides_of_the_graph() {
        let backend = ModelBackend::new(TestEnv::new());
        let bob_id = UserId::new("bob");
        let alice_id = UserId::new("alice");

        backend.follow_user(&alice(), &bob_id).await.unwrap();

        let alice_profile = backend.profile_of(&alice_id).unwrap();
        let bob_profile = backend.profile_of(&bob_id).unwrap();
        assert!(alice_profile.following.contains(&bob_id));
        assert!(bob_profile.followers.contains(&alice_id));
    }

    #[tokio::test]
    async fn self_follow_rejected() {
        let backend = ModelBackend::new(TestEnv::new());
        let result = backend.follow_user(&alice(), &UserId::new("alice")).await;
        assert!(matches!(result, Err(ServiceError::Rejected { .. })));
    }

    #[tokio::test]
    async fn user_feed_contains_only_followee_tweets() {
        let backend = ModelBackend::new(TestEnv::new());
        let alice_id = UserId::new("alice");

        backend.create_tweet(&alice(), "from alice").await.unwrap();
        backend.create_tweet(&bob(), "from bob").await.unwrap();
        backend.follow_user(&alice(), &UserId::new("bob")).await.unwrap();

        let feed = backend.get_user_feed(&alice(), &alice_id).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].content, "from bob");
    }

    #[tokio::test]
    async fn injected_fault_fails_exactly_n_calls() {
        let backend = ModelBackend::new(TestEnv::new());
        backend.fail_next(Op::GetAllTweets, 1);

        assert!(matches!(
            backend.get_all_tweets(&Caller::Anonymous).await,
            Err(ServiceError::Transport { .. })
        ));
        assert!(backend.get_all_tweets(&Caller::Anonymous).await.is_ok());
    }

    #[tokio::test]
    async fn profile_lookup_failure_is_a_domain_value() {
        let backend = ModelBackend::new(TestEnv::new());
        backend.fail_profile_lookup("storage corrupt");

        let lookup = backend.get_user_profile(&alice(), &UserId::new("alice")).await.unwrap();
        assert_eq!(lookup, ProfileLookup::Failed("storage corrupt".to_string()));

        // Consumed: the next read is a normal NotFound.
        let lookup = backend.get_user_profile(&alice(), &UserId::new("alice")).await.unwrap();
        assert_eq!(lookup, ProfileLookup::NotFound);
    }

    #[tokio::test]
    async fn gated_profile_read_waits_for_release() {
        let backend = Arc::new(ModelBackend::new(TestEnv::new()));
        let gate = backend.hold_profile_reads();

        let reader = {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                backend.get_user_profile(&Caller::Anonymous, &UserId::new("alice")).await
            })
        };

        // The read is parked until the gate opens.
        tokio::task::yield_now().await;
        assert!(!reader.is_finished());

        gate.release();
        assert!(reader.await.unwrap().is_ok());
    }
}
