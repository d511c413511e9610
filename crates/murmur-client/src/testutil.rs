//! Shared test doubles for unit tests in this crate.
//!
//! The full-behavior oracle lives in `murmur-harness`; these doubles only
//! script the seams (gateway outcomes, call counting) that unit tests need.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use murmur_core::{
    handle::{ConfigError, Connector, Endpoint, HandleFactory},
    identity::{Caller, GatewayError, Identity, IdentityGateway},
    service::{BackendService, ServiceError},
};
use murmur_proto::{ProfileLookup, Tweet, TweetId, UserId, UserProfile};

/// Gateway double with scriptable outcomes.
pub(crate) struct FakeGateway {
    current: Mutex<Option<String>>,
    next_login: Mutex<Result<String, String>>,
    logouts: AtomicUsize,
}

impl FakeGateway {
    pub(crate) fn logged_out() -> Self {
        Self {
            current: Mutex::new(None),
            next_login: Mutex::new(Err("no login scripted".to_string())),
            logouts: AtomicUsize::new(0),
        }
    }

    pub(crate) fn pre_authenticated(principal: &str) -> Self {
        let gateway = Self::logged_out();
        *gateway.current.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Some(principal.to_string());
        gateway
    }

    pub(crate) fn login_succeeds(principal: &str) -> Self {
        let gateway = Self::logged_out();
        gateway.set_next_login(principal);
        gateway
    }

    pub(crate) fn login_fails(reason: &str) -> Self {
        let gateway = Self::logged_out();
        *gateway.next_login.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Err(reason.to_string());
        gateway
    }

    pub(crate) fn set_next_login(&self, principal: &str) {
        *self.next_login.lock().unwrap_or_else(std::sync::PoisonError::into_inner) =
            Ok(principal.to_string());
    }

    pub(crate) fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for FakeGateway {
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError> {
        Ok(self
            .current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_deref()
            .map(Identity::new))
    }

    async fn login(&self) -> Result<Identity, GatewayError> {
        match self.next_login.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone() {
            Ok(principal) => Ok(Identity::new(principal)),
            Err(reason) => Err(GatewayError::LoginFailed { reason }),
        }
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn dummy_tweet(id: TweetId, content: &str, author: UserId) -> Tweet {
    Tweet { id, content: content.to_string(), author, timestamp_ns: 0, likes: 0, retweets: 0 }
}

fn caller_id(caller: &Caller) -> UserId {
    caller.user_id().unwrap_or_else(|| UserId::new("anonymous"))
}

/// Backend double that counts every remote call and returns inert values.
#[derive(Default)]
pub(crate) struct CountingService {
    calls: AtomicUsize,
}

impl CountingService {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BackendService for CountingService {
    async fn create_tweet(&self, caller: &Caller, content: &str) -> Result<Tweet, ServiceError> {
        self.record();
        Ok(dummy_tweet(0, content, caller_id(caller)))
    }

    async fn like_tweet(&self, caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError> {
        self.record();
        Ok(dummy_tweet(id, "", caller_id(caller)))
    }

    async fn retweet(&self, caller: &Caller, id: TweetId) -> Result<Tweet, ServiceError> {
        self.record();
        Ok(dummy_tweet(id, "", caller_id(caller)))
    }

    async fn follow_user(&self, _: &Caller, _: &UserId) -> Result<(), ServiceError> {
        self.record();
        Ok(())
    }

    async fn get_all_tweets(&self, _: &Caller) -> Result<Vec<Tweet>, ServiceError> {
        self.record();
        Ok(vec![])
    }

    async fn get_user_feed(&self, _: &Caller, _: &UserId) -> Result<Vec<Tweet>, ServiceError> {
        self.record();
        Ok(vec![])
    }

    async fn get_user_profile(
        &self,
        _: &Caller,
        _: &UserId,
    ) -> Result<ProfileLookup, ServiceError> {
        self.record();
        Ok(ProfileLookup::NotFound)
    }

    async fn update_user_profile(
        &self,
        caller: &Caller,
        username: &str,
        bio: &str,
    ) -> Result<UserProfile, ServiceError> {
        self.record();
        let mut profile = UserProfile::empty(caller_id(caller));
        profile.username = username.to_string();
        profile.bio = bio.to_string();
        Ok(profile)
    }
}

struct StaticConnector {
    service: Arc<dyn BackendService>,
}

impl Connector for StaticConnector {
    fn connect(&self, _: &Endpoint) -> Result<Arc<dyn BackendService>, ConfigError> {
        Ok(Arc::clone(&self.service))
    }
}

/// A factory over a counting backend double, plus the double itself.
pub(crate) fn counting_factory() -> (HandleFactory, Arc<CountingService>) {
    let service = Arc::new(CountingService::default());
    let connector =
        Arc::new(StaticConnector { service: Arc::clone(&service) as Arc<dyn BackendService> });
    let factory = HandleFactory::new("loop://backend:1", connector)
        .unwrap_or_else(|e| unreachable!("static endpoint is well-formed: {e}"));
    (factory, service)
}
