//! Session controller state machine.
//!
//! Owns the current identity and the current service handle, and decides
//! when the handle must be rebuilt. The state is an explicit value behind
//! one lock, never ambient globals; every transition into or out of
//! `Authenticated` bumps a generation counter, which is how late-arriving
//! results from a replaced handle are recognized downstream.
//!
//! Login is a suspension point: `login()` suspends on the gateway's
//! interactive redirect and resumes with success or failure, so the
//! `Authenticating` → `Authenticated`/`Unauthenticated` transition is one
//! linear control-flow path.

use std::sync::Arc;

use murmur_core::{
    handle::{HandleFactory, ServiceHandle},
    identity::{Caller, Identity, IdentityGateway},
};
use tokio::sync::Mutex;

use crate::error::ClientError;

/// Observable session phase, for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No identity; write actions must be disabled.
    Unauthenticated,
    /// Interactive login in flight.
    Authenticating,
    /// Identity established and handle bound.
    Authenticated,
}

/// The session state proper.
///
/// `Authenticated` is the only state holding a handle, and that handle is
/// always bound to the identity stored next to it.
enum Slot {
    Unauthenticated,
    Authenticating,
    Authenticated { identity: Identity, handle: ServiceHandle },
}

impl Slot {
    fn phase(&self) -> SessionPhase {
        match self {
            Self::Unauthenticated => SessionPhase::Unauthenticated,
            Self::Authenticating => SessionPhase::Authenticating,
            Self::Authenticated { .. } => SessionPhase::Authenticated,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated { .. } => "authenticated",
        }
    }
}

struct Inner {
    slot: Slot,
    /// Bumped on every transition into or out of `Authenticated`.
    generation: u64,
    initialized: bool,
}

/// Orchestrates login/logout and owns the current service handle.
pub struct SessionController {
    gateway: Arc<dyn IdentityGateway>,
    factory: HandleFactory,
    inner: Mutex<Inner>,
}

impl SessionController {
    /// Create a controller in the unauthenticated state.
    pub fn new(gateway: Arc<dyn IdentityGateway>, factory: HandleFactory) -> Self {
        Self {
            gateway,
            factory,
            inner: Mutex::new(Inner {
                slot: Slot::Unauthenticated,
                generation: 0,
                initialized: false,
            }),
        }
    }

    /// Resume an existing provider session, if one exists.
    ///
    /// Called exactly once at startup. When the gateway already holds an
    /// authenticated identity the session goes straight to `Authenticated`
    /// (skipping `Authenticating`) and a fresh handle is bound.
    ///
    /// # Errors
    ///
    /// - [`ClientError::InvalidTransition`] on a second call
    /// - [`ClientError::Gateway`] when the gateway query fails (the session
    ///   stays unauthenticated)
    /// - [`ClientError::Config`] when handle construction fails (fatal)
    pub async fn initialize(&self) -> Result<SessionPhase, ClientError> {
        {
            let mut inner = self.inner.lock().await;
            if inner.initialized {
                return Err(ClientError::InvalidTransition {
                    operation: "initialize",
                    state: "initialized",
                });
            }
            inner.initialized = true;
        }

        match self.gateway.current_identity().await {
            Ok(Some(identity)) => {
                let mut inner = self.inner.lock().await;
                inner.generation += 1;
                let handle =
                    self.factory.bind(Caller::Authenticated(identity.clone()), inner.generation)?;
                inner.slot = Slot::Authenticated { identity, handle };
                tracing::info!(generation = inner.generation, "resumed authenticated session");
                Ok(SessionPhase::Authenticated)
            },
            Ok(None) => {
                tracing::info!("no existing session");
                Ok(SessionPhase::Unauthenticated)
            },
            Err(e) => {
                tracing::warn!(error = %e, "identity query failed");
                Err(e.into())
            },
        }
    }

    /// Run the interactive login flow.
    ///
    /// Valid only from `Unauthenticated`. Suspends until the gateway
    /// redirect completes; on success a new handle is bound to exactly the
    /// freshly obtained identity. On gateway failure or cancellation the
    /// session returns to `Unauthenticated` and the failure is reported
    /// (non-fatal).
    pub async fn login(&self) -> Result<Identity, ClientError> {
        {
            let mut inner = self.inner.lock().await;
            if !matches!(inner.slot, Slot::Unauthenticated) {
                return Err(ClientError::InvalidTransition {
                    operation: "login",
                    state: inner.slot.name(),
                });
            }
            inner.slot = Slot::Authenticating;
            tracing::info!("login started");
        }

        match self.gateway.login().await {
            Ok(identity) => {
                let mut inner = self.inner.lock().await;
                inner.generation += 1;
                match self.factory.bind(Caller::Authenticated(identity.clone()), inner.generation)
                {
                    Ok(handle) => {
                        inner.slot = Slot::Authenticated { identity: identity.clone(), handle };
                        tracing::info!(generation = inner.generation, "login completed");
                        Ok(identity)
                    },
                    Err(e) => {
                        inner.slot = Slot::Unauthenticated;
                        Err(e.into())
                    },
                }
            },
            Err(e) => {
                let mut inner = self.inner.lock().await;
                inner.slot = Slot::Unauthenticated;
                tracing::warn!(error = %e, "login failed");
                Err(e.into())
            },
        }
    }

    /// End the session locally: invalidate the handle and bump the
    /// generation so in-flight results are dropped when they resolve.
    ///
    /// Valid only from `Authenticated`. In-flight calls are not cancelled.
    pub async fn begin_logout(&self) -> Result<(), ClientError> {
        let mut inner = self.inner.lock().await;
        if !matches!(inner.slot, Slot::Authenticated { .. }) {
            return Err(ClientError::InvalidTransition {
                operation: "logout",
                state: inner.slot.name(),
            });
        }
        inner.generation += 1;
        inner.slot = Slot::Unauthenticated;
        tracing::info!(generation = inner.generation, "session ended locally");
        Ok(())
    }

    /// Ask the gateway to end the provider-side session.
    ///
    /// Runs after [`Self::begin_logout`]; a gateway failure here is
    /// reported but the local session is already unauthenticated.
    pub async fn finish_logout(&self) -> Result<(), ClientError> {
        self.gateway.logout().await.map_err(|e| {
            tracing::warn!(error = %e, "gateway logout failed");
            ClientError::from(e)
        })
    }

    /// The current observable phase.
    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.slot.phase()
    }

    /// The current session generation.
    pub async fn generation(&self) -> u64 {
        self.inner.lock().await.generation
    }

    /// The current identity, if authenticated.
    pub async fn identity(&self) -> Option<Identity> {
        match &self.inner.lock().await.slot {
            Slot::Authenticated { identity, .. } => Some(identity.clone()),
            _ => None,
        }
    }

    /// The current handle, for an operation requiring authentication.
    ///
    /// # Errors
    ///
    /// [`ClientError::NotAuthenticated`] in any other state; no remote call
    /// is issued.
    pub async fn authenticated_handle(
        &self,
        operation: &'static str,
    ) -> Result<ServiceHandle, ClientError> {
        match &self.inner.lock().await.slot {
            Slot::Authenticated { handle, .. } => Ok(handle.clone()),
            _ => Err(ClientError::NotAuthenticated { operation }),
        }
    }

    /// A handle for public reads: the authenticated handle when one exists,
    /// otherwise an anonymous handle stamped with the current generation.
    pub async fn read_handle(&self) -> Result<ServiceHandle, ClientError> {
        let inner = self.inner.lock().await;
        if let Slot::Authenticated { handle, .. } = &inner.slot {
            return Ok(handle.clone());
        }
        Ok(self.factory.bind(Caller::Anonymous, inner.generation)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use murmur_core::identity::GatewayError;

    use super::*;
    use crate::testutil::{CountingService, FakeGateway, counting_factory};

    #[tokio::test]
    async fn initialize_without_existing_session_stays_unauthenticated() {
        let gateway = Arc::new(FakeGateway::logged_out());
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        assert_eq!(session.initialize().await.unwrap(), SessionPhase::Unauthenticated);
        assert_eq!(session.phase().await, SessionPhase::Unauthenticated);
        assert!(session.identity().await.is_none());
    }

    #[tokio::test]
    async fn initialize_resumes_existing_session() {
        let gateway = Arc::new(FakeGateway::pre_authenticated("alice"));
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        assert_eq!(session.initialize().await.unwrap(), SessionPhase::Authenticated);

        let identity = session.identity().await.unwrap();
        assert_eq!(identity.principal(), "alice");

        // Handle is bound to exactly the resumed identity.
        let handle = session.authenticated_handle("test").await.unwrap();
        assert_eq!(handle.caller().identity(), Some(&identity));
    }

    #[tokio::test]
    async fn initialize_twice_is_rejected() {
        let gateway = Arc::new(FakeGateway::logged_out());
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        session.initialize().await.unwrap();
        assert!(matches!(
            session.initialize().await,
            Err(ClientError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn login_binds_handle_to_fresh_identity() {
        let gateway = Arc::new(FakeGateway::login_succeeds("bob"));
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        let before = session.generation().await;
        let identity = session.login().await.unwrap();
        assert_eq!(identity.principal(), "bob");
        assert_eq!(session.phase().await, SessionPhase::Authenticated);
        assert!(session.generation().await > before);

        let handle = session.authenticated_handle("test").await.unwrap();
        assert_eq!(handle.caller().identity(), Some(&identity));
        assert_eq!(handle.generation(), session.generation().await);
    }

    #[tokio::test]
    async fn failed_login_returns_to_unauthenticated() {
        let gateway = Arc::new(FakeGateway::login_fails("user cancelled"));
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        let result = session.login().await;
        assert!(matches!(result, Err(ClientError::Gateway(GatewayError::LoginFailed { .. }))));
        assert_eq!(session.phase().await, SessionPhase::Unauthenticated);
        assert!(session.authenticated_handle("test").await.is_err());
    }

    #[tokio::test]
    async fn login_while_authenticated_is_rejected() {
        let gateway = Arc::new(FakeGateway::login_succeeds("bob"));
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        session.login().await.unwrap();
        assert!(matches!(
            session.login().await,
            Err(ClientError::InvalidTransition { operation: "login", .. })
        ));
    }

    #[tokio::test]
    async fn logout_invalidates_handle_and_bumps_generation() {
        let gateway = Arc::new(FakeGateway::login_succeeds("bob"));
        let (factory, _service) = counting_factory();
        let session = SessionController::new(Arc::clone(&gateway) as Arc<dyn IdentityGateway>, factory);

        session.login().await.unwrap();
        let authed_generation = session.generation().await;

        session.begin_logout().await.unwrap();
        session.finish_logout().await.unwrap();

        assert_eq!(session.phase().await, SessionPhase::Unauthenticated);
        assert!(session.generation().await > authed_generation);
        assert!(session.authenticated_handle("test").await.is_err());
        assert_eq!(gateway.logout_count(), 1);
    }

    #[tokio::test]
    async fn logout_while_unauthenticated_is_rejected() {
        let gateway = Arc::new(FakeGateway::logged_out());
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        assert!(matches!(
            session.begin_logout().await,
            Err(ClientError::InvalidTransition { operation: "logout", .. })
        ));
    }

    #[tokio::test]
    async fn read_handle_is_anonymous_when_unauthenticated() {
        let gateway = Arc::new(FakeGateway::logged_out());
        let (factory, _service) = counting_factory();
        let session = SessionController::new(gateway, factory);

        let handle = session.read_handle().await.unwrap();
        assert!(handle.caller().identity().is_none());
    }

    #[tokio::test]
    async fn relogin_binds_new_identity_never_stale_one() {
        let gateway = Arc::new(FakeGateway::login_succeeds("carol"));
        let (factory, service) = counting_factory();
        let session = SessionController::new(Arc::clone(&gateway) as Arc<dyn IdentityGateway>, factory);

        session.login().await.unwrap();
        session.begin_logout().await.unwrap();

        gateway.set_next_login("dave");
        session.login().await.unwrap();

        let handle = session.authenticated_handle("test").await.unwrap();
        assert_eq!(handle.caller().identity().map(Identity::principal), Some("dave"));
        let _ = service; // service unused beyond wiring
    }

    #[test]
    fn counting_service_starts_quiet() {
        let service = CountingService::default();
        assert_eq!(service.calls(), 0);
    }
}
