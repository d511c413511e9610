//! Scriptable identity provider for tests.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use murmur_core::identity::{GatewayError, Identity, IdentityGateway};
use tokio::sync::Notify;

/// Releases logins held by [`ScriptedGateway::hold_logins`].
pub struct LoginGate {
    notify: Arc<Notify>,
}

impl LoginGate {
    /// Let one held login complete.
    ///
    /// Stores a permit, so releasing before the login arrives also works.
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// An identity gateway whose answers are scripted up front.
///
/// `login` resolves immediately with whatever the script says; the
/// interactive redirect is modeled as the suspension point itself, not as
/// wall-clock delay. [`Self::hold_logins`] keeps that suspension open so a
/// test can observe the client mid-redirect.
pub struct ScriptedGateway {
    current: Mutex<Option<Identity>>,
    next_login: Mutex<Result<Identity, String>>,
    login_gate: Mutex<Option<Arc<Notify>>>,
    logouts: AtomicUsize,
}

impl ScriptedGateway {
    /// A gateway with no existing session; `login` yields `principal`.
    pub fn logged_out(principal: &str) -> Self {
        Self {
            current: Mutex::new(None),
            next_login: Mutex::new(Ok(Identity::new(principal))),
            login_gate: Mutex::new(None),
            logouts: AtomicUsize::new(0),
        }
    }

    /// A gateway holding an already-authenticated session for `principal`.
    pub fn pre_authenticated(principal: &str) -> Self {
        let identity = Identity::new(principal);
        Self {
            current: Mutex::new(Some(identity.clone())),
            next_login: Mutex::new(Ok(identity)),
            login_gate: Mutex::new(None),
            logouts: AtomicUsize::new(0),
        }
    }

    /// A gateway whose next login fails with `reason`.
    pub fn login_fails(reason: &str) -> Self {
        Self {
            current: Mutex::new(None),
            next_login: Mutex::new(Err(reason.to_string())),
            login_gate: Mutex::new(None),
            logouts: AtomicUsize::new(0),
        }
    }

    /// Hold logins mid-redirect until the returned gate is released.
    pub fn hold_logins(&self) -> LoginGate {
        let notify = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&notify));
        LoginGate { notify }
    }

    /// Script the outcome of the next login.
    pub fn set_next_login(&self, outcome: Result<Identity, String>) {
        *self.next_login.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Number of provider-side logouts observed.
    pub fn logout_count(&self) -> usize {
        self.logouts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityGateway for ScriptedGateway {
    async fn current_identity(&self) -> Result<Option<Identity>, GatewayError> {
        Ok(self.current.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn login(&self) -> Result<Identity, GatewayError> {
        let gate = self.login_gate.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(notify) = gate {
            notify.notified().await;
        }

        let scripted = self.next_login.lock().unwrap_or_else(PoisonError::into_inner).clone();
        match scripted {
            Ok(identity) => {
                *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
                    Some(identity.clone());
                Ok(identity)
            },
            Err(reason) => Err(GatewayError::LoginFailed { reason }),
        }
    }

    async fn logout(&self) -> Result<(), GatewayError> {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_establishes_current_identity() {
        let gateway = ScriptedGateway::logged_out("alice");
        assert!(gateway.current_identity().await.unwrap().is_none());

        let identity = gateway.login().await.unwrap();
        assert_eq!(identity.principal(), "alice");
        assert_eq!(gateway.current_identity().await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn failed_login_leaves_no_session() {
        let gateway = ScriptedGateway::login_fails("user cancelled");
        assert!(gateway.login().await.is_err());
        assert!(gateway.current_identity().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn gated_login_waits_for_release() {
        let gateway = Arc::new(ScriptedGateway::logged_out("alice"));
        let gate = gateway.hold_logins();

        let login = {
            let gateway = Arc::clone(&gateway);
            tokio::spawn(async move { gateway.login().await })
        };

        tokio::task::yield_now().await;
        assert!(!login.is_finished());

        gate.release();
        assert!(login.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn logout_clears_session_and_counts() {
        let gateway = ScriptedGateway::pre_authenticated("alice");
        gateway.logout().await.unwrap();

        assert!(gateway.current_identity().await.unwrap().is_none());
        assert_eq!(gateway.logout_count(), 1);
    }
}
