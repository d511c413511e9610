//! Test harness for the Murmur client.
//!
//! Provides the collaborators the client is verified against:
//!
//! - [`TestEnv`]: virtual clock and seeded RNG, so every run is
//!   reproducible.
//! - [`ModelBackend`]: in-memory oracle implementing the backend's
//!   authoritative rules, with transport fault injection and a gate for
//!   holding profile reads open.
//! - [`ScriptedGateway`]: identity provider whose login outcomes are
//!   scripted up front.
//! - [`WireService`] / [`LoopbackConnector`]: in-process transport that
//!   pushes every call through the real CBOR codec.
//!
//! The integration and property suites under `tests/` wire these into a
//! full [`murmur_client::Client`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backend;
pub mod env;
pub mod gateway;
pub mod wire;

pub use backend::{ModelBackend, Op, ProfileGate};
pub use env::TestEnv;
pub use gateway::{LoginGate, ScriptedGateway};
pub use wire::{LOOPBACK_SCHEME, LoopbackConnector, WireService};

use std::sync::Arc;

use murmur_client::Client;
use murmur_core::{handle::Connector, identity::IdentityGateway, service::BackendService};

/// Endpoint address the loopback connector accepts.
pub const LOOPBACK_ENDPOINT: &str = "loop://backend:1";

/// A client wired to a fresh model backend over the loopback transport.
///
/// The gateway decides whether the client starts with a resumable session.
///
/// # Panics
///
/// Panics when the loopback endpoint constant is rejected, which would be a
/// harness bug.
pub fn loopback_client(
    gateway: Arc<dyn IdentityGateway>,
) -> (Client, Arc<ModelBackend<TestEnv>>) {
    let backend = Arc::new(ModelBackend::new(TestEnv::new()));
    let connector: Arc<dyn Connector> =
        Arc::new(LoopbackConnector::new(Arc::clone(&backend) as Arc<dyn BackendService>));

    #[allow(clippy::expect_used)]
    let client = Client::new(gateway, connector, LOOPBACK_ENDPOINT)
        .expect("loopback endpoint is well-formed");
    (client, backend)
}
