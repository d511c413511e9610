//! Murmur client.
//!
//! Session and feed synchronization layer for a decentralized
//! micro-blogging service. The backend owns all durable state; this crate
//! establishes an authenticated identity, binds it to a callable service
//! handle, keeps a wholesale-replaced feed snapshot and the current user's
//! profile in sync, and applies mutations with a refresh-after-write
//! consistency policy.
//!
//! ## Architecture
//!
//! ```text
//! murmur-client
//!   ├─ SessionController   (identity lifecycle, handle ownership)
//!   ├─ FeedSynchronizer    (snapshot/profile refresh, stale-result drop)
//!   ├─ MutationDispatcher  (precondition checks, refresh-after-write)
//!   └─ Client              (facade wiring the three together)
//! ```
//!
//! Data flows one way: gateway → session → handle → synchronizer/dispatcher
//! → presentation. The presentation layer only emits intents back in
//! through [`Client`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod dispatch;
mod error;
mod feed;
mod session;
#[cfg(test)]
mod testutil;

pub use client::Client;
pub use dispatch::MutationDispatcher;
pub use error::ClientError;
pub use feed::FeedSynchronizer;
pub use murmur_core::{
    handle::{ConfigError, Connector, Endpoint, HandleFactory, ServiceHandle},
    identity::{Caller, GatewayError, Identity, IdentityGateway},
    service::{BackendService, ServiceError},
};
pub use session::{SessionController, SessionPhase};
