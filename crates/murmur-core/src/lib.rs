//! Murmur core abstractions.
//!
//! Runtime-agnostic seams between the session layer and the outside world:
//!
//! - [`env::Environment`]: time and randomness, swappable for deterministic
//!   tests.
//! - [`identity::IdentityGateway`]: the external identity provider that
//!   issues an authenticated [`identity::Identity`] after an interactive
//!   login.
//! - [`service::BackendService`]: the typed remote-procedure surface of the
//!   micro-blogging backend.
//! - [`handle::ServiceHandle`]: a capability binding one caller to one
//!   endpoint, through which all remote operations are invoked.
//!
//! Nothing here performs network I/O; concrete transports and test doubles
//! implement the traits.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod handle;
pub mod identity;
pub mod service;

pub use env::Environment;
pub use handle::{ConfigError, Connector, Endpoint, HandleFactory, ServiceHandle};
pub use identity::{Caller, GatewayError, Identity, IdentityGateway};
pub use service::{BackendService, ServiceError};
