//! Mock backends served by the lifecycle manager.
//!
//! A [`BackendProvider`] turns a service name into an axum application and
//! exposes the regional [`MockBackend`] instances behind it so they can be
//! reset between tests. [`InMemoryProvider`] is the stock implementation.

mod error;
mod memory;
mod provider;
mod router;

pub use error::BackendError;
pub use memory::{
    InMemoryProvider, RegionBackend, RegionSnapshot, ServiceBackends,
    ServiceSnapshot,
};
pub use provider::{BackendProvider, MockBackend, reset_service};
pub use router::{PROBE_PATH, build_router};
