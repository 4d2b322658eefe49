//! Reference-counted lifecycle manager for in-process mock HTTP services.
//!
//! ```no_run
//! use mocksvc::ServiceRegistry;
//!
//! let registry = ServiceRegistry::in_memory();
//! let handle = registry.acquire("widgets", None)?;
//! println!("widgets at {}", handle.endpoint_url());
//! handle.reset();
//! handle.release()?;
//! # Ok::<(), mocksvc::ServiceError>(())
//! ```
//!
//! The first acquisition of a name reserves a port, starts a worker thread
//! serving the backend from the registry's [`BackendProvider`] and waits for
//! it to answer a probe. Later acquisitions share that instance until the
//! last handle is released.

mod conf;
mod error;
mod handle;
mod port;
mod probe;
mod registry;
pub mod telemetry;
mod worker;

pub use conf::{
    CONNECT_TIMEOUT, DEBUGGER_CONNECT_TIMEOUT, DEFAULT_HOST, DEFAULT_PROBE_PATH,
    LifecycleConfig,
};
pub use error::{ServiceError, WorkerError};
pub use handle::{ServiceHandle, ServiceState};
pub use mocksvc_backend::{BackendProvider, InMemoryProvider, MockBackend};
pub use port::{PortReservation, PortSource, ReservationSlot};
pub use registry::ServiceRegistry;
