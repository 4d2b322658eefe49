use std::fmt;
use std::sync::Arc;

use mocksvc_backend::reset_service;
use tracing::warn;

use crate::error::ServiceError;
use crate::registry::{ServiceRegistry, Slot};

/// Lifecycle of one running mock service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Idle,
    Starting,
    Ready,
    Stopping,
    Stopped,
}

/// One outstanding acquisition of a mock service.
///
/// Handles are move-only: each is released exactly once, either through
/// [`ServiceHandle::release`] or when it is dropped. All handles of the same
/// service share one running instance and one endpoint.
pub struct ServiceHandle {
    registry: ServiceRegistry,
    slot: Arc<Slot>,
    port: u16,
    endpoint_url: String,
    released: bool,
}

impl ServiceHandle {
    pub(crate) fn new(
        registry: ServiceRegistry,
        slot: Arc<Slot>,
        port: u16,
        endpoint_url: String,
    ) -> Self {
        Self {
            registry,
            slot,
            port,
            endpoint_url,
            released: false,
        }
    }

    pub fn service_name(&self) -> &str {
        self.slot.service()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Full URL of `path` on this service.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint_url, path)
    }

    pub fn ref_count(&self) -> usize {
        self.slot.ref_count()
    }

    pub fn state(&self) -> ServiceState {
        self.slot.state()
    }

    /// Clear the state of every regional backend of this service. The
    /// listener keeps running.
    pub fn reset(&self) {
        reset_service(self.registry.provider().as_ref(), self.service_name());
    }

    /// Give back this acquisition. The last release of a service stops its
    /// worker and blocks until the worker thread has exited.
    pub fn release(mut self) -> Result<(), ServiceError> {
        self.released = true;
        self.registry.release_slot(&self.slot)
    }
}

impl Drop for ServiceHandle {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.registry.release_slot(&self.slot) {
            warn!(
                service = self.slot.service(),
                error = %e,
                "release on drop failed"
            );
        }
    }
}

impl fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("service", &self.slot.service())
            .field("endpoint_url", &self.endpoint_url)
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
impl ServiceHandle {
    pub(crate) fn slot_for_test(&self) -> Arc<Slot> {
        self.slot.clone()
    }
}
