use std::sync::Arc;

use axum::Router;
use tracing::debug;

/// One regional instance of a mock service holding simulated state.
pub trait MockBackend: Send + Sync {
    /// Drop all simulated state and counters.
    fn reset(&self);
}

/// Produces the request-handling application for a service name and lists
/// the regional backends currently behind it.
pub trait BackendProvider: Send + Sync + 'static {
    fn app(&self, service_name: &str) -> Router;

    /// Regional backends that exist right now, keyed by region name. Must not
    /// create backends as a side effect.
    fn backends(
        &self,
        service_name: &str,
    ) -> Vec<(String, Arc<dyn MockBackend>)>;
}

/// Reset every regional backend of `service_name`. A service without any
/// regional state is left untouched.
pub fn reset_service(provider: &dyn BackendProvider, service_name: &str) {
    let backends = provider.backends(service_name);
    if backends.is_empty() {
        debug!(service = service_name, "reset: no regional backends");
        return;
    }
    for (region, backend) in backends {
        debug!(service = service_name, region = %region, "reset backend");
        backend.reset();
    }
}
