use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use envconfig::Envconfig;
use mocksvc_backend::{BackendProvider, InMemoryProvider};
use tracing::{debug, info, warn};

use crate::conf::LifecycleConfig;
use crate::error::ServiceError;
use crate::handle::{ServiceHandle, ServiceState};
use crate::port::{PortSource, ReservationSlot};
use crate::probe::{Probe, Readiness, wait_until_ready};
use crate::worker::Worker;

/// Running instance behind a slot.
struct Instance {
    port: u16,
    endpoint_url: String,
    reservation: ReservationSlot,
    worker: Worker,
}

struct SlotInner {
    state: ServiceState,
    /// Set once the slot has been stopped or failed to start; acquirers
    /// holding a stale `Arc` look the name up again.
    retired: bool,
    instance: Option<Instance>,
}

/// Registry entry for one service name. Its mutex serializes ref-count
/// changes and the start/stop decision for that name.
pub(crate) struct Slot {
    service: String,
    /// Written only under `inner`; read without it so introspection never
    /// waits on a startup or shutdown in progress.
    ref_count: AtomicUsize,
    inner: Mutex<SlotInner>,
}

impl Slot {
    fn new(service: &str) -> Self {
        Self {
            service: service.to_string(),
            ref_count: AtomicUsize::new(0),
            inner: Mutex::new(SlotInner {
                state: ServiceState::Idle,
                retired: false,
                instance: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ServiceState {
        self.lock().state
    }
}

struct RegistryInner {
    provider: Arc<dyn BackendProvider>,
    config: LifecycleConfig,
    services: Mutex<HashMap<String, Arc<Slot>>>,
}

/// Reference-counted set of running mock services, one per name.
///
/// Create one per test session and share it by cloning. All calls block the
/// current thread; from async code run them through
/// `tokio::task::spawn_blocking`.
///
/// Locking: a slot's mutex may be held while taking the registry map lock,
/// never the other way round.
#[derive(Clone)]
pub struct ServiceRegistry {
    inner: Arc<RegistryInner>,
}

impl ServiceRegistry {
    pub fn new(
        provider: Arc<dyn BackendProvider>,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                provider,
                config,
                services: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Registry over a fresh [`InMemoryProvider`] with default settings.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryProvider::new()), LifecycleConfig::default())
    }

    /// Registry over a fresh [`InMemoryProvider`] configured from the
    /// environment.
    pub fn from_env() -> Result<Self, envconfig::Error> {
        let config = LifecycleConfig::init_from_env()?;
        Ok(Self::new(Arc::new(InMemoryProvider::new()), config))
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.inner.config
    }

    pub fn provider(&self) -> &Arc<dyn BackendProvider> {
        &self.inner.provider
    }

    fn services(&self) -> MutexGuard<'_, HashMap<String, Arc<Slot>>> {
        self.inner
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn slot_for(&self, service_name: &str) -> Arc<Slot> {
        self.services()
            .entry(service_name.to_string())
            .or_insert_with(|| Arc::new(Slot::new(service_name)))
            .clone()
    }

    fn existing_slot(&self, service_name: &str) -> Option<Arc<Slot>> {
        self.services().get(service_name).cloned()
    }

    fn remove_slot(&self, slot: &Arc<Slot>) {
        let mut services = self.services();
        if services
            .get(slot.service())
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            services.remove(slot.service());
        }
    }

    /// Get a handle to the running instance of `service_name`, starting it
    /// first if nobody holds it. `port` pins the listening port of a new
    /// instance; a running instance keeps the port it has.
    ///
    /// Never returns before the endpoint has answered a probe.
    pub fn acquire(
        &self,
        service_name: &str,
        port: Option<u16>,
    ) -> Result<ServiceHandle, ServiceError> {
        loop {
            let slot = self.slot_for(service_name);
            let mut inner = slot.lock();
            if inner.retired {
                continue;
            }
            let running = inner
                .instance
                .as_ref()
                .map(|i| (i.port, i.endpoint_url.clone()));
            let (bound_port, endpoint_url) = match running {
                Some(ids) => ids,
                None => {
                    inner.state = ServiceState::Starting;
                    match self.start(service_name, port) {
                        Ok(instance) => {
                            let ids =
                                (instance.port, instance.endpoint_url.clone());
                            inner.instance = Some(instance);
                            inner.state = ServiceState::Ready;
                            ids
                        }
                        Err(e) => {
                            inner.state = ServiceState::Stopped;
                            inner.retired = true;
                            self.remove_slot(&slot);
                            return Err(e);
                        }
                    }
                }
            };
            let ref_count = slot.ref_count.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(service = service_name, ref_count, "acquired mock service");
            return Ok(ServiceHandle::new(
                self.clone(),
                slot.clone(),
                bound_port,
                endpoint_url,
            ));
        }
    }

    fn start(
        &self,
        service_name: &str,
        fixed_port: Option<u16>,
    ) -> Result<Instance, ServiceError> {
        let config = &self.inner.config;
        let source = PortSource::allocate(&config.host, fixed_port)
            .map_err(ServiceError::PortReservation)?;
        let port = source.port();
        let reservation = source.into_slot();
        let endpoint_url = config.endpoint_url(port);
        let probe = Probe::new(
            format!("{endpoint_url}{}", config.probe_path),
            config.probe_timeout(),
        )?;
        let app = self.inner.provider.app(service_name);
        let mut worker = Worker::spawn(
            service_name,
            app,
            &config.host,
            port,
            reservation.clone(),
        )?;

        let readiness = wait_until_ready(
            &probe,
            || worker.is_finished(),
            config.startup_timeout(),
            config.probe_interval(),
        );
        match readiness {
            Readiness::Ready { attempts, status } => {
                info!(
                    service = service_name,
                    endpoint = %endpoint_url,
                    attempts,
                    status = status.as_u16(),
                    "mock service ready"
                );
                Ok(Instance {
                    port,
                    endpoint_url,
                    reservation,
                    worker,
                })
            }
            Readiness::WorkerExited { attempts } => {
                warn!(
                    service = service_name,
                    attempts,
                    "worker exited during startup"
                );
                abandon_start(service_name, &reservation, &mut worker);
                Err(ServiceError::WorkerExited {
                    service: service_name.to_string(),
                })
            }
            Readiness::TimedOut { attempts } => {
                warn!(
                    service = service_name,
                    attempts,
                    "mock service never became ready"
                );
                abandon_start(service_name, &reservation, &mut worker);
                Err(ServiceError::StartupTimeout {
                    service: service_name.to_string(),
                    timeout: config.startup_timeout(),
                })
            }
        }
    }

    /// Release `handle`; same as [`ServiceHandle::release`].
    pub fn release(&self, handle: ServiceHandle) -> Result<(), ServiceError> {
        handle.release()
    }

    pub(crate) fn release_slot(
        &self,
        slot: &Arc<Slot>,
    ) -> Result<(), ServiceError> {
        let mut inner = slot.lock();
        if slot.ref_count() == 0 {
            return Err(ServiceError::ReleaseUnderflow(
                slot.service().to_string(),
            ));
        }
        let ref_count = slot.ref_count.fetch_sub(1, Ordering::SeqCst) - 1;
        // the reservation only matters for the first start; close it on any
        // release, independent of teardown
        if let Some(instance) = inner.instance.as_ref() {
            instance.reservation.release();
        }
        if ref_count > 0 {
            debug!(
                service = slot.service(),
                ref_count,
                "released mock service"
            );
            return Ok(());
        }

        inner.retired = true;
        inner.state = ServiceState::Stopping;
        let result = match inner.instance.take() {
            Some(mut instance) => instance.worker.stop(),
            None => Ok(()),
        };
        inner.state = ServiceState::Stopped;
        self.remove_slot(slot);
        info!(service = slot.service(), "mock service shut down");
        result
    }

    /// Acquire `service_name`, run `f` with the handle, and release on every
    /// exit path. A panic in `f` releases during unwinding and then
    /// continues.
    pub fn run_scoped<F, R>(
        &self,
        service_name: &str,
        port: Option<u16>,
        f: F,
    ) -> Result<R, ServiceError>
    where
        F: FnOnce(&ServiceHandle) -> R,
    {
        let handle = self.acquire(service_name, port)?;
        let result = f(&handle);
        handle.release()?;
        Ok(result)
    }

    /// Outstanding acquisitions of `service_name`; 0 when not running.
    pub fn ref_count(&self, service_name: &str) -> usize {
        self.existing_slot(service_name)
            .map(|slot| slot.ref_count())
            .unwrap_or(0)
    }

    pub fn is_active(&self, service_name: &str) -> bool {
        self.ref_count(service_name) > 0
    }

    /// Names of services with at least one outstanding acquisition, sorted.
    pub fn active_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services()
            .values()
            .filter(|slot| slot.ref_count() > 0)
            .map(|slot| slot.service().to_string())
            .collect();
        names.sort();
        names
    }
}

/// Tear down a worker that never became ready. Cleanup failures are only
/// logged; the caller reports the startup failure.
fn abandon_start(
    service_name: &str,
    reservation: &ReservationSlot,
    worker: &mut Worker,
) {
    reservation.release();
    if let Err(e) = worker.stop() {
        warn!(
            service = service_name,
            error = %e,
            "cleanup after failed start failed"
        );
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("config", &self.inner.config)
            .field("active", &self.active_services())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_registry() -> ServiceRegistry {
        let config = LifecycleConfig {
            startup_timeout_ms: 5_000,
            probe_interval_ms: 20,
            ..Default::default()
        };
        ServiceRegistry::new(Arc::new(InMemoryProvider::new()), config)
    }

    #[test]
    fn releasing_an_idle_slot_is_an_underflow() {
        let registry = quick_registry();
        let slot = Arc::new(Slot::new("widgets"));
        let err = registry.release_slot(&slot).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::ReleaseUnderflow(ref s) if s == "widgets"
        ));
    }

    #[test]
    fn extra_release_after_teardown_is_an_underflow() {
        let registry = quick_registry();
        let handle = registry.acquire("widgets", None).unwrap();
        let slot = handle.slot_for_test();
        handle.release().unwrap();
        assert_eq!(slot.state(), ServiceState::Stopped);
        assert!(matches!(
            registry.release_slot(&slot),
            Err(ServiceError::ReleaseUnderflow(_))
        ));
        assert!(!registry.is_active("widgets"));
    }

    #[test]
    fn failed_start_cleanup_survives_a_panicked_worker() {
        let (_, reservation) = {
            let source = PortSource::allocate("127.0.0.1", None).unwrap();
            (source.port(), source.into_slot())
        };
        let mut worker = Worker::from_thread(
            "widgets",
            std::thread::spawn(|| -> Result<(), crate::error::WorkerError> {
                panic!("worker blew up")
            }),
        );
        while !worker.is_finished() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        abandon_start("widgets", &reservation, &mut worker);
        assert!(!reservation.is_held());
        assert!(worker.stop().is_ok());
    }

    #[test]
    fn reservation_is_closed_once_the_worker_binds() {
        let registry = quick_registry();
        let handle = registry.acquire("widgets", None).unwrap();
        let slot = handle.slot_for_test();
        {
            let inner = slot.lock();
            let instance = inner.instance.as_ref().unwrap();
            assert!(!instance.reservation.is_held());
            assert!(!instance.worker.is_finished());
        }
        handle.release().unwrap();
    }
}
