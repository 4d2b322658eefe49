use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::provider::{BackendProvider, MockBackend};
use crate::router::build_router;

/// Simulated state of one region: JSON resources by key plus a call counter.
#[derive(Debug, Default)]
pub struct RegionBackend {
    resources: DashMap<String, Value>,
    calls: AtomicU64,
}

impl RegionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_call(&self) -> u64 {
        self.calls.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.resources.get(key).map(|v| v.value().clone())
    }

    /// Returns `true` when the key did not exist before.
    pub fn put(&self, key: &str, value: Value) -> bool {
        self.resources.insert(key.to_string(), value).is_none()
    }

    pub fn delete(&self, key: &str) -> bool {
        self.resources.remove(key).is_some()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> =
            self.resources.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.calls() == 0
    }

    pub fn snapshot(&self) -> RegionSnapshot {
        RegionSnapshot {
            calls: self.calls(),
            resources: self
                .resources
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }
}

impl MockBackend for RegionBackend {
    fn reset(&self) {
        self.resources.clear();
        self.calls.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub calls: u64,
    pub resources: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub service: String,
    pub regions: BTreeMap<String, RegionSnapshot>,
}

/// All regional backends of one service name. Regions appear lazily the
/// first time a request addresses them.
#[derive(Debug)]
pub struct ServiceBackends {
    name: String,
    regions: DashMap<String, Arc<RegionBackend>>,
}

impl ServiceBackends {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            regions: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self, region: &str) -> Arc<RegionBackend> {
        self.regions
            .entry(region.to_string())
            .or_insert_with(|| Arc::new(RegionBackend::new()))
            .value()
            .clone()
    }

    pub fn regions(&self) -> Vec<(String, Arc<RegionBackend>)> {
        self.regions
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn reset_all(&self) {
        for (_, backend) in self.regions() {
            backend.reset();
        }
    }

    pub fn snapshot(&self) -> ServiceSnapshot {
        ServiceSnapshot {
            service: self.name.clone(),
            regions: self
                .regions()
                .into_iter()
                .map(|(region, backend)| (region, backend.snapshot()))
                .collect(),
        }
    }
}

/// Keeps every service's regional backends in memory for the life of the
/// provider. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    services: Arc<DashMap<String, Arc<ServiceBackends>>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(&self, service_name: &str) -> Arc<ServiceBackends> {
        self.services
            .entry(service_name.to_string())
            .or_insert_with(|| {
                info!(service = service_name, "create in-memory backends");
                Arc::new(ServiceBackends::new(service_name))
            })
            .value()
            .clone()
    }

    pub fn snapshot(&self, service_name: &str) -> Option<ServiceSnapshot> {
        self.services
            .get(service_name)
            .map(|s| s.value().snapshot())
    }
}

impl BackendProvider for InMemoryProvider {
    fn app(&self, service_name: &str) -> Router {
        build_router(self.service(service_name))
    }

    fn backends(
        &self,
        service_name: &str,
    ) -> Vec<(String, Arc<dyn MockBackend>)> {
        let Some(service) =
            self.services.get(service_name).map(|s| s.value().clone())
        else {
            return Vec::new();
        };
        service
            .regions()
            .into_iter()
            .map(|(region, backend)| {
                (region, backend as Arc<dyn MockBackend>)
            })
            .collect()
    }
}
