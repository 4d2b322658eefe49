#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use mocksvc::{InMemoryProvider, LifecycleConfig, ServiceRegistry};
use mocksvc_test_utils::net::{endpoint_addr, wait_until_refused};

pub fn quick_config() -> LifecycleConfig {
    LifecycleConfig {
        probe_interval_ms: 20,
        ..Default::default()
    }
}

pub fn registry() -> ServiceRegistry {
    ServiceRegistry::new(Arc::new(InMemoryProvider::new()), quick_config())
}

pub fn registry_with(
    provider: InMemoryProvider,
    config: LifecycleConfig,
) -> ServiceRegistry {
    ServiceRegistry::new(Arc::new(provider), config)
}

pub fn get_status(url: &str) -> reqwest::Result<u16> {
    reqwest::blocking::get(url).map(|r| r.status().as_u16())
}

/// The endpoint stops accepting connections shortly after release.
pub fn assert_closed(endpoint_url: &str) {
    let addr = endpoint_addr(endpoint_url).unwrap();
    assert!(
        wait_until_refused(addr, Duration::from_secs(2)),
        "{endpoint_url} still accepting connections"
    );
    let err = get_status(&format!("{endpoint_url}/static")).unwrap_err();
    assert!(err.is_connect(), "unexpected error: {err}");
}
