use std::sync::Arc;

use clap::Parser;
use envconfig::Envconfig;
use mocksvc::telemetry::{TracingConfig, setup_tracing};
use mocksvc::{LifecycleConfig, ServiceRegistry};
use mocksvc_backend::InMemoryProvider;
use mocksvc_dev::{Config, Opts};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing(TracingConfig::from_env("mocksvc-server"))?;
    let conf = Config::init_from_env()?.merge(Opts::parse());
    let lifecycle = conf.lifecycle(LifecycleConfig::init_from_env()?);
    let registry =
        ServiceRegistry::new(Arc::new(InMemoryProvider::new()), lifecycle);

    let service = conf.service.clone();
    let port = conf.fixed_port();
    let starter = registry.clone();
    let handle = tokio::task::spawn_blocking(move || {
        starter.acquire(&service, port)
    })
    .await??;
    info!(
        service = handle.service_name(),
        endpoint = handle.endpoint_url(),
        "mock service running, press Ctrl+C to stop"
    );

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    tokio::task::spawn_blocking(move || handle.release()).await??;
    Ok(())
}
