use std::time::Duration;

#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Cannot start mock service {service}: not reachable within {timeout:?}")]
    StartupTimeout { service: String, timeout: Duration },
    #[error("Cannot start mock service {service}: worker exited before it became ready")]
    WorkerExited { service: String },
    #[error("Failed to reserve a local port: {0}")]
    PortReservation(#[source] std::io::Error),
    #[error("Failed to spawn worker for {service}: {source}")]
    Spawn {
        service: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to build probe client: {0}")]
    ProbeClient(#[from] reqwest::Error),
    #[error("Release of {0} without an outstanding acquisition")]
    ReleaseUnderflow(String),
    #[error("Worker for {0} panicked")]
    WorkerPanicked(String),
}

impl ServiceError {
    /// Whether the error comes from a failed startup of the named service.
    pub fn is_startup_failure(&self) -> bool {
        matches!(
            self,
            ServiceError::StartupTimeout { .. }
                | ServiceError::WorkerExited { .. }
        )
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("Failed to build worker runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serve loop failed: {0}")]
    Serve(#[source] std::io::Error),
}
