use std::time::{Duration, Instant};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::debug;

/// Blocking HTTP GET against one URL. Idle connections are not pooled so a
/// probe never keeps the server's graceful shutdown waiting.
pub(crate) struct Probe {
    client: Client,
    url: String,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Readiness {
    Ready { attempts: u32, status: StatusCode },
    WorkerExited { attempts: u32 },
    TimedOut { attempts: u32 },
}

impl Probe {
    pub fn new(url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Any HTTP response counts, whatever its status.
    pub fn probe_once(&self) -> Result<StatusCode, reqwest::Error> {
        self.client.get(&self.url).send().map(|resp| resp.status())
    }
}

/// Probe at a fixed interval until a response arrives, the worker is gone,
/// or `timeout` elapses.
pub(crate) fn wait_until_ready(
    probe: &Probe,
    worker_finished: impl Fn() -> bool,
    timeout: Duration,
    interval: Duration,
) -> Readiness {
    let start = Instant::now();
    let mut attempts = 0;
    while start.elapsed() < timeout {
        if worker_finished() {
            return Readiness::WorkerExited { attempts };
        }
        attempts += 1;
        match probe.probe_once() {
            Ok(status) => return Readiness::Ready { attempts, status },
            Err(e) => {
                debug!(
                    url = probe.url(),
                    attempt = attempts,
                    error = %e,
                    "probe failed"
                );
                std::thread::sleep(interval);
            }
        }
    }
    Readiness::TimedOut { attempts }
}
