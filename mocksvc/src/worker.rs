use std::thread::JoinHandle;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::error::{ServiceError, WorkerError};
use crate::port::ReservationSlot;

/// Background thread serving one mock service. Stop is requested and
/// awaited at most once; later calls to [`Worker::stop`] return immediately.
pub(crate) struct Worker {
    service: String,
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<Result<(), WorkerError>>>,
}

impl Worker {
    pub fn spawn(
        service: &str,
        app: Router,
        host: &str,
        port: u16,
        reservation: ReservationSlot,
    ) -> Result<Self, ServiceError> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let addr = if host.contains(':') {
            format!("[{host}]:{port}")
        } else {
            format!("{host}:{port}")
        };
        let name = service.to_string();
        let thread = std::thread::Builder::new()
            .name(format!("mocksvc-{service}"))
            .spawn(move || serve(name, app, addr, reservation, stop_rx))
            .map_err(|source| ServiceError::Spawn {
                service: service.to_string(),
                source,
            })?;
        Ok(Self {
            service: service.to_string(),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(true)
    }

    /// Signal graceful shutdown and join the thread, without a timeout.
    pub fn stop(&mut self) -> Result<(), ServiceError> {
        if let Some(tx) = self.stop_tx.take() {
            // the receiver is gone when the serve loop already ended
            let _ = tx.send(());
        }
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        match thread.join() {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(
                    service = %self.service,
                    error = %e,
                    "worker ended with error"
                );
                Ok(())
            }
            Err(_) => Err(ServiceError::WorkerPanicked(self.service.clone())),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            warn!(service = %self.service, error = %e, "failed to stop worker");
        }
    }
}

fn serve(
    service: String,
    app: Router,
    addr: String,
    reservation: ReservationSlot,
    stop_rx: oneshot::Receiver<()>,
) -> Result<(), WorkerError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(WorkerError::Runtime)?;
    rt.block_on(async move {
        // free the reserved port right before binding it
        reservation.release();
        let listener = TcpListener::bind(&addr).await.map_err(|source| {
            WorkerError::Bind {
                addr: addr.clone(),
                source,
            }
        })?;
        info!(service = %service, addr = %addr, "mock service listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
            .map_err(WorkerError::Serve)?;
        info!(service = %service, "mock service stopped");
        Ok(())
    })
}

#[cfg(test)]
impl Worker {
    pub(crate) fn from_thread(
        service: &str,
        thread: JoinHandle<Result<(), WorkerError>>,
    ) -> Self {
        Self {
            service: service.to_string(),
            stop_tx: None,
            thread: Some(thread),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panicked_thread_is_reported_once() {
        let mut worker = Worker::from_thread(
            "widgets",
            std::thread::spawn(|| -> Result<(), WorkerError> {
                panic!("worker blew up")
            }),
        );
        assert!(matches!(
            worker.stop(),
            Err(ServiceError::WorkerPanicked(ref s)) if s == "widgets"
        ));
        assert!(worker.stop().is_ok());
        assert!(worker.is_finished());
    }
}
