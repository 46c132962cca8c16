//! Worker supervisor (C14): starts, stops, and reports health for the
//! long-running services (outbox worker, poll worker). The sync "worker" is
//! not a long-running loop — it is the executor of dispatched tasks (§5) and
//! so is not supervised here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::kernel::service::{Service, ServiceHealth};

struct Handle {
    service: Arc<dyn Service>,
    shutdown_tx: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

pub struct WorkerSupervisor {
    handles: Vec<Handle>,
}

impl Default for WorkerSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkerSupervisor {
    pub fn new() -> Self {
        Self { handles: Vec::new() }
    }

    pub fn register(&mut self, service: Arc<dyn Service>) {
        let (shutdown_tx, _) = watch::channel(false);
        self.handles.push(Handle {
            service,
            shutdown_tx,
            join: None,
        });
    }

    pub fn start_all(&mut self) {
        for handle in &mut self.handles {
            if handle.join.is_some() {
                continue;
            }
            let service = handle.service.clone();
            let rx = handle.shutdown_tx.subscribe();
            handle.join = Some(tokio::spawn(async move {
                service.run(rx).await;
            }));
            tracing::info!(service = handle.service.name(), "worker started");
        }
    }

    /// Signal all services to stop and wait up to `grace_period` for them to
    /// finish in-flight work before returning.
    pub async fn stop_all(&mut self, grace_period: std::time::Duration) {
        for handle in &mut self.handles {
            let _ = handle.shutdown_tx.send(true);
        }
        for handle in &mut self.handles {
            if let Some(join) = handle.join.take() {
                let _ = tokio::time::timeout(grace_period, join).await;
            }
        }
    }

    pub async fn restart(&mut self, name: &str, grace_period: std::time::Duration) {
        if let Some(handle) = self.handles.iter_mut().find(|h| h.service.name() == name) {
            let _ = handle.shutdown_tx.send(true);
            if let Some(join) = handle.join.take() {
                let _ = tokio::time::timeout(grace_period, join).await;
            }
            let (shutdown_tx, rx) = watch::channel(false);
            handle.shutdown_tx = shutdown_tx;
            let service = handle.service.clone();
            handle.join = Some(tokio::spawn(async move {
                service.run(rx).await;
            }));
            tracing::info!(service = name, "worker restarted");
        }
    }

    pub fn health(&self) -> HashMap<&'static str, ServiceHealth> {
        self.handles
            .iter()
            .map(|h| (h.service.name(), h.service.health()))
            .collect()
    }
}
