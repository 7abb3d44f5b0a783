//! Online/offline tracking.
//!
//! Two event sources feed one state machine: periodic reachability probes
//! and OS-level connectivity transitions. The probe loop follows the usual
//! poller shape (sleep for the interval or wake early on a signal) and is
//! torn down when its [`ConnectivityHandle`] is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

const OFFLINE_MESSAGE: &str = "No internet connection";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityEvent {
    ProbeResult(Result<(), String>),
    OsTransition { online: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityStatus {
    pub is_online: bool,
    pub last_error: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Default for ConnectivityStatus {
    fn default() -> Self {
        Self {
            is_online: true,
            last_error: None,
            last_checked_at: None,
        }
    }
}

impl ConnectivityStatus {
    pub fn apply(&mut self, event: ConnectivityEvent, now: DateTime<Utc>) {
        match event {
            ConnectivityEvent::ProbeResult(Ok(())) => {
                self.is_online = true;
                self.last_error = None;
                self.last_checked_at = Some(now);
            }
            ConnectivityEvent::ProbeResult(Err(reason)) => {
                self.is_online = false;
                self.last_error = Some(format!("Unable to reach server: {}", reason));
                self.last_checked_at = Some(now);
            }
            ConnectivityEvent::OsTransition { online: true } => {
                self.is_online = true;
                self.last_error = None;
            }
            ConnectivityEvent::OsTransition { online: false } => {
                self.is_online = false;
                self.last_error = Some(OFFLINE_MESSAGE.to_string());
            }
        }
    }
}

#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// `Ok` when the backend answered at all; `Err` carries a readable reason.
    async fn probe(&self) -> Result<(), String>;
}

/// Probes the backend base URL. Any HTTP response, including an error
/// status, counts as reachable.
pub struct HttpProbe {
    client: reqwest::Client,
    url: url::Url,
}

impl HttpProbe {
    pub fn new(url: url::Url, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client, url }
    }
}

#[async_trait]
impl ReachabilityProbe for HttpProbe {
    async fn probe(&self) -> Result<(), String> {
        match self.client.get(self.url.clone()).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Err("request timed out".to_string()),
            Err(e) if e.is_connect() => Err("connection refused".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    state: watch::Sender<ConnectivityStatus>,
    wake: Notify,
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>) -> Arc<Self> {
        let (state, _) = watch::channel(ConnectivityStatus::default());
        Arc::new(Self {
            probe,
            state,
            wake: Notify::new(),
        })
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectivityStatus> {
        self.state.subscribe()
    }

    fn apply(&self, event: ConnectivityEvent) -> ConnectivityStatus {
        let now = Utc::now();
        self.state.send_modify(|status| status.apply(event, now));
        self.status()
    }

    /// Feed an OS connectivity change. Coming back online clears the error
    /// immediately and asks the probe loop for an early check.
    pub fn notify_os_transition(&self, online: bool) -> ConnectivityStatus {
        log::info!(
            "Connectivity: OS reports {}",
            if online { "online" } else { "offline" }
        );
        let status = self.apply(ConnectivityEvent::OsTransition { online });
        if online {
            self.wake.notify_one();
        }
        status
    }

    pub async fn probe_once(&self) -> ConnectivityStatus {
        let result = self.probe.probe().await;
        if let Err(reason) = &result {
            log::warn!("Connectivity: probe failed: {}", reason);
        }
        self.apply(ConnectivityEvent::ProbeResult(result))
    }

    /// Re-run the probe now. Only connectivity is retried, never sign-in.
    pub async fn retry_connection(&self) -> ConnectivityStatus {
        log::info!("Connectivity: manual retry");
        self.probe_once().await
    }

    /// Spawn the periodic probe loop. Dropping the handle stops it.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> ConnectivityHandle {
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move {
            loop {
                monitor.probe_once().await;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {},
                    _ = monitor.wake.notified() => {
                        log::debug!("Connectivity: woken for early probe");
                    },
                }
            }
        });
        ConnectivityHandle { task }
    }
}

pub struct ConnectivityHandle {
    task: JoinHandle<()>,
}

impl ConnectivityHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ConnectivityHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
