//! Dependency readiness gate.
//!
//! A background loop probes the database and broker on a fixed interval and
//! swaps an atomic snapshot; the request path only ever reads the latest
//! snapshot, so readiness checks never block a request. Until the first
//! successful check the gateway reports not-ready (fail-closed).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::gauge;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_postgres::NoTls;

/// Most recent dependency probe results.
#[derive(Debug, Clone)]
pub struct DependencyHealth {
    /// Whether the last database probe succeeded.
    pub database_ok: bool,
    /// Whether the last broker probe succeeded.
    pub broker_ok: bool,
    /// When the snapshot was taken; `None` before the first check.
    pub checked_at: Option<DateTime<Utc>>,
}

impl DependencyHealth {
    fn unknown() -> Self {
        Self {
            database_ok: false,
            broker_ok: false,
            checked_at: None,
        }
    }

    /// Ready means both dependencies were reachable at the last check.
    pub fn is_ready(&self) -> bool {
        self.database_ok && self.broker_ok
    }
}

/// Shared, atomically-updated readiness snapshot.
///
/// Written only by the background refresh loop; read by every request. The
/// lock is held only for the snapshot swap, never across I/O.
#[derive(Clone)]
pub struct ReadinessState {
    inner: Arc<RwLock<DependencyHealth>>,
}

impl ReadinessState {
    /// Create a gate in the initial not-ready state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(DependencyHealth::unknown())),
        }
    }

    /// Whether ingest traffic should be accepted.
    pub fn is_ready(&self) -> bool {
        self.inner.read().is_ready()
    }

    /// Clone the current snapshot.
    pub fn snapshot(&self) -> DependencyHealth {
        self.inner.read().clone()
    }

    /// Record a fresh probe result, updating gauges and logging readiness
    /// transitions.
    pub fn record(&self, database_ok: bool, broker_ok: bool) {
        let fresh = DependencyHealth {
            database_ok,
            broker_ok,
            checked_at: Some(Utc::now()),
        };
        let ready = fresh.is_ready();

        let was_ready = {
            let mut guard = self.inner.write();
            let was_ready = guard.is_ready();
            *guard = fresh;
            was_ready
        };

        gauge!("gateway_ready").set(if ready { 1.0 } else { 0.0 });
        gauge!("gateway_database_up").set(if database_ok { 1.0 } else { 0.0 });
        gauge!("gateway_broker_up").set(if broker_ok { 1.0 } else { 0.0 });

        if ready && !was_ready {
            tracing::info!("dependencies reachable, accepting ingest traffic");
        } else if !ready && was_ready {
            tracing::warn!(database_ok, broker_ok, "dependency lost, rejecting ingest traffic");
        }
    }
}

impl Default for ReadinessState {
    fn default() -> Self {
        Self::new()
    }
}

/// A single dependency liveness probe.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Whether the dependency answered within the probe deadline.
    async fn healthy(&self) -> bool;
}

/// Probe deadline applied by the concrete probes.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Database probe: fresh connection plus `SELECT 1`.
pub struct PgProbe {
    db_url: String,
}

impl PgProbe {
    /// Probe the database behind `db_url`.
    pub fn new(db_url: impl Into<String>) -> Self {
        Self {
            db_url: db_url.into(),
        }
    }
}

#[async_trait]
impl DependencyProbe for PgProbe {
    async fn healthy(&self) -> bool {
        let attempt = async {
            match tokio_postgres::connect(&self.db_url, NoTls).await {
                Ok((client, connection)) => {
                    let driver = tokio::spawn(connection);
                    let ok = client.simple_query("SELECT 1").await.is_ok();
                    driver.abort();
                    ok
                }
                Err(e) => {
                    tracing::debug!(error = %e, "database probe failed");
                    false
                }
            }
        };
        tokio::time::timeout(PROBE_TIMEOUT, attempt)
            .await
            .unwrap_or(false)
    }
}

/// Broker probe: TCP dial of the bootstrap address.
pub struct TcpProbe {
    addr: String,
}

impl TcpProbe {
    /// Probe the endpoint at `addr` (host:port).
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl DependencyProbe for TcpProbe {
    async fn healthy(&self) -> bool {
        match tokio::time::timeout(PROBE_TIMEOUT, tokio::net::TcpStream::connect(&self.addr))
            .await
        {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(addr = %self.addr, error = %e, "broker probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(addr = %self.addr, "broker probe timed out");
                false
            }
        }
    }
}

/// Run both probes once and record the result.
pub async fn check_once(
    state: &ReadinessState,
    database: &Arc<dyn DependencyProbe>,
    broker: &Arc<dyn DependencyProbe>,
) {
    let (database_ok, broker_ok) = tokio::join!(database.healthy(), broker.healthy());
    state.record(database_ok, broker_ok);
}

/// Spawn the background refresh loop.
///
/// The first check runs immediately; afterwards the loop ticks on
/// `interval` for the life of the process.
pub fn spawn_refresh_loop(
    state: ReadinessState,
    database: Arc<dyn DependencyProbe>,
    broker: Arc<dyn DependencyProbe>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            check_once(&state, &database, &broker).await;
        }
    })
}
