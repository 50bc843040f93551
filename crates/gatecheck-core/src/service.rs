//! Service composition and lifecycle.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::CheckinApi;
use crate::checkin::{CheckinRef, Recorder, SwagOutcome, VerifyOutcome};
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor, DEFAULT_PROBE_INTERVAL};
use crate::error::Result;
use crate::models::CachedTicket;
use crate::snapshot::{SnapshotLoader, SnapshotSummary};
use crate::store::Store;
use crate::sync::{SyncEngine, SyncEvent, SyncReport, DEFAULT_SYNC_INTERVAL};

/// Configuration for a [`CheckinService`].
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Backend base URL, e.g. `https://tickets.example.com`
    pub base_url: String,
    /// Organizer slug used in endpoint paths
    pub org_slug: String,
    /// Event slug this terminal checks in
    pub event_slug: String,
    /// Local database file path
    pub db_path: PathBuf,
    /// Interval between health probes
    pub probe_interval: Duration,
    /// Interval between periodic sync passes
    pub sync_interval: Duration,
}

impl ServiceConfig {
    pub fn new(
        base_url: impl Into<String>,
        org_slug: impl Into<String>,
        event_slug: impl Into<String>,
        db_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            org_slug: org_slug.into(),
            event_slug: event_slug.into(),
            db_path: db_path.into(),
            probe_interval: DEFAULT_PROBE_INTERVAL,
            sync_interval: DEFAULT_SYNC_INTERVAL,
        }
    }
}

/// Point-in-time offline status for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending_checkins: usize,
    pub pending_swag: usize,
}

/// The offline check-in subsystem, explicitly constructed and passed by
/// reference to whatever UI layer needs it.
///
/// One instance per process/session: the constructor opens the local store
/// and [`start`](Self::start) spawns the probe loop, the reconnect sync
/// trigger, and the periodic sync timer. Background tasks are aborted when
/// the service is dropped.
///
/// If the store cannot be opened ([`crate::Error::StorageUnavailable`]),
/// the host should run without this service entirely: verify tickets
/// directly against the backend and skip caching.
pub struct CheckinService {
    store: Store,
    monitor: Arc<ConnectivityMonitor>,
    engine: Arc<SyncEngine>,
    recorder: Recorder,
    loader: SnapshotLoader,
    config: ServiceConfig,
    tasks: Vec<JoinHandle<()>>,
}

impl CheckinService {
    /// Open the local store and assemble the full subsystem.
    pub async fn open(config: ServiceConfig) -> Result<Self> {
        let store = Store::open(&config.db_path).await?;
        Self::from_store(config, store)
    }

    /// In-memory variant (primarily for tests).
    pub async fn open_in_memory(config: ServiceConfig) -> Result<Self> {
        let store = Store::open_in_memory().await?;
        Self::from_store(config, store)
    }

    /// Assemble the subsystem around an already-open store.
    pub fn from_store(config: ServiceConfig, store: Store) -> Result<Self> {
        let api = CheckinApi::new(&config.base_url)?;
        let monitor = Arc::new(ConnectivityMonitor::new(api.clone()));
        let engine = Arc::new(SyncEngine::new(
            store.clone(),
            api.clone(),
            Arc::clone(&monitor),
        ));
        let recorder = Recorder::new(
            store.clone(),
            api.clone(),
            Arc::clone(&monitor),
            config.org_slug.clone(),
            config.event_slug.clone(),
        );
        let loader = SnapshotLoader::new(store.clone(), api);

        Ok(Self {
            store,
            monitor,
            engine,
            recorder,
            loader,
            config,
            tasks: Vec::new(),
        })
    }

    /// Start the background tasks: probe loop, reconnect trigger, periodic
    /// sync timer.
    pub fn start(&mut self) {
        self.monitor.start(self.config.probe_interval);
        self.tasks.push(self.engine.spawn_on_reconnect());
        self.tasks.push(self.engine.spawn_periodic(self.config.sync_interval));
    }

    /// Verify a ticket and check it in.
    pub async fn verify_ticket(&self, code: &str) -> Result<VerifyOutcome> {
        self.recorder.verify_ticket(code).await
    }

    /// Collect a swag item for a checked-in ticket.
    pub async fn collect_swag(
        &self,
        checkin_ref: &CheckinRef,
        swag_item_id: i64,
        ticket_code: &str,
    ) -> Result<SwagOutcome> {
        self.recorder
            .collect_swag(checkin_ref, swag_item_id, ticket_code)
            .await
    }

    /// Search cached tickets for this event.
    pub async fn search_tickets(&self, query: &str) -> Result<Vec<CachedTicket>> {
        self.recorder.search_tickets(query).await
    }

    /// Fetch and cache the event snapshot for offline use.
    pub async fn load_event_snapshot(&self) -> Result<SnapshotSummary> {
        self.loader
            .load_event_snapshot(&self.config.org_slug, &self.config.event_slug)
            .await
    }

    /// Replay pending records now. `None` when a pass was already running
    /// or the backend is unreachable.
    pub async fn sync_now(&self) -> Result<Option<SyncReport>> {
        self.engine.sync_now().await
    }

    /// Point-in-time status for the UI.
    pub async fn status(&self) -> Result<OfflineStatus> {
        let (pending_checkins, pending_swag) = self.store.pending_counts().await?;
        Ok(OfflineStatus {
            is_online: self.monitor.is_online(),
            is_syncing: self.engine.is_syncing(),
            pending_checkins,
            pending_swag,
        })
    }

    /// Whether forced offline mode is enabled.
    pub async fn offline_mode(&self) -> Result<bool> {
        self.store.offline_mode().await
    }

    /// Toggle forced offline mode. Enabling it while the backend is
    /// reachable caches a fresh snapshot first, so the terminal can keep
    /// working once connectivity drops.
    pub async fn set_offline_mode(&self, enabled: bool) -> Result<Option<SnapshotSummary>> {
        self.store.set_offline_mode(enabled).await?;
        if enabled && self.monitor.is_online() {
            let summary = self.load_event_snapshot().await?;
            return Ok(Some(summary));
        }
        Ok(None)
    }

    /// Probe the backend once and fold the result into the connectivity
    /// state. Useful for hosts that sync on demand rather than on a timer.
    pub async fn probe_connectivity(&self) -> bool {
        self.monitor.probe_once().await
    }

    /// Feed a host link-state signal.
    pub fn set_link_state(&self, online: bool) {
        self.monitor.set_link_state(online);
    }

    /// Subscribe to sync notifications.
    pub fn subscribe_sync(&self) -> broadcast::Receiver<SyncEvent> {
        self.engine.subscribe()
    }

    /// Subscribe to connectivity transitions.
    pub fn subscribe_connectivity(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.monitor.subscribe()
    }

    /// The underlying store, for host-level queries (pending lists, cached
    /// events).
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

impl Drop for CheckinService {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
