//! Reconciliation engine: replays pending records against the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::{CheckinApi, CheckinSyncRequest, SwagSyncRequest};
use crate::connectivity::{ConnectivityEvent, ConnectivityMonitor};
use crate::error::Result;
use crate::store::Store;

/// Default interval between periodic sync passes.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Aggregate result of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub checkins_synced: usize,
    pub checkins_failed: usize,
    pub swag_synced: usize,
    pub swag_failed: usize,
}

impl SyncReport {
    /// True when at least one record changed state; the UI shows a toast
    /// only in that case.
    pub const fn changed_anything(&self) -> bool {
        self.checkins_synced > 0 || self.swag_synced > 0
    }
}

/// Notifications about reconciliation activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// A pass started
    Started,
    /// A single pending check-in reached the server
    CheckinSynced { local_id: i64, reference: String },
    /// A pass finished with the aggregate counts
    Completed(SyncReport),
}

/// Replays pending check-ins and swag collections against the backend.
///
/// Re-entrant-safe: a `sync_now` call while a pass is running returns
/// immediately without starting a second pass, which also absorbs
/// connectivity flapping.
pub struct SyncEngine {
    store: Store,
    api: CheckinApi,
    monitor: Arc<ConnectivityMonitor>,
    is_syncing: AtomicBool,
    event_tx: broadcast::Sender<SyncEvent>,
}

impl SyncEngine {
    pub fn new(store: Store, api: CheckinApi, monitor: Arc<ConnectivityMonitor>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            api,
            monitor,
            is_syncing: AtomicBool::new(false),
            event_tx,
        }
    }

    /// Whether a pass is currently running.
    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    /// Subscribe to sync notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.event_tx.subscribe()
    }

    /// Replay all pending records: check-ins oldest-first, then swag.
    ///
    /// Returns `None` without starting a pass when one is already running
    /// or the backend is unreachable. A per-record server failure is
    /// counted and skipped; the pass always covers the whole batch.
    /// Already-synced records are never re-sent, so back-to-back passes
    /// with no new local writes make no network calls on the second pass.
    pub async fn sync_now(&self) -> Result<Option<SyncReport>> {
        if !self.monitor.is_online() {
            return Ok(None);
        }
        let Some(_guard) = SyncGuard::acquire(&self.is_syncing) else {
            tracing::debug!("sync already in progress, skipping");
            return Ok(None);
        };

        let _ = self.event_tx.send(SyncEvent::Started);
        let mut report = SyncReport::default();

        // Check-ins replay before swag collections so the server can
        // resolve references for the swag that follows
        for checkin in self.store.unsynced_checkins().await? {
            let request = CheckinSyncRequest {
                ticket_code: checkin.ticket_code.clone(),
                checked_in_at: checkin.checked_in_at,
                notes: checkin.notes.clone(),
            };
            match self.api.sync_checkin(&request).await {
                Ok(reference) => {
                    self.store
                        .mark_checkin_synced(checkin.local_id, &reference)
                        .await?;
                    let _ = self.event_tx.send(SyncEvent::CheckinSynced {
                        local_id: checkin.local_id,
                        reference,
                    });
                    report.checkins_synced += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        code = %checkin.ticket_code,
                        %error,
                        "check-in sync failed, will retry on the next pass"
                    );
                    report.checkins_failed += 1;
                }
            }
        }

        for swag in self.store.unsynced_swag().await? {
            let request = SwagSyncRequest {
                ticket_code: swag.ticket_code.clone(),
                swag_item_id: swag.swag_item_id,
                collected_at: swag.collected_at,
            };
            match self.api.sync_swag(&request).await {
                Ok(()) => {
                    self.store.mark_swag_synced(swag.local_id).await?;
                    report.swag_synced += 1;
                }
                Err(error) => {
                    tracing::warn!(
                        code = %swag.ticket_code,
                        %error,
                        "swag sync failed, will retry on the next pass"
                    );
                    report.swag_failed += 1;
                }
            }
        }

        tracing::info!(?report, "sync pass completed");
        let _ = self.event_tx.send(SyncEvent::Completed(report));
        Ok(Some(report))
    }

    /// Spawn the periodic sync timer.
    pub fn spawn_periodic(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; skip it so the timer
            // only fires after a full interval
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(error) = engine.sync_now().await {
                    tracing::warn!(%error, "periodic sync pass failed");
                }
            }
        })
    }

    /// Spawn the connectivity-regained trigger: exactly one sync attempt
    /// per transition to online.
    pub fn spawn_on_reconnect(self: &Arc<Self>) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        let mut events = self.monitor.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ConnectivityEvent::Online) => {
                        if let Err(error) = engine.sync_now().await {
                            tracing::warn!(%error, "reconnect sync pass failed");
                        }
                    }
                    Ok(ConnectivityEvent::Offline)
                    | Err(broadcast::error::RecvError::Lagged(_)) => {}
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

/// Releases the in-memory sync flag when a pass ends, however it ends.
struct SyncGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> SyncGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::Mutex;

    type RequestLog = Arc<Mutex<Vec<(String, String)>>>;

    /// Minimal scripted HTTP server: logs (path, body) per request and
    /// answers via the route closure. `connection: close` keeps reqwest
    /// from pooling, so each request arrives on a fresh connection.
    async fn spawn_script_server<F>(respond: F, response_delay: Duration) -> (String, RequestLog)
    where
        F: Fn(&str, &str) -> (u16, String) + Send + Sync + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let address = listener.local_addr().expect("local address");
        let log: RequestLog = Arc::default();
        let server_log = Arc::clone(&log);
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let log = Arc::clone(&server_log);
                let respond = Arc::clone(&respond);
                tokio::spawn(async move {
                    let (path, body) = read_request(&mut socket).await;
                    log.lock().await.push((path.clone(), body.clone()));
                    tokio::time::sleep(response_delay).await;

                    let (status, response_body) = respond(&path, &body);
                    let reason = match status {
                        200 => "OK",
                        404 => "Not Found",
                        409 => "Conflict",
                        500 => "Internal Server Error",
                        _ => "Unknown",
                    };
                    let response = format!(
                        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                        response_body.len(),
                        response_body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        (format!("http://{address}"), log)
    }

    async fn read_request(socket: &mut TcpStream) -> (String, String) {
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 1024];

        loop {
            let n = socket.read(&mut chunk).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);

            if let Some(header_end) = find_subslice(&buffer, b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buffer[..header_end]).to_string();
                let content_length = headers
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        if name.eq_ignore_ascii_case("content-length") {
                            value.trim().parse::<usize>().ok()
                        } else {
                            None
                        }
                    })
                    .unwrap_or(0);

                let body_start = header_end + 4;
                while buffer.len() < body_start + content_length {
                    let n = socket.read(&mut chunk).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    buffer.extend_from_slice(&chunk[..n]);
                }

                let path = headers
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();
                let body_end = (body_start + content_length).min(buffer.len());
                let body = String::from_utf8_lossy(&buffer[body_start..body_end]).to_string();
                return (path, body);
            }
        }

        ("/".to_string(), String::new())
    }

    fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack
            .windows(needle.len())
            .position(|window| window == needle)
    }

    fn ticket_code_of(body: &str) -> String {
        serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| value["ticketCode"].as_str().map(ToString::to_string))
            .unwrap_or_default()
    }

    /// Responds to check-in syncs with a reference derived from the ticket
    /// code and accepts every swag sync.
    fn accept_all(path: &str, body: &str) -> (u16, String) {
        if path.starts_with("/checkin/swag/sync") {
            (200, "{}".to_string())
        } else if path.starts_with("/checkin/sync") {
            let code = ticket_code_of(body);
            (200, format!(r#"{{"reference": "ref-{code}"}}"#))
        } else {
            (404, String::new())
        }
    }

    async fn engine_with(base_url: &str) -> (Arc<SyncEngine>, Store) {
        let store = Store::open_in_memory().await.unwrap();
        let api = CheckinApi::new(base_url).unwrap();
        let monitor = Arc::new(ConnectivityMonitor::new(api.clone()));
        let engine = Arc::new(SyncEngine::new(store.clone(), api, monitor));
        (engine, store)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn syncs_pending_checkins_and_swag() {
        let (base, log) = spawn_script_server(accept_all, Duration::ZERO).await;
        let (engine, store) = engine_with(&base).await;

        store.save_checkin("AAA", 1_000, "Offline check-in").await.unwrap();
        store.save_checkin("BBB", 2_000, "Offline check-in").await.unwrap();
        store
            .save_swag_collection("local:1", 5, "AAA", 3_000)
            .await
            .unwrap();

        let report = engine.sync_now().await.unwrap().unwrap();
        assert_eq!(
            report,
            SyncReport {
                checkins_synced: 2,
                checkins_failed: 0,
                swag_synced: 1,
                swag_failed: 0,
            }
        );
        assert!(report.changed_anything());

        // All records confirmed, references attached
        assert_eq!(store.pending_counts().await.unwrap(), (0, 0));
        let first = store.pending_checkin(1).await.unwrap().unwrap();
        assert!(first.synced);
        assert_eq!(first.server_reference.as_deref(), Some("ref-AAA"));

        // Check-ins were dispatched before swag
        let requests = log.lock().await;
        assert_eq!(requests.len(), 3);
        assert!(requests[2].0.starts_with("/checkin/swag/sync"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn second_pass_makes_no_network_calls() {
        let (base, log) = spawn_script_server(accept_all, Duration::ZERO).await;
        let (engine, store) = engine_with(&base).await;

        store.save_checkin("AAA", 1_000, "").await.unwrap();

        let first = engine.sync_now().await.unwrap().unwrap();
        assert_eq!(first.checkins_synced, 1);

        let second = engine.sync_now().await.unwrap().unwrap();
        assert_eq!(second, SyncReport::default());
        assert!(!second.changed_anything());

        // Only the original sync call reached the server
        assert_eq!(log.lock().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dispatches_checkins_oldest_first() {
        let (base, log) = spawn_script_server(accept_all, Duration::ZERO).await;
        let (engine, store) = engine_with(&base).await;

        // Inserted out of timestamp order
        store.save_checkin("THIRD", 3_000, "").await.unwrap();
        store.save_checkin("FIRST", 1_000, "").await.unwrap();
        store.save_checkin("SECOND", 2_000, "").await.unwrap();

        engine.sync_now().await.unwrap().unwrap();

        let requests = log.lock().await;
        let codes: Vec<String> = requests
            .iter()
            .map(|(_, body)| ticket_code_of(body))
            .collect();
        assert_eq!(codes, vec!["FIRST", "SECOND", "THIRD"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_failure_skips_record_and_continues() {
        let (base, log) = spawn_script_server(
            |path, body| {
                if path.starts_with("/checkin/sync") && ticket_code_of(body) == "BAD" {
                    (500, r#"{"message": "boom"}"#.to_string())
                } else {
                    accept_all(path, body)
                }
            },
            Duration::ZERO,
        )
        .await;
        let (engine, store) = engine_with(&base).await;

        store.save_checkin("BAD", 1_000, "").await.unwrap();
        store.save_checkin("GOOD", 2_000, "").await.unwrap();

        let report = engine.sync_now().await.unwrap().unwrap();
        assert_eq!(report.checkins_synced, 1);
        assert_eq!(report.checkins_failed, 1);

        // The failed record stays pending and is retried on the next pass
        let pending = store.unsynced_checkins().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].ticket_code, "BAD");

        log.lock().await.clear();
        let retry = engine.sync_now().await.unwrap().unwrap();
        assert_eq!(retry.checkins_failed, 1);
        assert_eq!(log.lock().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn swag_failure_does_not_roll_back_checkin() {
        let (base, _log) = spawn_script_server(
            |path, body| {
                if path.starts_with("/checkin/swag/sync") {
                    (500, String::new())
                } else {
                    accept_all(path, body)
                }
            },
            Duration::ZERO,
        )
        .await;
        let (engine, store) = engine_with(&base).await;

        store.save_checkin("AAA", 1_000, "").await.unwrap();
        store
            .save_swag_collection("local:1", 5, "AAA", 2_000)
            .await
            .unwrap();

        let report = engine.sync_now().await.unwrap().unwrap();
        assert_eq!(report.checkins_synced, 1);
        assert_eq!(report.swag_failed, 1);
        assert_eq!(store.pending_counts().await.unwrap(), (0, 1));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_sync_is_a_no_op() {
        // Slow server keeps the first pass in flight
        let (base, log) = spawn_script_server(accept_all, Duration::from_millis(200)).await;
        let (engine, store) = engine_with(&base).await;

        store.save_checkin("AAA", 1_000, "").await.unwrap();

        let running = Arc::clone(&engine);
        let first = tokio::spawn(async move { running.sync_now().await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(engine.is_syncing());
        let second = engine.sync_now().await.unwrap();
        assert!(second.is_none());

        let report = first.await.unwrap().unwrap().unwrap();
        assert_eq!(report.checkins_synced, 1);
        assert_eq!(log.lock().await.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn offline_engine_does_not_sync() {
        let (engine, store) = engine_with("http://127.0.0.1:1").await;
        engine.monitor.set_link_state(false);

        store.save_checkin("AAA", 1_000, "").await.unwrap();

        assert!(engine.sync_now().await.unwrap().is_none());
        assert_eq!(store.pending_counts().await.unwrap(), (1, 0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reconnect_trigger_drains_queue() {
        let (base, _log) = spawn_script_server(accept_all, Duration::ZERO).await;
        let (engine, store) = engine_with(&base).await;
        engine.monitor.set_link_state(false);

        store.save_checkin("AAA", 1_000, "").await.unwrap();

        let task = engine.spawn_on_reconnect();
        engine.monitor.set_link_state(true);

        // Give the spawned trigger a moment to run the pass
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if store.pending_counts().await.unwrap() == (0, 0) {
                break;
            }
        }
        assert_eq!(store.pending_counts().await.unwrap(), (0, 0));
        task.abort();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn completed_event_carries_report() {
        let (base, _log) = spawn_script_server(accept_all, Duration::ZERO).await;
        let (engine, store) = engine_with(&base).await;
        let mut events = engine.subscribe();

        store.save_checkin("AAA", 1_000, "").await.unwrap();
        engine.sync_now().await.unwrap().unwrap();

        assert_eq!(events.recv().await.unwrap(), SyncEvent::Started);
        let synced = events.recv().await.unwrap();
        assert!(matches!(synced, SyncEvent::CheckinSynced { local_id: 1, .. }));
        let completed = events.recv().await.unwrap();
        let SyncEvent::Completed(report) = completed else {
            panic!("expected Completed, got {completed:?}");
        };
        assert_eq!(report.checkins_synced, 1);
    }
}
