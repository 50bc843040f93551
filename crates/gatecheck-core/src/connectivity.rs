//! Connectivity monitoring with active health probing.
//!
//! Link-layer signals alone do not prove the backend is reachable, so the
//! monitor combines a host-fed link state with a periodic `HEAD /health`
//! probe and publishes transitions on a broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::api::CheckinApi;

/// Default interval between health probes.
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(10);

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Connectivity state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Tracks whether the backend is reachable.
///
/// Starts out assuming it is; the first probe or link signal corrects that.
/// A transition event is emitted exactly once per state change, however the
/// change was detected.
pub struct ConnectivityMonitor {
    api: CheckinApi,
    online: AtomicBool,
    link_up: AtomicBool,
    event_tx: broadcast::Sender<ConnectivityEvent>,
    probe_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(api: CheckinApi) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            api,
            online: AtomicBool::new(true),
            link_up: AtomicBool::new(true),
            event_tx,
            probe_handle: Mutex::new(None),
        }
    }

    /// Current connectivity snapshot.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Subscribe to connectivity transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.event_tx.subscribe()
    }

    /// Feed a host link-state signal (the browser online/offline analog).
    pub fn set_link_state(&self, online: bool) {
        self.link_up.store(online, Ordering::SeqCst);
        self.apply_state(online);
    }

    /// Probe the health endpoint once and fold the result into the state.
    ///
    /// A downed link short-circuits the probe.
    pub async fn probe_once(&self) -> bool {
        let reachable = self.link_up.load(Ordering::SeqCst) && self.api.probe_health().await;
        self.apply_state(reachable);
        reachable
    }

    /// Spawn the periodic probe loop, replacing any previous one.
    pub fn start(self: &Arc<Self>, interval: Duration) {
        let monitor = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.probe_once().await;
            }
        });

        if let Ok(mut guard) = self.probe_handle.lock() {
            if let Some(previous) = guard.replace(handle) {
                previous.abort();
            }
        }
    }

    fn apply_state(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            tracing::info!(online, "connectivity changed");
            let event = if online {
                ConnectivityEvent::Online
            } else {
                ConnectivityEvent::Offline
            };
            let _ = self.event_tx.send(event);
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.probe_handle.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn monitor() -> ConnectivityMonitor {
        // Nothing listens on this address; probes would fail
        let api = CheckinApi::new("http://127.0.0.1:1").unwrap();
        ConnectivityMonitor::new(api)
    }

    #[tokio::test]
    async fn emits_exactly_one_event_per_transition() {
        let monitor = monitor();
        let mut events = monitor.subscribe();

        monitor.set_link_state(false);
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::Offline);

        // Repeating the same state is not a transition
        monitor.set_link_state(false);
        assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

        monitor.set_link_state(true);
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::Online);
    }

    #[tokio::test]
    async fn probe_marks_unreachable_backend_offline() {
        let monitor = monitor();
        let mut events = monitor.subscribe();

        assert!(monitor.is_online());
        assert!(!monitor.probe_once().await);
        assert!(!monitor.is_online());
        assert_eq!(events.try_recv().unwrap(), ConnectivityEvent::Offline);
    }

    #[tokio::test]
    async fn probe_short_circuits_when_link_down() {
        let monitor = monitor();
        monitor.set_link_state(false);

        // No HTTP call is made; the result is immediately false
        assert!(!monitor.probe_once().await);
        assert!(!monitor.is_online());
    }
}
