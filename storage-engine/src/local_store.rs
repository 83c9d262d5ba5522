use async_trait::async_trait;
use parking_lot::Mutex;
use shared::Result;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::time::{Instant, sleep_until};
use tracing::debug;
use trestle::{BackendKind, CacheStore};

/// Identifies one scheduled eviction: its deadline plus a tiebreaker so two
/// keys expiring at the same instant get distinct records.
type EvictionId = (Instant, u64);

struct LocalEntry {
    value: String,
    eviction: EvictionId,
}

/// Value mapping and eviction schedule. Mutated only under one lock so every
/// key has at most one eviction record, and only while it has a value.
#[derive(Default)]
struct LocalState {
    entries: HashMap<String, LocalEntry>,
    schedule: BTreeMap<EvictionId, String>,
    next_seq: u64,
}

impl LocalState {
    fn remove(&mut self, key: &str) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                self.schedule.remove(&entry.eviction);
                true
            }
            None => false,
        }
    }

    /// Returns true when the new record is now the earliest deadline.
    fn insert(&mut self, key: &str, value: String, deadline: Instant) -> bool {
        self.remove(key);

        let eviction = (deadline, self.next_seq);
        self.next_seq = self.next_seq.wrapping_add(1);

        self.schedule.insert(eviction, key.to_string());
        self.entries
            .insert(key.to_string(), LocalEntry { value, eviction });

        self.schedule.keys().next() == Some(&eviction)
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.schedule.keys().next().map(|(deadline, _)| *deadline)
    }

    fn evict_due(&mut self, now: Instant) -> usize {
        let mut evicted = 0;
        while let Some((&eviction, _)) = self.schedule.first_key_value() {
            if eviction.0 > now {
                break;
            }
            if let Some(key) = self.schedule.remove(&eviction) {
                if self
                    .entries
                    .get(&key)
                    .is_some_and(|entry| entry.eviction == eviction)
                {
                    self.entries.remove(&key);
                    debug!(key = %key, "Cache entry expired (local)");
                    evicted += 1;
                }
            }
        }
        evicted
    }

    fn clear(&mut self) {
        self.schedule.clear();
        self.entries.clear();
    }
}

struct Shared {
    state: Mutex<LocalState>,
    wake: Notify,
}

/// In-process TTL cache
///
/// Expiration runs on a single sweeper task that sleeps until the earliest
/// deadline. Overwriting a key replaces its eviction record, and deleting it
/// drops the record, so a stale deadline never removes a newer value.
///
/// Must be created inside a tokio runtime.
pub struct LocalStore {
    shared: Arc<Shared>,
    /// Flips to `true` to stop the sweeper; dropping it stops it too
    shutdown: watch::Sender<bool>,
}

impl LocalStore {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(LocalState::default()),
            wake: Notify::new(),
        });
        let (shutdown, shutdown_rx) = watch::channel(false);

        tokio::spawn(run_sweeper(Arc::downgrade(&shared), shutdown_rx));
        debug!("Local cache store created");

        Self { shared, shutdown }
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.shared.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of outstanding eviction records
    pub fn scheduled_len(&self) -> usize {
        self.shared.state.lock().schedule.len()
    }
}

impl Default for LocalStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Deadlines too far out to represent are clamped to roughly thirty years.
fn deadline_after(ttl: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(ttl)
        .unwrap_or_else(|| now + Duration::from_secs(30 * 365 * 24 * 60 * 60))
}

async fn run_sweeper(shared: Weak<Shared>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        if *shutdown_rx.borrow_and_update() {
            break;
        }
        let Some(shared) = shared.upgrade() else {
            return;
        };

        let next = {
            let mut state = shared.state.lock();
            state.evict_due(Instant::now());
            state.next_deadline()
        };

        match next {
            Some(deadline) => {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shared.wake.notified() => {}
                    _ = sleep_until(deadline) => {}
                }
            }
            None => {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = shared.wake.notified() => {}
                }
            }
        }
    }
    debug!("Local cache sweeper stopped");
}

#[async_trait]
impl CacheStore for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self.shared.state.lock();
        // An entry past its deadline may not have been swept yet
        let now = Instant::now();
        Ok(state
            .entries
            .get(key)
            .filter(|entry| entry.eviction.0 > now)
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let earliest = {
            let mut state = self.shared.state.lock();
            // Without a sweeper, writes clear out whatever has already expired
            if *self.shutdown.borrow() {
                state.evict_due(Instant::now());
            }
            if ttl.is_zero() {
                state.remove(key);
                false
            } else {
                state.insert(key, value, deadline_after(ttl))
            }
        };

        if earliest {
            self.shared.wake.notify_one();
        }
        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Cache SET (local)");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let existed = self.shared.state.lock().remove(key);
        debug!(key = %key, existed, "Cache DEL (local)");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.shared.state.lock().clear();
        debug!("Cache FLUSH (local)");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn shutdown(&self) {
        self.shared.state.lock().clear();
        self.shutdown.send_replace(true);
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }
}

impl Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("LocalStore")
            .field("entries", &state.entries.len())
            .field("scheduled", &state.schedule.len())
            .finish()
    }
}
