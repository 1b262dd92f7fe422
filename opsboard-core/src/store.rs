//! Owned working set of episodes with whole-snapshot replacement.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::PatientEpisode;

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&StoreSnapshot) + Send + Sync>;

/// Immutable view of the store at one generation.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    /// Bumped on every replacement; 0 for the initial set.
    pub generation: u64,
    pub episodes: Arc<[PatientEpisode]>,
}

impl StoreSnapshot {
    fn initial(episodes: Vec<PatientEpisode>) -> Self {
        Self {
            generation: 0,
            episodes: Arc::from(episodes),
        }
    }
}

/// Cloneable handle to the current episode set.
///
/// Readers take a [`StoreSnapshot`] and aggregate over it; writers replace the
/// whole set at once. Subscribers are called after each replacement, outside
/// the data lock, in generation order: a replacement that loses the race to a
/// newer one is never delivered after it.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    current: RwLock<StoreSnapshot>,
    listeners: Mutex<Vec<(SubscriptionId, Listener)>>,
    /// Newest generation handed to subscribers. Held across delivery;
    /// reentrant so a listener may itself replace the store.
    delivered: ReentrantMutex<Cell<u64>>,
    next_id: AtomicU64,
}

impl RecordStore {
    pub fn new(episodes: Vec<PatientEpisode>) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                current: RwLock::new(StoreSnapshot::initial(episodes)),
                listeners: Mutex::new(Vec::new()),
                delivered: ReentrantMutex::new(Cell::new(0)),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        self.inner.current.read().clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.current.read().generation
    }

    /// Swap in a new episode set and notify subscribers.
    pub fn replace(&self, episodes: Vec<PatientEpisode>) -> StoreSnapshot {
        let snapshot = {
            let mut current = self.inner.current.write();
            let generation = current.generation + 1;
            *current = StoreSnapshot {
                generation,
                episodes: Arc::from(episodes),
            };
            current.clone()
        };
        self.notify(&snapshot);
        snapshot
    }

    /// Replace only if nobody replaced the set since `expected` was read.
    pub fn replace_if_current(
        &self,
        expected: u64,
        episodes: Vec<PatientEpisode>,
    ) -> Option<StoreSnapshot> {
        let snapshot = {
            let mut current = self.inner.current.write();
            if current.generation != expected {
                return None;
            }
            *current = StoreSnapshot {
                generation: expected + 1,
                episodes: Arc::from(episodes),
            };
            current.clone()
        };
        self.notify(&snapshot);
        Some(snapshot)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreSnapshot) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn notify(&self, snapshot: &StoreSnapshot) {
        let delivered = self.inner.delivered.lock();
        if snapshot.generation <= delivered.get() {
            tracing::debug!(
                generation = snapshot.generation,
                delivered = delivered.get(),
                "skipping superseded store notification"
            );
            return;
        }
        delivered.set(snapshot.generation);

        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(
            generation = snapshot.generation,
            episodes = snapshot.episodes.len(),
            subscribers = listeners.len(),
            "record store replaced"
        );
        for listener in listeners {
            // A listener that replaced the store has already delivered a newer set.
            if delivered.get() != snapshot.generation {
                break;
            }
            listener(snapshot);
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.inner.current.read();
        f.debug_struct("RecordStore")
            .field("generation", &current.generation)
            .field("episodes", &current.episodes.len())
            .finish()
    }
}
