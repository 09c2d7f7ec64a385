//! Versioned state store
//!
//! The store holds one immutable [`Snapshot`] at a time. `apply` reduces the
//! current state under a lock, so writes are serialized; readers clone the
//! snapshot `Arc` and never block writers for longer than the swap.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use dash_core::{DashboardState, Result, StoreConfig};
use tracing::{debug, warn};

use crate::invariants;
use crate::mutation::{reduce, Mutation, MutationOutput};
use crate::selectors::Selector;

type Memo = HashMap<String, Arc<dyn Any + Send + Sync>>;

/// Immutable view of one store version with a selector memo
pub struct Snapshot {
    state: Arc<DashboardState>,
    version: u64,
    memo: Mutex<Memo>,
}

impl Snapshot {
    fn new(state: Arc<DashboardState>, version: u64) -> Self {
        Self {
            state,
            version,
            memo: Mutex::new(HashMap::new()),
        }
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Shared handle to the state of this version
    pub fn state_arc(&self) -> Arc<DashboardState> {
        Arc::clone(&self.state)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Run a memoized selector.
    ///
    /// Repeated calls with an equal selector key return the same `Arc`.
    pub fn select<S: Selector>(&self, selector: &S) -> Arc<S::Output> {
        let key = format!("{}:{}", std::any::type_name::<S>(), selector.key());
        let mut memo = self.memo.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(hit) = memo.get(&key) {
            if let Ok(value) = Arc::clone(hit).downcast::<S::Output>() {
                return value;
            }
        }
        let value = Arc::new(selector.select(&self.state));
        memo.insert(key, value.clone());
        value
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("version", &self.version)
            .field("title", &self.state.title)
            .finish()
    }
}

/// Single-writer store of the dashboard state
pub struct Store {
    current: Mutex<Arc<Snapshot>>,
    config: StoreConfig,
}

impl Store {
    /// Create a store, rejecting states that already violate invariants
    pub fn new(state: DashboardState, config: StoreConfig) -> Result<Self> {
        invariants::check(&state)?;
        Ok(Self {
            current: Mutex::new(Arc::new(Snapshot::new(Arc::new(state), 0))),
            config,
        })
    }

    /// Current snapshot; identical `Arc` until the next successful `apply`
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.current.lock().unwrap_or_else(|e| e.into_inner()))
    }

    pub fn version(&self) -> u64 {
        self.snapshot().version
    }

    /// Apply a mutation atomically; on error the current version is kept
    pub fn apply(&self, mutation: &Mutation) -> Result<(MutationOutput, u64)> {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let (next, output) = reduce(current.state(), mutation)?;
        if self.config.verify_invariants {
            if let Err(e) = invariants::check(&next) {
                warn!("Rejecting {}: {}", mutation.name(), e);
                return Err(e);
            }
        }
        let version = current.version + 1;
        *current = Arc::new(Snapshot::new(Arc::new(next), version));
        debug!("Applied {} -> version {}", mutation.name(), version);
        Ok((output, version))
    }
}
