//! Concurrent stats store
//!
//! Top-level scopes ("total" and one per SSRC) each sit behind their own
//! mutex, so the ingress and egress paths can update different streams
//! without contending. The scope map itself is only write-locked when a
//! new scope is created.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::sync::watch;

use super::node::{StatNode, StatSnapshot};

/// Scope aggregating all streams of a session
pub const TOTAL_SCOPE: &str = "total";

/// Scope key for a stream
pub fn ssrc_key(ssrc: u32) -> String {
    ssrc.to_string()
}

/// Stats tree for one session
///
/// Consumers read the tree at their own cadence; `subscribe` hands out a
/// receiver whose value is bumped after each processed RTCP packet.
pub struct StatsStore {
    scopes: RwLock<HashMap<String, Arc<Mutex<StatNode>>>>,
    updates: watch::Sender<u64>,
}

impl StatsStore {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(0);
        Self {
            scopes: RwLock::new(HashMap::new()),
            updates,
        }
    }

    /// Get or create a scope
    pub fn scope(&self, key: &str) -> Arc<Mutex<StatNode>> {
        if let Some(scope) = self.get_scope(key) {
            return scope;
        }

        let mut scopes = self.scopes.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            scopes
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(StatNode::new()))),
        )
    }

    /// Get a scope if it exists
    pub fn get_scope(&self, key: &str) -> Option<Arc<Mutex<StatNode>>> {
        let scopes = self.scopes.read().unwrap_or_else(PoisonError::into_inner);
        scopes.get(key).cloned()
    }

    pub fn has_scope(&self, key: &str) -> bool {
        self.scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Run `f` with exclusive access to a scope, creating it if needed
    pub fn with_scope<R>(&self, key: &str, f: impl FnOnce(&mut StatNode) -> R) -> R {
        let scope = self.scope(key);
        let mut node = lock(&scope);
        f(&mut node)
    }

    /// Run `f` against a scope only if it already exists
    pub fn read_scope<R>(&self, key: &str, f: impl FnOnce(&StatNode) -> R) -> Option<R> {
        let scope = self.get_scope(key)?;
        let node = lock(&scope);
        Some(f(&node))
    }

    /// Keys of all scopes
    pub fn scope_keys(&self) -> Vec<String> {
        self.scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Number of scopes
    pub fn len(&self) -> usize {
        self.scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Export the whole tree
    pub fn snapshot(&self) -> StatSnapshot {
        let scopes: Vec<(String, Arc<Mutex<StatNode>>)> = self
            .scopes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(key, scope)| (key.clone(), Arc::clone(scope)))
            .collect();

        StatSnapshot::Scope(
            scopes
                .into_iter()
                .map(|(key, scope)| (key, lock(&scope).snapshot()))
                .collect(),
        )
    }

    /// Export the whole tree as JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    /// Signal consumers that the tree changed
    pub fn notify_update(&self) {
        self.updates.send_modify(|generation| *generation = generation.wrapping_add(1));
    }

    /// Receive update notifications
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.updates.subscribe()
    }

    /// Number of update notifications sent so far
    pub fn update_count(&self) -> u64 {
        *self.updates.borrow()
    }
}

impl Default for StatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StatsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsStore")
            .field("scopes", &self.scope_keys())
            .field("updates", &self.update_count())
            .finish()
    }
}

fn lock(scope: &Mutex<StatNode>) -> MutexGuard<'_, StatNode> {
    scope.lock().unwrap_or_else(PoisonError::into_inner)
}
