//! Atomically swappable route table.
//!
//! Readers call [`SharedRouteTable::load`] once per request and keep that
//! snapshot for the whole dispatch; a concurrent [`publish`] never blocks them
//! and never shows them a half-built table.
//!
//! [`publish`]: SharedRouteTable::publish

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;

use crate::config::schema::RouteConfig;
use crate::routing::router::{BuildReport, RouteBuildError, RouteDiff, RouteTable};

/// A route table together with the version it was published as.
#[derive(Debug)]
pub struct Snapshot {
    pub version: u64,
    pub table: RouteTable,
}

#[derive(Debug)]
pub struct SharedRouteTable {
    current: ArcSwap<Snapshot>,
    publish_lock: Mutex<()>,
}

impl SharedRouteTable {
    /// Start at version 1 with `table`.
    pub fn new(table: RouteTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot { version: 1, table }),
            publish_lock: Mutex::new(()),
        }
    }

    /// The snapshot in effect right now.
    pub fn load(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn version(&self) -> u64 {
        self.current.load().version
    }

    /// Swap in `table` and return its version.
    pub fn publish(&self, table: RouteTable) -> u64 {
        let guard = self.lock_publishers();
        self.store_locked(&guard, table)
    }

    /// Rebuild from `configs` against the current table and publish the
    /// result. Unchanged routes are shared with the previous snapshot.
    ///
    /// The rebuild and the swap happen under the publish lock, so a
    /// concurrent reload always diffs against the table it replaces.
    pub fn reload(&self, configs: &[RouteConfig]) -> ReloadOutcome {
        let guard = self.lock_publishers();
        let previous = self.load();
        let BuildReport {
            table,
            rejected,
            diff,
        } = RouteTable::rebuild(&previous.table, configs);
        let routes = table.len();
        let version = self.store_locked(&guard, table);
        drop(guard);

        tracing::info!(
            version,
            routes,
            added = ?diff.added,
            removed = ?diff.removed,
            changed = ?diff.changed,
            rejected = rejected.len(),
            "Route table published"
        );

        ReloadOutcome {
            version,
            routes,
            rejected,
            diff,
        }
    }

    // The lock guards no data; poisoning is ignored.
    fn lock_publishers(&self) -> MutexGuard<'_, ()> {
        self.publish_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn store_locked(&self, _guard: &MutexGuard<'_, ()>, table: RouteTable) -> u64 {
        let version = self.current.load().version + 1;
        self.current.store(Arc::new(Snapshot { version, table }));
        version
    }
}

/// What a [`SharedRouteTable::reload`] published.
#[derive(Debug)]
pub struct ReloadOutcome {
    pub version: u64,
    pub routes: usize,
    pub rejected: Vec<RouteBuildError>,
    pub diff: RouteDiff,
}

impl Default for SharedRouteTable {
    fn default() -> Self {
        Self::new(RouteTable::empty())
    }
}
