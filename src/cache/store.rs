//! Page-list cache storage.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::domain::entities::Page;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Name of the single slot holding the full page list.
pub const PAGE_LIST_KEY: &str = "all-pages";

/// Get/set/remove over the page-list slot.
pub trait PageListCache: Send + Sync {
    /// The cached list, or `None` when the slot is empty or expired.
    fn get(&self) -> Option<Vec<Page>>;

    fn set(&self, pages: Vec<Page>, ttl: Duration);

    fn remove(&self);
}

struct Slot {
    pages: Vec<Page>,
    expires_at: Instant,
}

/// In-process slot with an expiry instant.
#[derive(Default)]
pub struct TtlPageListCache {
    slot: RwLock<Option<Slot>>,
}

impl TtlPageListCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PageListCache for TtlPageListCache {
    fn get(&self) -> Option<Vec<Page>> {
        let guard = rw_read(&self.slot, SOURCE, "get");
        guard
            .as_ref()
            .filter(|slot| Instant::now() < slot.expires_at)
            .map(|slot| slot.pages.clone())
    }

    fn set(&self, pages: Vec<Page>, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        *rw_write(&self.slot, SOURCE, "set") = Some(Slot { pages, expires_at });
    }

    fn remove(&self) {
        rw_write(&self.slot, SOURCE, "remove").take();
    }
}

/// Cache that never holds anything; used when caching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPageListCache;

impl PageListCache for NoopPageListCache {
    fn get(&self) -> Option<Vec<Page>> {
        None
    }

    fn set(&self, _pages: Vec<Page>, _ttl: Duration) {}

    fn remove(&self) {}
}
