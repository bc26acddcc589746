//! Cache configuration derived from the `[cache]` settings section.

use std::sync::Arc;
use std::time::Duration;

use super::store::{NoopPageListCache, PageListCache, TtlPageListCache};

const DEFAULT_PAGE_LIST_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// When `false` every read goes to the store.
    pub enabled: bool,
    /// Lifetime of a populated page-list slot.
    pub page_list_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_list_ttl: DEFAULT_PAGE_LIST_TTL,
        }
    }
}

impl CacheConfig {
    pub fn build(&self) -> Arc<dyn PageListCache> {
        if self.enabled {
            Arc::new(TtlPageListCache::new())
        } else {
            Arc::new(NoopPageListCache)
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            page_list_ttl: Duration::from_secs(settings.page_list_ttl_seconds),
        }
    }
}
