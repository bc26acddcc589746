//! Page-list cache.
//!
//! The side panel on every page needs the full list of pages, so the list is
//! kept in a single in-process slot with a time-to-live. Every mutation of the
//! page set removes the slot; the next read repopulates it from the store.
//!
//! ```toml
//! [cache]
//! enabled = true
//! page_list_ttl_seconds = 1800
//! ```

mod config;
mod lock;
mod store;

pub use config::CacheConfig;
pub use store::{NoopPageListCache, PAGE_LIST_KEY, PageListCache, TtlPageListCache};
