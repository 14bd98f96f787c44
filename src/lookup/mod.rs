//! Resource lookup cache.
//!
//! Resolves the numeric foreign keys embedded in tasks (installers, sales
//! orders, addresses) to descriptive records:
//! - only ids that are not cached yet are fetched, one batch per kind
//! - kinds are fetched concurrently and fail independently
//! - entries persist across runs and are only removed by [`LookupCache::clear`]

mod cache;
mod enrich;
mod kinds;

pub use cache::LookupCache;
pub use kinds::LookupKind;
