//! Generic caching layer for keyed reads.
//!
//! This module provides a domain-agnostic caching mechanism that:
//! - Serves fresh entries without touching the network
//! - Shares one request between concurrent reads of the same key
//! - Refetches entries older than the stale time on next access
//! - Invalidates whole resources and notifies watching queries

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use traits::{CacheResult, QueryKey};
