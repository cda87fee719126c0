//! In-memory TTL cache for search results.
//!
//! This module provides a source-agnostic caching mechanism that:
//! - Keys results by a canonical query (see [`QueryKey`])
//! - Serves an entry without any network call while it is still valid
//! - Replaces an entry wholesale when it is refreshed
//! - Never serves an expired entry when a refresh fails; the error goes to the caller
//!
//! Nothing is persisted. Entries live as long as the process does.

mod layer;
mod traits;

pub use layer::QueryCache;
pub use traits::{CacheResult, CacheSource, QueryKey};
