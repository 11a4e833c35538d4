//! The cache facade: locating the store, building the indices once, and
//! serving queries.

mod build;
mod error;
mod locate;
mod teams_cache;

pub use build::{build_index, BuildSettings};
pub use error::{CacheError, Result};
pub use locate::{candidate_paths_for, locate_cache, locate_cache_for};
pub use teams_cache::TeamsCache;
