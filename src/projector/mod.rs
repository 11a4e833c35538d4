//! Projection of decoded object-store values into the domain model.
//!
//! [`schema`] checks the minimal shape of each store's values once, at the
//! boundary. [`DomainProjector`] folds the accepted records into a [`CacheIndex`];
//! records that fail the shape check are counted and skipped.

mod cache_index;
mod domain_projector;
mod error;
pub mod schema;

pub use cache_index::CacheIndex;
pub use domain_projector::{
    normalize_user_id, DomainProjector, BUDDYLIST_STORE, CONVERSATIONS_STORE, PEOPLE_STORE,
    REPLYCHAINS_STORE,
};
pub use error::{ProjectionError, Result};
