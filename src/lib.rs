//! teams-cache-rs - Read-only decoding and querying of the Teams desktop
//! client's IndexedDB cache.
//!
//! The build pass runs once per [`TeamsCache`]: LevelDB records are resolved,
//! IndexedDB metadata locates the object stores of interest, their values are
//! decoded into object graphs and projected into conversation, message and
//! participant indices that every query then reads.

pub mod cache;
pub mod cli;
pub mod config;
pub mod indexeddb;
pub mod leveldb;
pub mod model;
pub mod projector;
pub mod query;
pub mod render;
pub mod util;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{locate_cache, BuildSettings, CacheError, TeamsCache};
pub use model::{
    CallRecord, Conversation, ConversationHistory, Message, Participant, SearchMatch, Summary,
    UserStats,
};
pub use query::QueryEngine;
pub use render::{HtmlTextRenderer, PlainTextRenderer, TextRenderer};
