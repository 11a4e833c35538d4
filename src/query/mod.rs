//! Query operations over the built indices.

mod query_engine;
mod text;

pub use query_engine::{QueryEngine, DEFAULT_SNIPPET_LENGTH};
pub use text::{contains_ignore_case, find_ignore_case, snippet};
