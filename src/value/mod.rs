//! Record value decoding.
//!
//! [`decode_record_value`] unwraps the IndexedDB value envelope and decodes the
//! structured-clone object graph inside it into a [`DecodedGraph`].

mod decoded_value;
mod deserializer;
mod error;

pub use decoded_value::{DecodedGraph, DecodedValue, ObjectProperties};
pub use deserializer::{
    decode_record_value, read_object_graph, MAX_DEPTH, TRAILER_OFFSET_TAG, WRAPPER_TAG,
};
pub use error::{DecodeError, Result};
