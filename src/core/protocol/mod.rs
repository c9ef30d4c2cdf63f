// src/core/protocol/mod.rs

pub mod flat_json;
pub use flat_json::{FlatObject, decode_flat, encode_request, unquote};
