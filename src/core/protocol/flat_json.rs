// src/core/protocol/flat_json.rs

//! Implements the minimal text codec used on the wire.
//!
//! Requests are rendered as `{"id": <id>, "action": "<action>", "params": {...}}`
//! and responses are read back as a *flat* object: a single level of
//! string keys mapped to string values. The decoder is intentionally shallow.
//! It splits on `,` and `:` without tracking nesting or quoting, so nested
//! objects (such as a `"result"` payload) come out as garbage fragments while
//! the top-level `"id"` and `"type"` fields that precede them stay intact.

use indexmap::IndexMap;
use std::fmt::Write;

/// A decoded flat object. Keys keep the order in which they appeared on the wire.
pub type FlatObject = IndexMap<String, String>;

const OBJECT_OPEN: char = '{';
const OBJECT_CLOSE: char = '}';
const QUOTE: char = '"';
const FIELD_SEPARATOR: char = ',';
const KEY_VALUE_SEPARATOR: char = ':';

/// Renders a request into its wire form.
///
/// Keys and values are wrapped in quotes but are *not* escaped. The output is
/// only well-formed when none of the inputs contain `"`, `,` or `}`.
pub fn encode_request(action: &str, id: u64, params: &IndexMap<String, String>) -> String {
    let mut out = String::with_capacity(48 + action.len() + params.len() * 16);
    // Writing into a `String` cannot fail.
    let _ = write!(out, "{{\"id\": {id}, \"action\": {}, \"params\": {{", quote(action));
    for (i, (name, value)) in params.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_SEPARATOR);
        }
        let _ = write!(out, "{}: {}", quote(name), quote(value));
    }
    out.push_str("}}");
    out
}

/// Decodes a flat object from a text frame.
///
/// Returns `None` when the trimmed message is not delimited by `{` and `}`.
/// Fragments that carry no `:` are dropped. A repeated key keeps the last value.
pub fn decode_flat(message: &str) -> Option<FlatObject> {
    let trimmed = message.trim();
    let body = trimmed
        .strip_prefix(OBJECT_OPEN)?
        .strip_suffix(OBJECT_CLOSE)?;

    let object = body
        .split(FIELD_SEPARATOR)
        .filter_map(|fragment| fragment.split_once(KEY_VALUE_SEPARATOR))
        .map(|(key, value)| (unquote(key).to_string(), unquote(value).to_string()))
        .collect();
    Some(object)
}

/// Trims whitespace and strips exactly one layer of surrounding double quotes.
/// Interior characters are returned as-is.
pub fn unquote(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with(QUOTE) && value.ends_with(QUOTE) {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push(QUOTE);
    out.push_str(value);
    out.push(QUOTE);
    out
}
