//! Request decoding: bodies by content type, query strings and headers.
//!
//! Everything is decoded into [`serde_json::Value`] so that validation
//! schemas can treat every request part uniformly.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap};
use http::Method;
use serde_json::map::Entry;
use serde_json::{Map, Value};
use tracing::trace;

/// Returns the lower-cased media type of the request, without parameters.
///
/// `Content-Type: Application/JSON; charset=utf-8` yields `application/json`.
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let essence = raw.split(';').next()?.trim();
    (!essence.is_empty()).then(|| essence.to_ascii_lowercase())
}

/// Parses a request body according to its content type.
///
/// | Content type                          | Result                         |
/// |---------------------------------------|--------------------------------|
/// | `application/json`, `*/*+json`        | parsed JSON, `None` if invalid |
/// | `text/*`                              | the raw text as a string       |
/// | `application/x-www-form-urlencoded`   | an object of fields            |
/// | anything else                         | `None`                         |
///
/// GET and HEAD requests and empty bodies never produce a value.
pub fn parse_body(method: &Method, headers: &HeaderMap, body: &Bytes) -> Option<Value> {
    if *method == Method::GET || *method == Method::HEAD || body.is_empty() {
        return None;
    }

    let media = media_type(headers)?;
    if media == "application/json" || media.ends_with("+json") {
        match serde_json::from_slice(body) {
            Ok(value) => Some(value),
            Err(e) => {
                trace!(error = %e, "Discarding malformed JSON body");
                None
            }
        }
    } else if media.starts_with("text/") {
        Some(Value::String(String::from_utf8_lossy(body).into_owned()))
    } else if media == "application/x-www-form-urlencoded" {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(body)
            .ok()
            .map(pairs_to_object)
    } else {
        None
    }
}

/// Parses a query string into an object.
///
/// Repeated keys collect their values into an array in order of appearance.
/// A missing or malformed query string yields an empty object.
pub fn parse_query(query: Option<&str>) -> Value {
    let pairs = query
        .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
        .unwrap_or_default();
    pairs_to_object(pairs)
}

/// Converts a header map into an object keyed by lower-case header name.
///
/// Repeated headers are joined with `", "`; values that are not visible
/// ASCII are decoded lossily.
pub fn headers_to_value(headers: &HeaderMap) -> Value {
    let mut map = Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_owned(), Value::String(joined));
    }
    Value::Object(map)
}

fn pairs_to_object(pairs: Vec<(String, String)>) -> Value {
    let mut map = Map::new();
    for (key, value) in pairs {
        let value = Value::String(value);
        match map.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(mut slot) => match slot.get_mut() {
                Value::Array(items) => items.push(value),
                existing => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
            },
        }
    }
    Value::Object(map)
}
