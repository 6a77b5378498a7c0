use percent_encoding::utf8_percent_encode;
use serde_json::Value;

use crate::models::{ViewArguments, VIEW_PARAMETERS};
use crate::naming::COMPONENT;

/// Encode a key-like argument so the server parses it as JSON.
///
/// Arrays and objects are JSON-encoded as-is. Every other value becomes a
/// JSON string literal: strings are quoted (with JSON escaping), and
/// numbers, booleans and null have their text wrapped in double quotes.
fn encode_key(value: &Value) -> String {
    match value {
        Value::Array(_) | Value::Object(_) => value.to_string(),
        Value::String(_) => value.to_string(),
        other => format!("\"{}\"", other),
    }
}

/// Turn view arguments into the `(name, value)` pairs sent on the wire.
///
/// - `key`, `startkey`, `endkey` are JSON-encoded (see [`encode_key`])
/// - `descending` is sent as `"true"` only when set; `false` drops it
/// - `update` is sent as `"false"` only when disabled; `true` drops it
/// - everything else passes through, `extra` last in name order; `extra`
///   entries named like a dedicated field are dropped
pub fn normalize_view_arguments(args: &ViewArguments) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if let Some(key) = &args.key {
        pairs.push(("key".to_string(), encode_key(key)));
    }
    if let Some(startkey) = &args.startkey {
        pairs.push(("startkey".to_string(), encode_key(startkey)));
    }
    if let Some(docid) = &args.startkey_docid {
        pairs.push(("startkey_docid".to_string(), docid.clone()));
    }
    if let Some(endkey) = &args.endkey {
        pairs.push(("endkey".to_string(), encode_key(endkey)));
    }
    if let Some(count) = args.count {
        pairs.push(("count".to_string(), count.to_string()));
    }
    if args.update == Some(false) {
        pairs.push(("update".to_string(), "false".to_string()));
    }
    if args.descending == Some(true) {
        pairs.push(("descending".to_string(), "true".to_string()));
    }
    if let Some(skip) = args.skip {
        pairs.push(("skip".to_string(), skip.to_string()));
    }
    // Names with a dedicated field are only ever sent from that field
    for (name, value) in &args.extra {
        if VIEW_PARAMETERS.contains(&name.as_str()) {
            continue;
        }
        pairs.push((name.clone(), value.clone()));
    }

    pairs
}

/// Build `?name=value&...` from view arguments, percent-encoding both sides.
///
/// Returns an empty string when nothing survives normalization, so the
/// result can always be appended to a path.
pub fn build_query_string(args: &ViewArguments) -> String {
    let pairs = normalize_view_arguments(args);
    if pairs.is_empty() {
        return String::new();
    }

    let joined = pairs
        .iter()
        .map(|(name, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(name, COMPONENT),
                utf8_percent_encode(value, COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("?{}", joined)
}
