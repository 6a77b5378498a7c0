use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use std::sync::OnceLock;

/// Reserved id namespace for design documents
pub const DESIGN_PREFIX: &str = "_design/";

/// Characters left alone when escaping a path segment or query component.
/// Everything outside the RFC 3986 unreserved set is percent-encoded.
pub(crate) const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9_$()+/-]+/$").expect("static pattern is valid"))
}

/// Append the trailing slash database names are stored with
pub fn normalize_name(name: &str) -> String {
    if name.ends_with('/') {
        name.to_string()
    } else {
        format!("{}/", name)
    }
}

/// Whether `name` (already slash-terminated) is a legal database name.
///
/// Pure predicate: no normalization happens here, so `"mydb"` without the
/// trailing slash is rejected.
pub fn valid_name(name: &str) -> bool {
    name_pattern().is_match(name)
}

/// Escape every interior `/` of a slash-terminated database name as `%2F`.
///
/// The trailing slash survives and nothing else is escaped: `"a/b/"`
/// becomes `"a%2Fb/"`.
pub fn uri_name(name: &str) -> String {
    let trimmed = name.strip_suffix('/').unwrap_or(name);
    format!("{}/", trimmed.replace('/', "%2F"))
}

/// Percent-encode a single path segment (UTF-8 aware)
pub fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

/// Path segment for a document id.
///
/// Design document ids keep their literal `_design/` prefix, which CouchDB
/// routes on; every other id is escaped as a whole.
pub fn document_segment(id: &str) -> String {
    match id.strip_prefix(DESIGN_PREFIX) {
        Some(rest) => format!("{}{}", DESIGN_PREFIX, escape_segment(rest)),
        None => escape_segment(id),
    }
}

/// Prefix `id` with `_design/` unless it already is
pub fn design_id(id: &str) -> String {
    if is_design_id(id) {
        id.to_string()
    } else {
        format!("{}{}", DESIGN_PREFIX, id)
    }
}

pub fn is_design_id(id: &str) -> bool {
    id.starts_with(DESIGN_PREFIX)
}

/// Design document name with the `_design/` prefix stripped
pub fn short_design_name(id: &str) -> &str {
    id.strip_prefix(DESIGN_PREFIX).unwrap_or(id)
}
