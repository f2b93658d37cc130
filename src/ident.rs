//! Identifier sanitation. Externally supplied table/column/enum names pass
//! through here before any allow-list check or interpolation into SQL text.
//! Values never do; they always bind as parameters.

use regex::Regex;
use std::sync::OnceLock;

fn strip_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\s\[\](){}<>,;:=+*&%#@?!|/\\"'`^~-]+"#).expect("valid pattern"))
}

/// Remove whitespace and special characters from an externally supplied
/// identifier. A fully stripped input comes back empty; the allow-list check
/// rejects it downstream.
pub fn sanitize(text: &str) -> String {
    strip_pattern().replace_all(text, "").into_owned()
}

/// Double-quote an identifier for PostgreSQL. Only called on names that
/// already passed sanitation and the allow-list.
pub fn quoted(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
