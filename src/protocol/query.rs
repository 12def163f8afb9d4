//! Query-string codec for envelopes.
//!
//! Encoding escapes keys and values like `encodeURIComponent`; decoding
//! accepts `+` as a space, drops pairs without a key, and tolerates a
//! leading `?` so both `?a=1` and fragment payloads such as `?=&a=1`
//! decode to the same map.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use tracing::trace;

// ============================================================================
// Public Functions
// ============================================================================

/// Encodes key/value pairs as `k1=v1&k2=v2`, preserving input order.
#[must_use]
pub fn encode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!("{}={}", encode_component(key), encode_component(value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Decodes a query string into a key/value map.
///
/// Later duplicates win. A pair without `=` decodes to an empty value.
#[must_use]
pub fn decode(input: &str) -> BTreeMap<String, String> {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut params = BTreeMap::new();

    for part in input.split('&') {
        let (key, value) = part.split_once('=').unwrap_or((part, ""));
        if key.is_empty() {
            continue;
        }
        params.insert(decode_component(key), decode_component(value));
    }

    params
}

// ============================================================================
// Internal Functions
// ============================================================================

/// Marks `encodeURIComponent` leaves alone but `urlencoding` escapes.
const UNRESERVED_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encodes one component the way `encodeURIComponent` does.
fn encode_component(raw: &str) -> String {
    let encoded = urlencoding::encode(raw).into_owned();
    if !encoded.contains('%') {
        return encoded;
    }
    UNRESERVED_MARKS
        .iter()
        .fold(encoded, |acc, (escaped, mark)| acc.replace(escaped, mark))
}

/// Percent-decodes one component, treating `+` as a space.
///
/// Invalid UTF-8 sequences leave the component as received.
fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(e) => {
            trace!(component = raw, error = %e, "Keeping undecodable component verbatim");
            spaced
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_preserves_order() {
        let qs = encode([("cb", "f1"), ("relation", "opener"), ("a", "1")]);
        assert_eq!(qs, "cb=f1&relation=opener&a=1");
    }

    #[test]
    fn test_encode_escapes() {
        let qs = encode([("origin", "http://a.com/f1"), ("msg", "a b&c")]);
        assert_eq!(qs, "origin=http%3A%2F%2Fa.com%2Ff1&msg=a%20b%26c");
    }

    #[test]
    fn test_encode_keeps_uri_marks() {
        let qs = encode([("relation", "frames['x']"), ("note", "(a*b)!")]);
        assert_eq!(qs, "relation=frames%5B'x'%5D&note=(a*b)!");
    }

    #[test]
    fn test_encode_escaped_percent_not_unescaped() {
        let qs = encode([("raw", "%27%2A")]);
        assert_eq!(qs, "raw=%2527%252A");
        assert_eq!(decode(&qs)["raw"], "%27%2A");
    }

    #[test]
    fn test_decode_basic() {
        let params = decode("cb=999&origin=x");
        assert_eq!(params.get("cb").map(String::as_str), Some("999"));
        assert_eq!(params.get("origin").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_decode_fragment_prefix() {
        let params = decode("?=&cb=f1&relation=parent");
        assert_eq!(params.len(), 2);
        assert_eq!(params["relation"], "parent");
    }

    #[test]
    fn test_decode_plus_and_percent() {
        let params = decode("msg=hello+world%21&empty");
        assert_eq!(params["msg"], "hello world!");
        assert_eq!(params["empty"], "");
    }

    #[test]
    fn test_decode_invalid_utf8_kept() {
        let params = decode("bad=%FF");
        assert_eq!(params["bad"], "%FF");
    }

    #[test]
    fn test_encode_then_decode_special_chars() {
        let qs = encode([("session", "{\"uid\":1,\"k\":\"a=b\"}")]);
        assert_eq!(decode(&qs)["session"], "{\"uid\":1,\"k\":\"a=b\"}");
    }
}
