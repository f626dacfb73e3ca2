use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// RFC 3986 unreserved characters pass through untouched, everything else is percent-encoded
const UNRESERVED_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes a string for URL safety and returns an owned `String`
///
/// # Example
/// ```
/// use twitter_oauth_v2::url_encoding::encode_url_owned;
/// assert_eq!(encode_url_owned("tweet.read users.read"), "tweet.read%20users.read");
/// ```
pub fn encode_url_owned(input: &str) -> String {
    percent_encode(input.as_bytes(), UNRESERVED_SET).to_string()
}

/// Decodes a URL-encoded or form-encoded string and returns an owned `String`.
///
/// `+` is treated as a space, as browsers emit it in query strings.
pub fn decode_url_owned(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Joins key/value pairs into a `k=v&k=v` string, preserving order.
///
/// Used both for authorization URL queries and for
/// `application/x-www-form-urlencoded` request bodies.
pub fn build_query<K, V>(params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_url_owned(k.as_ref()), encode_url_owned(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits a query string (with or without a leading `?`) into decoded pairs.
///
/// Repeated keys are kept in order; a key without `=` maps to an empty value.
pub fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode_url_owned(k), decode_url_owned(v)),
            None => (decode_url_owned(pair), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_reserved_characters_only() {
        assert_eq!(encode_url_owned("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(
            encode_url_owned("https://app.local/cb?x=1"),
            "https%3A%2F%2Fapp.local%2Fcb%3Fx%3D1"
        );
    }

    #[test]
    fn query_preserves_order() {
        let query = build_query(&[("b", "2"), ("a", "1 1")]);
        assert_eq!(query, "b=2&a=1%201");
    }

    #[test]
    fn parse_handles_plus_and_missing_values() {
        let pairs = parse_query("?state=abc&error_description=Access+denied&flag");
        assert_eq!(
            pairs,
            vec![
                ("state".to_string(), "abc".to_string()),
                ("error_description".to_string(), "Access denied".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }
}
