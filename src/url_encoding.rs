use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Unreserved characters stay readable, everything else is escaped.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Encodes a string for URL safety and returns an owned `String`
///
/// # Example
/// ```
/// use braintree_coinbase::url_encoding::encode_url_owned;
/// let encoded = encode_url_owned("authorizations:braintree user");
/// assert_eq!(encoded, "authorizations%3Abraintree%20user");
/// ```
pub fn encode_url_owned(input: &str) -> String {
    percent_encode(input.as_bytes(), QUERY_ENCODE_SET).to_string()
}

/// Decodes a URL-encoded query component. `+` is treated as a space.
pub fn decode_url_owned(input: &str) -> String {
    let spaced = input.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Joins key/value pairs into an encoded query string.
pub fn encode_query<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", encode_url_owned(k.as_ref()), encode_url_owned(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// Splits a query string into decoded pairs, keeping their order.
/// Empty segments are skipped and a key without `=` gets an empty value.
pub fn decode_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.split_once('=') {
            Some((k, v)) => (decode_url_owned(k), decode_url_owned(v)),
            None => (decode_url_owned(segment), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn query_pairs_survive_encoding() {
        let query = encode_query(&[("state", "a b/c"), ("meta[x]", "y")]);
        assert_eq!(query, "state=a%20b%2Fc&meta%5Bx%5D=y");
        let pairs = decode_query(&query);
        assert_eq!(pairs[0], ("state".to_string(), "a b/c".to_string()));
        assert_eq!(pairs[1], ("meta[x]".to_string(), "y".to_string()));
    }

    #[test]
    fn decode_tolerates_loose_input() {
        let pairs = decode_query("&flag&code=a+b&");
        assert_eq!(pairs, vec![
            ("flag".to_string(), String::new()),
            ("code".to_string(), "a b".to_string()),
        ]);
    }
}
