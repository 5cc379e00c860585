//! Percent-encoding for expanded values

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Everything except RFC 3986 unreserved characters
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Everything except unreserved and reserved characters
const UNRESERVED_AND_RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// How a value is written into the expansion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Only unreserved characters pass through
    Unreserved,
    /// Reserved characters and existing `%XX` triplets pass through
    Reserved,
    /// Written as-is
    Verbatim,
}

pub fn encode(value: &str, encoding: Encoding) -> String {
    match encoding {
        Encoding::Unreserved => utf8_percent_encode(value, UNRESERVED).to_string(),
        Encoding::Reserved => encode_reserved(value),
        Encoding::Verbatim => value.to_string(),
    }
}

fn encode_reserved(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(index) = rest.find('%') {
        out.push_str(&utf8_percent_encode(&rest[..index], UNRESERVED_AND_RESERVED).to_string());
        let candidate = &rest[index..];
        if is_pct_triplet(candidate) {
            out.push_str(&candidate[..3]);
            rest = &candidate[3..];
        } else {
            out.push_str("%25");
            rest = &candidate[1..];
        }
    }
    out.push_str(&utf8_percent_encode(rest, UNRESERVED_AND_RESERVED).to_string());
    out
}

fn is_pct_triplet(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreserved_encoding() {
        assert_eq!(encode("a b", Encoding::Unreserved), "a%20b");
        assert_eq!(encode("Hello World!", Encoding::Unreserved), "Hello%20World%21");
        assert_eq!(encode("/foo/bar", Encoding::Unreserved), "%2Ffoo%2Fbar");
        assert_eq!(encode("a-b.c_d~e", Encoding::Unreserved), "a-b.c_d~e");
        assert_eq!(encode("é", Encoding::Unreserved), "%C3%A9");
    }

    #[test]
    fn test_reserved_encoding() {
        assert_eq!(encode("/foo/bar", Encoding::Reserved), "/foo/bar");
        assert_eq!(encode("Hello World!", Encoding::Reserved), "Hello%20World!");
        assert_eq!(encode("50%25 off", Encoding::Reserved), "50%25%20off");
        assert_eq!(encode("100%", Encoding::Reserved), "100%25");
    }

    #[test]
    fn test_verbatim_encoding() {
        assert_eq!(encode("a b/c", Encoding::Verbatim), "a b/c");
    }
}
