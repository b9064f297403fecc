//! Percent-encoding rules for the different parts of a URL.
//!
//! Every encoder starts from the browser's `encodeURI` character set and
//! relaxes or tightens it for the part being written, so that values typed by
//! users round-trip through the address bar unchanged.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

/// Characters `encodeURI` escapes.
const URI: &AsciiSet = &CONTROLS
	.add(b' ')
	.add(b'"')
	.add(b'%')
	.add(b'<')
	.add(b'>')
	.add(b'[')
	.add(b'\\')
	.add(b']')
	.add(b'^')
	.add(b'`')
	.add(b'{')
	.add(b'|')
	.add(b'}');

/// Shared base: `|`, `[` and `]` stay readable.
const COMMON: &AsciiSet = &URI.remove(b'|').remove(b'[').remove(b']');

const HASH: &AsciiSet = &COMMON.remove(b'{').remove(b'}').remove(b'^');

const QUERY_VALUE: &AsciiSet = &COMMON
	.remove(b'`')
	.remove(b'{')
	.remove(b'}')
	.remove(b'^')
	.add(b'+')
	.add(b'#')
	.add(b'&');

const QUERY_KEY: &AsciiSet = &QUERY_VALUE.add(b'=');

const PATH: &AsciiSet = &COMMON.add(b'#').add(b'?');

const PARAM: &AsciiSet = &PATH.add(b'/');

/// Encodes the hash part of a URL.
pub fn encode_hash(text: &str) -> String {
	utf8_percent_encode(text, HASH).to_string()
}

/// Encodes a query value. Spaces become `+`.
pub fn encode_query_value(text: &str) -> String {
	// A literal "%20" in the input is written as "%2520", so only encoded
	// spaces are affected.
	utf8_percent_encode(text, QUERY_VALUE)
		.to_string()
		.replace("%20", "+")
}

/// Encodes a query key: like a value, with `=` escaped as well.
pub fn encode_query_key(text: &str) -> String {
	utf8_percent_encode(text, QUERY_KEY)
		.to_string()
		.replace("%20", "+")
}

/// Encodes a path. `#` and `?` are escaped, `/` is kept.
pub fn encode_path(text: &str) -> String {
	utf8_percent_encode(text, PATH).to_string()
}

/// Encodes a single param value. `/` is escaped too.
pub fn encode_param(text: &str) -> String {
	utf8_percent_encode(text, PARAM).to_string()
}

/// Decodes a percent-encoded string.
///
/// Malformed input (a dangling `%` or bytes that are not UTF-8) is returned
/// as is with a warning.
pub fn decode(text: &str) -> String {
	if has_malformed_escape(text) {
		tracing::warn!(text, "error decoding text, using the original");
		return text.to_string();
	}
	match percent_decode_str(text).decode_utf8() {
		Ok(decoded) => decoded.into_owned(),
		Err(err) => {
			tracing::warn!(text, error = %err, "error decoding text, using the original");
			text.to_string()
		}
	}
}

fn has_malformed_escape(text: &str) -> bool {
	let bytes = text.as_bytes();
	bytes.iter().enumerate().any(|(i, &b)| {
		b == b'%'
			&& !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
				&& bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("a b", "a%20b")]
	#[case("/users/[id]|x", "/users/[id]|x")]
	#[case("a#b?c", "a%23b%3Fc")]
	#[case("héllo", "h%C3%A9llo")]
	#[case("100%", "100%25")]
	fn test_encode_path(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(encode_path(input), expected);
	}

	#[rstest]
	fn test_encode_param_escapes_slash() {
		assert_eq!(encode_param("a/b"), "a%2Fb");
		assert_eq!(encode_path("a/b"), "a/b");
	}

	#[rstest]
	#[case("a b", "a+b")]
	#[case("1+1", "1%2B1")]
	#[case("a&b#c", "a%26b%23c")]
	#[case("{x}^`", "{x}^`")]
	#[case("k=v", "k=v")]
	fn test_encode_query_value(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(encode_query_value(input), expected);
	}

	#[rstest]
	fn test_encode_query_key_escapes_equal() {
		assert_eq!(encode_query_key("k=v"), "k%3Dv");
	}

	#[rstest]
	fn test_encode_hash_keeps_braces() {
		assert_eq!(encode_hash("#{a} b^"), "#{a}%20b^");
	}

	#[rstest]
	#[case("h%C3%A9llo", "héllo")]
	#[case("a%2Fb", "a/b")]
	#[case("%E0%A4%A", "%E0%A4%A")]
	#[case("100%", "100%")]
	#[case("%FF", "%FF")]
	fn test_decode(#[case] input: &str, #[case] expected: &str) {
		assert_eq!(decode(input), expected);
	}
}
