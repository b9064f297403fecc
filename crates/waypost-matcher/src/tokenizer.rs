//! Path pattern tokenizer.
//!
//! Patterns are split on `/` into segments made of static text and params:
//!
//! - `{name}`: one path segment
//! - `{name:regex}`: a segment matching a custom regex
//! - `{name:*}`: the rest of the path, `/` included
//! - a trailing `?`, `+` or `*` after the closing brace makes the param
//!   optional, repeatable, or both
//! - `\` escapes the next character in static text

use std::iter::Peekable;
use std::str::Chars;

use waypost_core::{RouterError, RouterResult};

/// Regex a `{name:*}` param compiles to.
pub(crate) const WILDCARD_PATTERN: &str = ".*";

/// A param token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamToken {
	/// Param name.
	pub name: String,
	/// Custom regex, if any.
	pub regexp: Option<String>,
	/// Marked with `?` or `*`.
	pub optional: bool,
	/// Marked with `+` or `*`.
	pub repeatable: bool,
}

/// A piece of a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
	/// Literal text.
	Static(String),
	/// A param.
	Param(ParamToken),
}

/// Tokens of one segment, between two slashes.
pub type Segment = Vec<Token>;

fn invalid(path: &str, reason: impl Into<String>) -> RouterError {
	RouterError::InvalidPath {
		path: path.to_string(),
		reason: reason.into(),
	}
}

/// Splits `path` into segments of tokens.
///
/// `""` and `"/"` both produce a single empty segment.
pub fn tokenize_path(path: &str) -> RouterResult<Vec<Segment>> {
	if path.is_empty() || path == "/" {
		return Ok(vec![Vec::new()]);
	}
	let Some(rest) = path.strip_prefix('/') else {
		return Err(invalid(path, "route paths should start with a \"/\""));
	};

	let mut segments = Vec::new();
	let mut segment = Segment::new();
	let mut buffer = String::new();
	let mut chars = rest.chars().peekable();

	while let Some(c) = chars.next() {
		match c {
			'\\' => match chars.next() {
				Some(escaped) => buffer.push(escaped),
				None => return Err(invalid(path, "trailing escape character")),
			},
			'/' => {
				flush_static(&mut buffer, &mut segment);
				segments.push(std::mem::take(&mut segment));
			}
			'{' => {
				flush_static(&mut buffer, &mut segment);
				segment.push(Token::Param(read_param(path, &mut chars)?));
			}
			'}' => return Err(invalid(path, "unmatched \"}\"")),
			_ => buffer.push(c),
		}
	}
	flush_static(&mut buffer, &mut segment);
	segments.push(segment);

	for segment in &segments {
		if segment.len() < 2 {
			continue;
		}
		let repeatable = segment.iter().find_map(|token| match token {
			Token::Param(param) if param.repeatable => Some(&param.name),
			_ => None,
		});
		if let Some(name) = repeatable {
			return Err(invalid(
				path,
				format!("a repeatable param ({name}) must be alone in its segment"),
			));
		}
	}

	Ok(segments)
}

fn flush_static(buffer: &mut String, segment: &mut Segment) {
	if !buffer.is_empty() {
		segment.push(Token::Static(std::mem::take(buffer)));
	}
}

fn read_param(path: &str, chars: &mut Peekable<Chars<'_>>) -> RouterResult<ParamToken> {
	let mut name = String::new();
	let mut regexp = None;

	loop {
		match chars.next() {
			None => return Err(invalid(path, format!("unterminated param \"{name}\""))),
			Some('}') => break,
			Some(':') => {
				regexp = Some(read_regexp(path, &name, chars)?);
				break;
			}
			Some(c) if c.is_alphanumeric() || c == '_' => name.push(c),
			Some(c) => {
				return Err(invalid(
					path,
					format!("invalid character {c:?} in param name \"{name}\""),
				));
			}
		}
	}

	if name.is_empty() {
		return Err(invalid(path, "empty param name"));
	}

	let regexp = match regexp.as_deref() {
		Some("") => {
			return Err(invalid(path, format!("empty custom regexp for param \"{name}\"")));
		}
		Some("*") => Some(WILDCARD_PATTERN.to_string()),
		_ => regexp,
	};

	let (optional, repeatable) = match chars.peek() {
		Some('?') => (true, false),
		Some('+') => (false, true),
		Some('*') => (true, true),
		_ => (false, false),
	};
	if optional || repeatable {
		chars.next();
	}

	Ok(ParamToken {
		name,
		regexp,
		optional,
		repeatable,
	})
}

/// Reads a custom regex up to the closing brace of the param. Braces used by
/// quantifiers such as `\d{2,4}` are balanced.
fn read_regexp(path: &str, name: &str, chars: &mut Peekable<Chars<'_>>) -> RouterResult<String> {
	let mut regexp = String::new();
	let mut depth = 0usize;

	loop {
		match chars.next() {
			None => {
				return Err(invalid(
					path,
					format!("unterminated custom regexp for param \"{name}\""),
				));
			}
			Some('\\') => {
				regexp.push('\\');
				if let Some(escaped) = chars.next() {
					regexp.push(escaped);
				}
			}
			Some('{') => {
				depth += 1;
				regexp.push('{');
			}
			Some('}') if depth == 0 => return Ok(regexp),
			Some('}') => {
				depth -= 1;
				regexp.push('}');
			}
			Some(c) => regexp.push(c),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn param(name: &str, regexp: Option<&str>, optional: bool, repeatable: bool) -> Token {
		Token::Param(ParamToken {
			name: name.to_string(),
			regexp: regexp.map(str::to_string),
			optional,
			repeatable,
		})
	}

	#[rstest]
	#[case("")]
	#[case("/")]
	fn test_root(#[case] path: &str) {
		assert_eq!(tokenize_path(path).unwrap(), vec![Vec::<Token>::new()]);
	}

	#[rstest]
	fn test_static_and_params() {
		let segments = tokenize_path("/users/{id}/posts").unwrap();
		assert_eq!(
			segments,
			vec![
				vec![Token::Static("users".into())],
				vec![param("id", None, false, false)],
				vec![Token::Static("posts".into())],
			]
		);
	}

	#[rstest]
	fn test_trailing_slash_adds_empty_segment() {
		let segments = tokenize_path("/users/").unwrap();
		assert_eq!(segments.len(), 2);
		assert!(segments[1].is_empty());
	}

	#[rstest]
	#[case("/{id}?", false, true)]
	#[case("/{id}+", true, false)]
	#[case("/{id}*", true, true)]
	fn test_modifiers(#[case] path: &str, #[case] repeatable: bool, #[case] optional: bool) {
		let segments = tokenize_path(path).unwrap();
		assert_eq!(segments, vec![vec![param("id", None, optional, repeatable)]]);
	}

	#[rstest]
	fn test_custom_regexp_with_quantifier() {
		let segments = tokenize_path("/{year:\\d{4}}-{slug}").unwrap();
		assert_eq!(
			segments,
			vec![vec![
				param("year", Some("\\d{4}"), false, false),
				Token::Static("-".into()),
				param("slug", None, false, false),
			]]
		);
	}

	#[rstest]
	fn test_wildcard() {
		let segments = tokenize_path("/files/{path:*}").unwrap();
		assert_eq!(segments[1], vec![param("path", Some(".*"), false, false)]);
	}

	#[rstest]
	fn test_escaped_characters_are_static() {
		let segments = tokenize_path("/a\\{b\\}").unwrap();
		assert_eq!(segments, vec![vec![Token::Static("a{b}".into())]]);
	}

	#[rstest]
	#[case("users")]
	#[case("/users/{id")]
	#[case("/users/{}")]
	#[case("/users/{id:}")]
	#[case("/users/{i-d}")]
	#[case("/users/}")]
	#[case("/files-{paths}+")]
	#[case("/a\\")]
	fn test_invalid_paths(#[case] path: &str) {
		let err = tokenize_path(path).unwrap_err();
		assert!(matches!(err, RouterError::InvalidPath { .. }), "{err}");
	}
}
