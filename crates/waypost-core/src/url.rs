//! URL splitting, relative path resolution and base handling.

use crate::location::LocationQuery;
use crate::query::{parse_query, stringify_query};

/// A location string split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
	/// Path with the search and hash appended.
	pub full_path: String,
	/// Absolute path, resolved against the current one when relative.
	pub path: String,
	/// Parsed search.
	pub query: LocationQuery,
	/// Hash including `#`, or an empty string.
	pub hash: String,
}

/// Splits `location` into path, query and hash using [`parse_query`].
pub fn parse_url(location: &str, current_location: &str) -> ParsedUrl {
	parse_url_with(&parse_query, location, current_location)
}

/// Splits `location` into path, query and hash.
///
/// The search starts at the first `?`; the hash starts at the first `#` at or
/// after it. A relative path is resolved against `current_location`.
pub fn parse_url_with(
	parse: &dyn Fn(&str) -> LocationQuery,
	location: &str,
	current_location: &str,
) -> ParsedUrl {
	let search_pos = location.find('?');
	let hash_pos = location[search_pos.unwrap_or(0)..]
		.find('#')
		.map(|pos| pos + search_pos.unwrap_or(0));

	let mut path = None;
	let mut search = "";
	let mut query = LocationQuery::new();
	let mut hash = "";

	if let Some(search_pos) = search_pos {
		path = Some(&location[..search_pos]);
		search = &location[search_pos + 1..hash_pos.unwrap_or(location.len())];
		query = parse(search);
	}
	if let Some(hash_pos) = hash_pos {
		path = path.or(Some(&location[..hash_pos]));
		hash = &location[hash_pos..];
	}

	let path = resolve_relative_path(path.unwrap_or(location), current_location);
	let full_path = if search.is_empty() {
		format!("{path}{hash}")
	} else {
		format!("{path}?{search}{hash}")
	};

	ParsedUrl {
		full_path,
		path,
		query,
		hash: hash.to_string(),
	}
}

/// Joins a path, a query and a hash with [`stringify_query`].
pub fn stringify_url(path: &str, query: &LocationQuery, hash: &str) -> String {
	stringify_url_with(&stringify_query, path, query, hash)
}

/// Joins a path, a query and a hash.
pub fn stringify_url_with(
	stringify: &dyn Fn(&LocationQuery) -> String,
	path: &str,
	query: &LocationQuery,
	hash: &str,
) -> String {
	let search = stringify(query);
	if search.is_empty() {
		format!("{path}{hash}")
	} else {
		format!("{path}?{search}{hash}")
	}
}

/// Removes `base` from the start of `pathname`, ignoring ASCII case.
///
/// Returns `/` when nothing is left and `pathname` unchanged when it does not
/// start with `base`.
pub fn strip_base(pathname: &str, base: &str) -> String {
	if base.is_empty() {
		return pathname.to_string();
	}
	match pathname.get(..base.len()) {
		Some(prefix) if prefix.eq_ignore_ascii_case(base) => {
			let rest = &pathname[base.len()..];
			if rest.is_empty() {
				"/".to_string()
			} else {
				rest.to_string()
			}
		}
		_ => pathname.to_string(),
	}
}

/// Resolves `to` against the absolute path `from`.
///
/// Absolute targets are returned unchanged and an empty target yields
/// `from`. `.` segments are skipped, `..` segments pop one segment of `from`
/// but never go above the root.
pub fn resolve_relative_path(to: &str, from: &str) -> String {
	if to.starts_with('/') {
		return to.to_string();
	}
	if !from.starts_with('/') {
		tracing::warn!(
			to,
			from,
			"cannot resolve a relative location without an absolute path"
		);
		return to.to_string();
	}
	if to.is_empty() {
		return from.to_string();
	}

	let from_segments: Vec<&str> = from.split('/').collect();
	let to_segments: Vec<&str> = to.split('/').collect();

	let mut position = from_segments.len() - 1;
	let mut to_position = 0;
	while to_position < to_segments.len() {
		let segment = to_segments[to_position];
		// position 1 is the root segment
		if position == 1 || segment == "." {
			to_position += 1;
			continue;
		}
		if segment == ".." {
			position -= 1;
			to_position += 1;
		} else {
			break;
		}
	}

	// keep the last segment when every segment was consumed
	if to_position == to_segments.len() {
		to_position -= 1;
	}

	format!(
		"{}/{}",
		from_segments[..position].join("/"),
		to_segments[to_position..].join("/")
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::location::QueryValue;
	use rstest::rstest;

	#[rstest]
	fn test_parse_url_splits_parts() {
		// Act
		let parsed = parse_url("/users/1?tab=posts#bio", "/");

		// Assert
		assert_eq!(parsed.path, "/users/1");
		assert_eq!(parsed.query.get("tab"), Some(&QueryValue::from("posts")));
		assert_eq!(parsed.hash, "#bio");
		assert_eq!(parsed.full_path, "/users/1?tab=posts#bio");
	}

	#[rstest]
	fn test_parse_url_hash_only() {
		let parsed = parse_url("/docs#intro", "/");
		assert_eq!(parsed.path, "/docs");
		assert_eq!(parsed.hash, "#intro");
		assert!(parsed.query.is_empty());
		assert_eq!(parsed.full_path, "/docs#intro");
	}

	#[rstest]
	fn test_parse_url_empty_search_is_dropped_from_full_path() {
		let parsed = parse_url("/a?#h", "/");
		assert_eq!(parsed.path, "/a");
		assert_eq!(parsed.full_path, "/a#h");
	}

	#[rstest]
	fn test_parse_url_question_mark_after_hash_stays_in_search() {
		// the hash is searched for after the first '?'
		let parsed = parse_url("/a#b?c=1", "/");
		assert_eq!(parsed.path, "/a#b");
		assert_eq!(parsed.query.get("c"), Some(&QueryValue::from("1")));
		assert_eq!(parsed.hash, "");
	}

	#[rstest]
	#[case("?page=2", "/users/1", "/users/1")]
	#[case("#top", "/users/1", "/users/1")]
	#[case("posts", "/users/1", "/users/posts")]
	fn test_parse_url_relative(#[case] location: &str, #[case] current: &str, #[case] path: &str) {
		assert_eq!(parse_url(location, current).path, path);
	}

	#[rstest]
	#[case("/absolute", "/a/b", "/absolute")]
	#[case("", "/a/b", "/a/b")]
	#[case("c", "/a/b", "/a/c")]
	#[case("./c", "/a/b", "/a/c")]
	#[case("../c", "/a/b/d", "/a/c")]
	#[case("../../../../c", "/a/b", "/c")]
	#[case("c", "/", "/c")]
	fn test_resolve_relative_path(#[case] to: &str, #[case] from: &str, #[case] expected: &str) {
		assert_eq!(resolve_relative_path(to, from), expected);
	}

	#[rstest]
	fn test_resolve_relative_path_with_relative_from_returns_target() {
		assert_eq!(resolve_relative_path("c", "a/b"), "c");
	}

	#[rstest]
	fn test_stringify_url() {
		let mut query = LocationQuery::new();
		assert_eq!(stringify_url("/a", &query, "#h"), "/a#h");

		query.insert("x".into(), QueryValue::from("1"));
		assert_eq!(stringify_url("/a", &query, "#h"), "/a?x=1#h");
	}

	#[rstest]
	#[case("/app/users", "/app", "/users")]
	#[case("/APP/users", "/app", "/users")]
	#[case("/app", "/app", "/")]
	#[case("/other", "/app", "/other")]
	#[case("/users", "", "/users")]
	fn test_strip_base(#[case] pathname: &str, #[case] base: &str, #[case] expected: &str) {
		assert_eq!(strip_base(pathname, base), expected);
	}
}
