//! Compiled path patterns.
//!
//! A [`PathParser`] turns a tokenized pattern into a regex, extracts params
//! from matching paths, builds paths back from params, and carries a score
//! used to rank routes: static segments beat params, params with a custom
//! regex beat plain ones, optional, repeatable and wildcard params rank last.

use std::cmp::Ordering;
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use waypost_core::{ParamValue, RouteParams, RouterError, RouterResult};

use crate::tokenizer::{Segment, Token, WILDCARD_PATTERN, tokenize_path};

/// Maximum allowed length for a route pattern in bytes.
const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum allowed number of path segments in a route pattern.
const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum allowed size for a compiled route regex (in bytes).
const MAX_REGEX_SIZE: usize = 1 << 20; // 1 MiB

/// Regex used for params without a custom one.
const BASE_PARAM_PATTERN: &str = "[^/]+?";

mod score {
	pub(super) const SEGMENT: f64 = 40.0;
	pub(super) const STATIC: f64 = 40.0;
	pub(super) const DYNAMIC: f64 = 20.0;
	pub(super) const ROOT: f64 = 90.0;
	pub(super) const BONUS_CUSTOM_REGEXP: f64 = 10.0;
	pub(super) const BONUS_WILDCARD: f64 = -50.0;
	pub(super) const BONUS_REPEATABLE: f64 = -20.0;
	pub(super) const BONUS_OPTIONAL: f64 = -8.0;
	pub(super) const BONUS_STRICT: f64 = 0.7;
	pub(super) const BONUS_CASE_SENSITIVE: f64 = 0.25;
}

/// Matching options of a path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PathParserOptions {
	/// Match case-sensitively.
	pub sensitive: bool,
	/// Do not allow an optional trailing slash.
	pub strict: bool,
	/// The pattern must match the whole path.
	pub end: bool,
}

impl Default for PathParserOptions {
	fn default() -> Self {
		Self {
			sensitive: false,
			strict: false,
			end: true,
		}
	}
}

/// A param captured by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamKey {
	/// Param name.
	pub name: String,
	/// The param may be missing.
	pub optional: bool,
	/// The param may span several segments.
	pub repeatable: bool,
	group: String,
}

/// A compiled path pattern.
#[derive(Clone)]
pub struct PathParser {
	pattern: String,
	regex: Regex,
	score: Vec<Vec<f64>>,
	keys: Vec<ParamKey>,
	segments: Vec<Segment>,
}

impl PathParser {
	/// Compiles `pattern`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPath`] if the pattern is longer than 1024
	/// bytes, has more than 32 segments, is malformed, or compiles to an
	/// invalid regex.
	pub fn new(pattern: &str, options: PathParserOptions) -> RouterResult<Self> {
		if pattern.len() > MAX_PATTERN_LENGTH {
			return Err(RouterError::InvalidPath {
				path: pattern.to_string(),
				reason: format!(
					"pattern length {} exceeds maximum allowed length of {} bytes",
					pattern.len(),
					MAX_PATTERN_LENGTH
				),
			});
		}

		let segment_count = pattern.split('/').count();
		if segment_count > MAX_PATH_SEGMENTS {
			return Err(RouterError::InvalidPath {
				path: pattern.to_string(),
				reason: format!(
					"pattern has {} path segments, exceeding maximum of {}",
					segment_count, MAX_PATH_SEGMENTS
				),
			});
		}

		let segments = tokenize_path(pattern)?;
		Self::from_segments(pattern, segments, options)
	}

	fn from_segments(
		pattern: &str,
		segments: Vec<Segment>,
		options: PathParserOptions,
	) -> RouterResult<Self> {
		let mut source = String::from("^");
		let mut scores = Vec::with_capacity(segments.len());
		let mut keys: Vec<ParamKey> = Vec::new();

		for segment in &segments {
			let mut segment_scores = Vec::new();
			if segment.is_empty() {
				segment_scores.push(score::ROOT);
				if options.strict {
					source.push('/');
				}
			}

			for (index, token) in segment.iter().enumerate() {
				let mut sub_score = score::SEGMENT;
				if options.sensitive {
					sub_score += score::BONUS_CASE_SENSITIVE;
				}

				match token {
					Token::Static(value) => {
						if index == 0 {
							source.push('/');
						}
						source.push_str(&regex::escape(value));
						sub_score += score::STATIC;
					}
					Token::Param(param) => {
						let group = format!("p{}", keys.len());
						let re = param.regexp.as_deref().unwrap_or(BASE_PARAM_PATTERN);
						if re != BASE_PARAM_PATTERN {
							sub_score += score::BONUS_CUSTOM_REGEXP;
						}

						let mut sub_pattern = if param.repeatable {
							format!("(?P<{group}>(?:{re})(?:/(?:{re}))*)")
						} else {
							format!("(?P<{group}>{re})")
						};
						if index == 0 {
							sub_pattern = if param.optional && segment.len() < 2 {
								format!("(?:/{sub_pattern})")
							} else {
								format!("/{sub_pattern}")
							};
						}
						if param.optional {
							sub_pattern.push('?');
						}
						source.push_str(&sub_pattern);

						sub_score += score::DYNAMIC;
						if param.optional {
							sub_score += score::BONUS_OPTIONAL;
						}
						if param.repeatable {
							sub_score += score::BONUS_REPEATABLE;
						}
						if re == WILDCARD_PATTERN {
							sub_score += score::BONUS_WILDCARD;
						}

						keys.push(ParamKey {
							name: param.name.clone(),
							optional: param.optional,
							repeatable: param.repeatable,
							group,
						});
					}
				}
				segment_scores.push(sub_score);
			}
			scores.push(segment_scores);
		}

		if options.strict && options.end {
			if let Some(last) = scores.last_mut().and_then(|s| s.last_mut()) {
				*last += score::BONUS_STRICT;
			}
		}

		if !options.strict {
			source.push_str("/?");
		}
		if options.end {
			source.push('$');
		} else if options.strict {
			source.push_str("(?:/|$)");
		}

		let regex = RegexBuilder::new(&source)
			.case_insensitive(!options.sensitive)
			.size_limit(MAX_REGEX_SIZE)
			.build()
			.map_err(|e| RouterError::InvalidPath {
				path: pattern.to_string(),
				reason: format!("failed to compile pattern regex: {}", e),
			})?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
			score: scores,
			keys,
			segments,
		})
	}

	/// The pattern this parser was compiled from.
	pub fn pattern(&self) -> &str {
		&self.pattern
	}

	/// Params captured by the pattern, in order.
	pub fn keys(&self) -> &[ParamKey] {
		&self.keys
	}

	/// Ranking score, one list of sub-scores per segment.
	pub fn score(&self) -> &[Vec<f64>] {
		&self.score
	}

	/// Compiled regex source.
	pub fn regex_source(&self) -> &str {
		self.regex.as_str()
	}

	/// Returns `true` if `path` matches.
	pub fn is_match(&self, path: &str) -> bool {
		self.regex.is_match(path)
	}

	/// Extracts params from `path`, or `None` if it does not match.
	///
	/// Values are returned as they appear in the path (still encoded);
	/// repeatable params are split on `/`.
	pub fn parse(&self, path: &str) -> Option<RouteParams> {
		let captures = self.regex.captures(path)?;
		let mut params = RouteParams::new();
		for key in &self.keys {
			let value = captures.name(&key.group).map_or("", |m| m.as_str());
			let value = if key.repeatable && !value.is_empty() {
				ParamValue::List(value.split('/').map(str::to_string).collect())
			} else {
				ParamValue::Single(value.to_string())
			};
			params.insert(key.name.clone(), value);
		}
		Some(params)
	}

	/// Builds a path from `params`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MissingParam`] when a required param is absent
	/// or empty, and [`RouterError::InvalidParam`] when a list is given for a
	/// param that is not repeatable.
	pub fn stringify(&self, params: &RouteParams) -> RouterResult<String> {
		let mut path = String::new();
		let mut avoid_duplicated_slash = false;

		for segment in &self.segments {
			if !avoid_duplicated_slash || !path.ends_with('/') {
				path.push('/');
			}
			avoid_duplicated_slash = false;

			for token in segment {
				let param = match token {
					Token::Static(value) => {
						path.push_str(value);
						continue;
					}
					Token::Param(param) => param,
				};

				let text = match params.get(&param.name) {
					Some(ParamValue::List(_)) if !param.repeatable => {
						return Err(RouterError::InvalidParam {
							param: param.name.clone(),
							reason: "a list was provided but the param is not repeatable".to_string(),
						});
					}
					Some(ParamValue::List(values)) => values.join("/"),
					Some(ParamValue::Single(value)) => value.clone(),
					None => String::new(),
				};

				if text.is_empty() {
					if !param.optional {
						return Err(RouterError::MissingParam {
							param: param.name.clone(),
							path: self.pattern.clone(),
						});
					}
					if segment.len() < 2 && path.len() > 1 && path.ends_with('/') {
						path.pop();
					} else {
						avoid_duplicated_slash = true;
					}
				}
				path.push_str(&text);
			}
		}

		Ok(path)
	}
}

impl fmt::Debug for PathParser {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PathParser")
			.field("pattern", &self.pattern)
			.field("regex", &self.regex.as_str())
			.field("score", &self.score)
			.field("keys", &self.keys)
			.finish()
	}
}

fn compare_score_array(a: &[f64], b: &[f64]) -> Ordering {
	for (x, y) in a.iter().zip(b) {
		// higher scores rank first
		match y.partial_cmp(x) {
			Some(Ordering::Equal) | None => {}
			Some(ordering) => return ordering,
		}
	}

	let single_static = |s: &[f64]| s.len() == 1 && s[0] == score::SEGMENT + score::STATIC;
	match a.len().cmp(&b.len()) {
		// `/users` ranks before `/users{id}`, any other shorter segment after
		Ordering::Less if single_static(a) => Ordering::Less,
		Ordering::Less => Ordering::Greater,
		Ordering::Greater if single_static(b) => Ordering::Greater,
		Ordering::Greater => Ordering::Less,
		Ordering::Equal => Ordering::Equal,
	}
}

/// Orders two parsers by rank. `Ordering::Less` means `a` must be tried
/// before `b`.
pub fn compare_path_parser_score(a: &PathParser, b: &PathParser) -> Ordering {
	for (sa, sb) in a.score.iter().zip(&b.score) {
		let ordering = compare_score_array(sa, sb);
		if ordering != Ordering::Equal {
			return ordering;
		}
	}
	// more segments rank first
	b.score.len().cmp(&a.score.len())
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;

	fn parser(pattern: &str) -> PathParser {
		PathParser::new(pattern, PathParserOptions::default()).unwrap()
	}

	fn params(entries: &[(&str, ParamValue)]) -> RouteParams {
		entries
			.iter()
			.map(|(k, v)| (k.to_string(), v.clone()))
			.collect()
	}

	#[rstest]
	#[case("/", "/", true)]
	#[case("/", "", true)]
	#[case("/users", "/users", true)]
	#[case("/users", "/users/", true)]
	#[case("/users", "/USERS", true)]
	#[case("/users", "/users/1", false)]
	#[case("/users/{id}", "/users/42", true)]
	#[case("/users/{id}", "/users/", false)]
	#[case("/users/{id}?", "/users", true)]
	#[case("/{year:\\d{4}}", "/2024", true)]
	#[case("/{year:\\d{4}}", "/24", false)]
	#[case("/files/{path:*}", "/files/a/b/c", true)]
	fn test_is_match(#[case] pattern: &str, #[case] path: &str, #[case] expected: bool) {
		assert_eq!(parser(pattern).is_match(path), expected);
	}

	#[rstest]
	fn test_strict_and_sensitive_options() {
		let options = PathParserOptions {
			sensitive: true,
			strict: true,
			end: true,
		};
		let p = PathParser::new("/users", options).unwrap();

		assert!(p.is_match("/users"));
		assert!(!p.is_match("/users/"));
		assert!(!p.is_match("/Users"));
	}

	#[rstest]
	fn test_end_false_matches_prefix() {
		let options = PathParserOptions {
			end: false,
			..PathParserOptions::default()
		};
		let p = PathParser::new("/docs", options).unwrap();

		assert!(p.is_match("/docs/intro"));
	}

	#[rstest]
	fn test_parse_params() {
		// Arrange
		let p = parser("/users/{id}/posts/{post_id}");

		// Act
		let parsed = p.parse("/users/7/posts/hello").unwrap();

		// Assert
		assert_eq!(parsed.get("id"), Some(&ParamValue::from("7")));
		assert_eq!(parsed.get("post_id"), Some(&ParamValue::from("hello")));
	}

	#[rstest]
	fn test_parse_repeatable_splits_on_slash() {
		let p = parser("/tags/{tags}+");
		let parsed = p.parse("/tags/a/b/c").unwrap();
		assert_eq!(parsed.get("tags"), Some(&ParamValue::from(vec!["a", "b", "c"])));
	}

	#[rstest]
	fn test_parse_missing_optional_is_empty() {
		let p = parser("/users/{id}?");
		let parsed = p.parse("/users").unwrap();
		assert_eq!(parsed.get("id"), Some(&ParamValue::from("")));
	}

	#[rstest]
	fn test_custom_regexp_with_groups_keeps_param_positions() {
		let p = parser("/{lang:(en|fr)}/{page}");
		let parsed = p.parse("/fr/about").unwrap();
		assert_eq!(parsed.get("lang"), Some(&ParamValue::from("fr")));
		assert_eq!(parsed.get("page"), Some(&ParamValue::from("about")));
	}

	#[rstest]
	fn test_stringify() {
		let p = parser("/users/{id}/posts");
		let path = p
			.stringify(&params(&[("id", ParamValue::from("7"))]))
			.unwrap();
		assert_eq!(path, "/users/7/posts");
	}

	#[rstest]
	#[case("/users/{id}?", "/users")]
	#[case("/{id}?", "/")]
	#[case("/{lang}?/about", "/about")]
	fn test_stringify_skips_missing_optional(#[case] pattern: &str, #[case] expected: &str) {
		assert_eq!(parser(pattern).stringify(&RouteParams::new()).unwrap(), expected);
	}

	#[rstest]
	fn test_stringify_repeatable_joins_values() {
		let p = parser("/tags/{tags}*");
		let path = p
			.stringify(&params(&[("tags", ParamValue::from(vec!["a", "b"]))]))
			.unwrap();
		assert_eq!(path, "/tags/a/b");
	}

	#[rstest]
	fn test_stringify_missing_required_param() {
		let err = parser("/users/{id}").stringify(&RouteParams::new()).unwrap_err();
		assert!(matches!(err, RouterError::MissingParam { param, .. } if param == "id"));
	}

	#[rstest]
	fn test_stringify_list_for_single_param() {
		let err = parser("/users/{id}")
			.stringify(&params(&[("id", ParamValue::from(vec!["1", "2"]))]))
			.unwrap_err();
		assert!(matches!(err, RouterError::InvalidParam { .. }));
	}

	#[rstest]
	fn test_pattern_limits() {
		let long = format!("/{}", "a".repeat(MAX_PATTERN_LENGTH));
		assert!(PathParser::new(&long, PathParserOptions::default()).is_err());

		let deep = "/a".repeat(MAX_PATH_SEGMENTS + 1);
		assert!(PathParser::new(&deep, PathParserOptions::default()).is_err());
	}

	#[rstest]
	fn test_invalid_custom_regexp() {
		let err = PathParser::new("/{id:(}", PathParserOptions::default()).unwrap_err();
		assert!(matches!(err, RouterError::InvalidPath { .. }));
	}

	#[rstest]
	#[case("/users", "/{id}")]
	#[case("/users/new", "/users/{id}")]
	#[case("/{id:\\d+}", "/{id}")]
	#[case("/{id}", "/{id}?")]
	#[case("/{id}", "/{ids}+")]
	#[case("/{ids}+", "/{path:*}")]
	#[case("/users/{id}", "/users")]
	#[case("/", "/{path:*}")]
	fn test_ranking(#[case] first: &str, #[case] second: &str) {
		assert_eq!(
			compare_path_parser_score(&parser(first), &parser(second)),
			Ordering::Less,
			"{first} should rank before {second}"
		);
	}

	#[rstest]
	fn test_same_pattern_ranks_equal() {
		assert_eq!(
			compare_path_parser_score(&parser("/a/{b}"), &parser("/a/{c}")),
			Ordering::Equal
		);
	}

	proptest! {
		#[test]
		fn prop_stringify_then_parse_returns_params(id in "[a-z0-9]{1,12}", slug in "[a-z0-9-]{1,12}") {
			let p = parser("/users/{id}/posts/{slug}");
			let built = p
				.stringify(&params(&[("id", ParamValue::from(id.as_str())), ("slug", ParamValue::from(slug.as_str()))]))
				.unwrap();
			let parsed = p.parse(&built).unwrap();
			prop_assert_eq!(parsed.get("id"), Some(&ParamValue::from(id.as_str())));
			prop_assert_eq!(parsed.get("slug"), Some(&ParamValue::from(slug.as_str())));
		}
	}
}
