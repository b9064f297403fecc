//! The route table.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use waypost_core::{
	RouteLocation, RouteMeta, RouteParams, RouteRecord, RouteRecordRaw, RouterError, RouterResult,
};

use crate::parser::{PathParser, PathParserOptions, compare_path_parser_score};

/// A normalized record with its compiled pattern and parent.
pub struct RouteRecordMatcher {
	record: Arc<RouteRecord>,
	parser: PathParser,
	parent: Option<Arc<RouteRecordMatcher>>,
}

impl RouteRecordMatcher {
	/// The normalized record.
	pub fn record(&self) -> &Arc<RouteRecord> {
		&self.record
	}

	/// The compiled pattern.
	pub fn parser(&self) -> &PathParser {
		&self.parser
	}

	/// The parent matcher, for nested routes.
	pub fn parent(&self) -> Option<&Arc<RouteRecordMatcher>> {
		self.parent.as_ref()
	}

	/// Returns `true` if `ancestor` is this matcher's parent, grandparent, and
	/// so on.
	pub fn is_descendant_of(&self, ancestor: &Arc<RouteRecordMatcher>) -> bool {
		let mut current = self.parent.as_ref();
		while let Some(parent) = current {
			if Arc::ptr_eq(parent, ancestor) {
				return true;
			}
			current = parent.parent.as_ref();
		}
		false
	}

	/// Records from the root down to this one.
	fn matched(&self) -> Vec<Arc<RouteRecord>> {
		let mut matched = vec![Arc::clone(&self.record)];
		let mut current = self.parent.as_ref();
		while let Some(parent) = current {
			matched.push(Arc::clone(&parent.record));
			current = parent.parent.as_ref();
		}
		matched.reverse();
		matched
	}
}

impl fmt::Debug for RouteRecordMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRecordMatcher")
			.field("path", &self.record.path())
			.field("name", &self.record.name())
			.field("regex", &self.parser.regex_source())
			.finish()
	}
}

/// A location the matcher can resolve.
#[derive(Debug, Clone, PartialEq)]
pub enum MatcherLocation {
	/// An absolute, encoded path.
	Path(String),
	/// A named route with encoded params.
	Named {
		/// Route name.
		name: String,
		/// Params used to build the path.
		params: RouteParams,
	},
	/// Encoded params applied to the current route.
	Relative {
		/// Params overriding the current ones.
		params: RouteParams,
	},
}

/// The parts of the current location the matcher needs.
#[derive(Debug, Clone, Copy)]
pub struct CurrentLocation<'a> {
	/// Current route name.
	pub name: Option<&'a str>,
	/// Current path.
	pub path: &'a str,
	/// Current params.
	pub params: &'a RouteParams,
}

impl<'a> From<&'a RouteLocation> for CurrentLocation<'a> {
	fn from(location: &'a RouteLocation) -> Self {
		Self {
			name: location.name.as_deref(),
			path: &location.path,
			params: &location.params,
		}
	}
}

/// Result of resolving a [`MatcherLocation`].
#[derive(Debug, Clone)]
pub struct MatchedRoute {
	/// Name of the deepest matched record.
	pub name: Option<String>,
	/// Encoded path.
	pub path: String,
	/// Encoded params.
	pub params: RouteParams,
	/// Matched records, root first. Empty when no route matches a path.
	pub matched: Vec<Arc<RouteRecord>>,
	/// Merged meta of the matched records.
	pub meta: RouteMeta,
}

/// Holds every route and resolves locations against them.
///
/// Matchers are kept sorted by rank, so resolving a path returns the most
/// specific route. Routes of equal rank keep their insertion order, with
/// children ahead of their parent.
pub struct RouterMatcher {
	matchers: Vec<Arc<RouteRecordMatcher>>,
	names: HashMap<String, Arc<RouteRecordMatcher>>,
	options: PathParserOptions,
}

impl RouterMatcher {
	/// Creates an empty matcher; `options` apply to every record that does not
	/// override them.
	pub fn new(options: PathParserOptions) -> Self {
		Self {
			matchers: Vec::new(),
			names: HashMap::new(),
			options,
		}
	}

	/// Creates a matcher holding `routes`.
	pub fn with_routes(
		routes: impl IntoIterator<Item = RouteRecordRaw>,
		options: PathParserOptions,
	) -> RouterResult<Self> {
		let mut matcher = Self::new(options);
		for route in routes {
			matcher.add_route(&route, None)?;
		}
		Ok(matcher)
	}

	/// Adds `raw` and its children, nested under `parent` when given.
	///
	/// An existing route with the same name is replaced. The whole tree is
	/// compiled before anything is inserted, so an invalid child leaves the
	/// table untouched.
	pub fn add_route(
		&mut self,
		raw: &RouteRecordRaw,
		parent: Option<&Arc<RouteRecordMatcher>>,
	) -> RouterResult<Arc<RouteRecordMatcher>> {
		let mut compiled = Vec::new();
		let matcher = self.compile(raw, parent, &mut compiled)?;

		for matcher in compiled {
			if let Some(name) = matcher.record.name() {
				if self.names.contains_key(name) {
					tracing::debug!(name, "replacing route with the same name");
					self.remove_route(name);
				}
			}
			self.insert(matcher);
		}
		Ok(matcher)
	}

	fn compile(
		&self,
		raw: &RouteRecordRaw,
		parent: Option<&Arc<RouteRecordMatcher>>,
		compiled: &mut Vec<Arc<RouteRecordMatcher>>,
	) -> RouterResult<Arc<RouteRecordMatcher>> {
		let path = match parent {
			Some(parent) if !raw.path.starts_with('/') => {
				let parent_path = parent.record.path();
				let connecting_slash = if parent_path.ends_with('/') { "" } else { "/" };
				if raw.path.is_empty() {
					parent_path.to_string()
				} else {
					format!("{parent_path}{connecting_slash}{}", raw.path)
				}
			}
			_ => raw.path.clone(),
		};

		let options = PathParserOptions {
			sensitive: raw.sensitive.unwrap_or(self.options.sensitive),
			strict: raw.strict.unwrap_or(self.options.strict),
			end: raw.end.unwrap_or(self.options.end),
		};
		let parser = PathParser::new(&path, options)?;
		warn_duplicated_params(&parser);

		let matcher = Arc::new(RouteRecordMatcher {
			record: Arc::new(RouteRecord::normalize(raw, path)),
			parser,
			parent: parent.cloned(),
		});

		if let Some(parent) = parent {
			if raw.path.starts_with('/') {
				warn_missing_parent_params(&matcher, parent);
			}
		}

		for child in &raw.children {
			self.compile(child, Some(&matcher), compiled)?;
		}
		compiled.push(Arc::clone(&matcher));
		Ok(matcher)
	}

	fn insert(&mut self, matcher: Arc<RouteRecordMatcher>) {
		let index = self
			.matchers
			.iter()
			.position(|existing| {
				compare_path_parser_score(&matcher.parser, &existing.parser) == Ordering::Less
			})
			.unwrap_or(self.matchers.len());

		if let Some(name) = matcher.record.name() {
			self.names.insert(name.to_string(), Arc::clone(&matcher));
		}
		self.matchers.insert(index, matcher);
	}

	/// Removes the route named `name` and all routes nested in it.
	///
	/// Returns `false` if no route has that name.
	pub fn remove_route(&mut self, name: &str) -> bool {
		match self.names.get(name).cloned() {
			Some(matcher) => {
				self.remove_matcher(&matcher);
				true
			}
			None => false,
		}
	}

	/// Removes `matcher` and all matchers nested in it.
	pub fn remove_matcher(&mut self, matcher: &Arc<RouteRecordMatcher>) {
		let removed: Vec<Arc<RouteRecordMatcher>> = self
			.matchers
			.iter()
			.filter(|m| Arc::ptr_eq(m, matcher) || m.is_descendant_of(matcher))
			.cloned()
			.collect();

		self.matchers
			.retain(|m| !removed.iter().any(|r| Arc::ptr_eq(m, r)));
		for removed in &removed {
			if let Some(name) = removed.record.name() {
				if self
					.names
					.get(name)
					.is_some_and(|current| Arc::ptr_eq(current, removed))
				{
					self.names.remove(name);
				}
			}
		}
	}

	/// Removes every route.
	pub fn clear_routes(&mut self) {
		self.matchers.clear();
		self.names.clear();
	}

	/// Normalized records, most specific first.
	pub fn get_routes(&self) -> Vec<Arc<RouteRecord>> {
		self.matchers.iter().map(|m| Arc::clone(&m.record)).collect()
	}

	/// All matchers, most specific first.
	pub fn get_matchers(&self) -> &[Arc<RouteRecordMatcher>] {
		&self.matchers
	}

	/// The matcher of the route named `name`.
	pub fn get_record_matcher(&self, name: &str) -> Option<Arc<RouteRecordMatcher>> {
		self.names.get(name).cloned()
	}

	/// Returns `true` if a route named `name` exists.
	pub fn has_route(&self, name: &str) -> bool {
		self.names.contains_key(name)
	}

	/// Resolves `location` relative to `current`.
	///
	/// A path that matches nothing resolves with empty `matched`; an unknown
	/// name is an error.
	///
	/// # Errors
	///
	/// Returns [`RouterError::MatcherNotFound`] for unknown names (or when the
	/// current route cannot be found for a relative location) and the
	/// stringify errors of [`PathParser::stringify`].
	pub fn resolve(
		&self,
		location: &MatcherLocation,
		current: CurrentLocation<'_>,
	) -> RouterResult<MatchedRoute> {
		let (matcher, path, params) = match location {
			MatcherLocation::Named { name, params } => {
				let matcher = self
					.names
					.get(name)
					.cloned()
					.ok_or_else(|| RouterError::MatcherNotFound {
						location: format!("route named \"{name}\""),
					})?;

				// required params of the target default to the current ones
				let mut merged = RouteParams::new();
				for key in matcher.parser.keys() {
					let value = params.get(&key.name).or_else(|| {
						if key.optional {
							None
						} else {
							current.params.get(&key.name)
						}
					});
					if let Some(value) = value {
						merged.insert(key.name.clone(), value.clone());
					}
				}
				for extra in params.keys().filter(|k| !merged.contains_key(*k)) {
					tracing::debug!(name = %name, param = %extra, "discarding param unknown to the route");
				}

				let path = matcher.parser.stringify(&merged)?;
				(Some(matcher), path, merged)
			}
			MatcherLocation::Path(path) => {
				if !path.starts_with('/') {
					tracing::warn!(path = %path, "the matcher cannot resolve relative paths");
				}
				let matcher = self.matchers.iter().find(|m| m.parser.is_match(path)).cloned();
				let params = matcher
					.as_ref()
					.and_then(|m| m.parser.parse(path))
					.unwrap_or_default();
				(matcher, path.clone(), params)
			}
			MatcherLocation::Relative { params } => {
				let matcher = match current.name {
					Some(name) => self.names.get(name).cloned(),
					None => self
						.matchers
						.iter()
						.find(|m| m.parser.is_match(current.path))
						.cloned(),
				}
				.ok_or_else(|| RouterError::MatcherNotFound {
					location: current.path.to_string(),
				})?;

				let mut merged = current.params.clone();
				merged.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
				let path = matcher.parser.stringify(&merged)?;
				(Some(matcher), path, merged)
			}
		};

		let matched = matcher.as_ref().map(|m| m.matched()).unwrap_or_default();
		let meta = matched.iter().fold(RouteMeta::new(), |mut meta, record| {
			meta.extend(record.meta().iter().map(|(k, v)| (k.clone(), v.clone())));
			meta
		});

		Ok(MatchedRoute {
			name: matcher
				.as_ref()
				.and_then(|m| m.record.name().map(str::to_string)),
			path,
			params,
			matched,
			meta,
		})
	}
}

impl fmt::Debug for RouterMatcher {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterMatcher")
			.field("matchers", &self.matchers)
			.field("options", &self.options)
			.finish()
	}
}

fn warn_duplicated_params(parser: &PathParser) {
	let keys = parser.keys();
	for (index, key) in keys.iter().enumerate() {
		if keys[..index].iter().any(|k| k.name == key.name) {
			tracing::warn!(
				param = %key.name,
				path = parser.pattern(),
				"found duplicated params with the same name"
			);
		}
	}
}

fn warn_missing_parent_params(matcher: &RouteRecordMatcher, parent: &RouteRecordMatcher) {
	for key in parent.parser.keys() {
		if !matcher.parser.keys().iter().any(|k| k.name == key.name) {
			tracing::warn!(
				path = matcher.record.path(),
				parent = parent.record.path(),
				param = %key.name,
				"absolute child path should have the same params as its parent"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use waypost_core::ParamValue;

	#[fixture]
	fn matcher() -> RouterMatcher {
		RouterMatcher::with_routes(
			[
				RouteRecordRaw::new("/").name("home"),
				RouteRecordRaw::new("/users/{id}")
					.name("user")
					.meta("section", "users")
					.child(RouteRecordRaw::new("").name("user-home"))
					.child(
						RouteRecordRaw::new("posts/{post}")
							.name("user-post")
							.meta("title", "Post"),
					),
				RouteRecordRaw::new("/users/new").name("user-new"),
				RouteRecordRaw::new("/{path:*}").name("not-found"),
			],
			PathParserOptions::default(),
		)
		.unwrap()
	}

	fn at<'a>(path: &'a str, params: &'a RouteParams) -> CurrentLocation<'a> {
		CurrentLocation {
			name: None,
			path,
			params,
		}
	}

	fn names(matched: &[Arc<RouteRecord>]) -> Vec<Option<&str>> {
		matched.iter().map(|r| r.name()).collect()
	}

	#[rstest]
	fn test_static_route_beats_param(matcher: RouterMatcher) {
		let empty = RouteParams::new();
		let resolved = matcher
			.resolve(&MatcherLocation::Path("/users/new".into()), at("/", &empty))
			.unwrap();
		assert_eq!(resolved.name.as_deref(), Some("user-new"));
	}

	#[rstest]
	fn test_nested_route_matched_root_first(matcher: RouterMatcher) {
		// Arrange
		let empty = RouteParams::new();

		// Act
		let resolved = matcher
			.resolve(&MatcherLocation::Path("/users/7/posts/hi".into()), at("/", &empty))
			.unwrap();

		// Assert
		assert_eq!(names(&resolved.matched), vec![Some("user"), Some("user-post")]);
		assert_eq!(resolved.params.get("id"), Some(&ParamValue::from("7")));
		assert_eq!(resolved.params.get("post"), Some(&ParamValue::from("hi")));
		assert_eq!(resolved.meta.get("section"), Some(&serde_json::json!("users")));
		assert_eq!(resolved.meta.get("title"), Some(&serde_json::json!("Post")));
	}

	#[rstest]
	fn test_empty_child_path_wins_over_parent(matcher: RouterMatcher) {
		let empty = RouteParams::new();
		let resolved = matcher
			.resolve(&MatcherLocation::Path("/users/7".into()), at("/", &empty))
			.unwrap();
		assert_eq!(names(&resolved.matched), vec![Some("user"), Some("user-home")]);
	}

	#[rstest]
	fn test_catch_all_matches_unknown_paths(matcher: RouterMatcher) {
		let empty = RouteParams::new();
		let resolved = matcher
			.resolve(&MatcherLocation::Path("/nope/deep".into()), at("/", &empty))
			.unwrap();
		assert_eq!(resolved.name.as_deref(), Some("not-found"));
		assert_eq!(resolved.params.get("path"), Some(&ParamValue::from("nope/deep")));
	}

	#[rstest]
	fn test_unmatched_path_has_no_records() {
		let matcher = RouterMatcher::with_routes(
			[RouteRecordRaw::new("/about")],
			PathParserOptions::default(),
		)
		.unwrap();
		let empty = RouteParams::new();

		let resolved = matcher
			.resolve(&MatcherLocation::Path("/missing".into()), at("/", &empty))
			.unwrap();

		assert!(resolved.matched.is_empty());
		assert_eq!(resolved.path, "/missing");
	}

	#[rstest]
	fn test_named_resolution_reuses_current_required_params(matcher: RouterMatcher) {
		// Arrange
		let mut current_params = RouteParams::new();
		current_params.insert("id".into(), ParamValue::from("7"));
		let current = CurrentLocation {
			name: Some("user"),
			path: "/users/7",
			params: &current_params,
		};
		let mut params = RouteParams::new();
		params.insert("post".into(), ParamValue::from("intro"));

		// Act
		let resolved = matcher
			.resolve(
				&MatcherLocation::Named {
					name: "user-post".into(),
					params,
				},
				current,
			)
			.unwrap();

		// Assert
		assert_eq!(resolved.path, "/users/7/posts/intro");
		assert_eq!(resolved.name.as_deref(), Some("user-post"));
	}

	#[rstest]
	fn test_named_resolution_unknown_name(matcher: RouterMatcher) {
		let empty = RouteParams::new();
		let err = matcher
			.resolve(
				&MatcherLocation::Named {
					name: "ghost".into(),
					params: RouteParams::new(),
				},
				at("/", &empty),
			)
			.unwrap_err();
		assert!(matches!(err, RouterError::MatcherNotFound { .. }));
	}

	#[rstest]
	fn test_named_resolution_missing_param(matcher: RouterMatcher) {
		let empty = RouteParams::new();
		let err = matcher
			.resolve(
				&MatcherLocation::Named {
					name: "user".into(),
					params: RouteParams::new(),
				},
				at("/", &empty),
			)
			.unwrap_err();
		assert!(matches!(err, RouterError::MissingParam { .. }));
	}

	#[rstest]
	fn test_relative_resolution_updates_params(matcher: RouterMatcher) {
		let mut current_params = RouteParams::new();
		current_params.insert("id".into(), ParamValue::from("7"));
		let mut params = RouteParams::new();
		params.insert("id".into(), ParamValue::from("8"));

		let resolved = matcher
			.resolve(
				&MatcherLocation::Relative { params },
				CurrentLocation {
					name: None,
					path: "/users/7",
					params: &current_params,
				},
			)
			.unwrap();

		assert_eq!(resolved.path, "/users/8");
	}

	#[rstest]
	fn test_remove_route_removes_children(mut matcher: RouterMatcher) {
		// Act
		let removed = matcher.remove_route("user");

		// Assert
		assert!(removed);
		assert!(!matcher.has_route("user"));
		assert!(!matcher.has_route("user-post"));
		assert!(!matcher.has_route("user-home"));
		assert!(matcher.has_route("user-new"));
		assert!(!matcher.remove_route("user"));
	}

	#[rstest]
	fn test_add_route_replaces_same_name(mut matcher: RouterMatcher) {
		matcher
			.add_route(&RouteRecordRaw::new("/profile/{id}").name("user"), None)
			.unwrap();

		let record = matcher.get_record_matcher("user").unwrap();
		assert_eq!(record.record().path(), "/profile/{id}");
		// children of the replaced route are gone
		assert!(!matcher.has_route("user-post"));
	}

	#[rstest]
	fn test_add_child_to_existing_parent(mut matcher: RouterMatcher) {
		let parent = matcher.get_record_matcher("user").unwrap();
		matcher
			.add_route(&RouteRecordRaw::new("settings").name("user-settings"), Some(&parent))
			.unwrap();

		let empty = RouteParams::new();
		let resolved = matcher
			.resolve(&MatcherLocation::Path("/users/3/settings".into()), at("/", &empty))
			.unwrap();
		assert_eq!(names(&resolved.matched), vec![Some("user"), Some("user-settings")]);
	}

	#[rstest]
	fn test_invalid_child_leaves_table_untouched() {
		let mut matcher = RouterMatcher::new(PathParserOptions::default());
		let err = matcher
			.add_route(
				&RouteRecordRaw::new("/ok")
					.name("ok")
					.child(RouteRecordRaw::new("{broken").name("broken")),
				None,
			)
			.unwrap_err();

		assert!(matches!(err, RouterError::InvalidPath { .. }));
		assert!(matcher.get_routes().is_empty());
	}

	#[rstest]
	fn test_record_options_override_global() {
		let matcher = RouterMatcher::with_routes(
			[RouteRecordRaw::new("/Strict").name("strict").sensitive(true)],
			PathParserOptions::default(),
		)
		.unwrap();
		let empty = RouteParams::new();

		let resolved = matcher
			.resolve(&MatcherLocation::Path("/strict".into()), at("/", &empty))
			.unwrap();

		assert!(resolved.matched.is_empty());
	}
}
