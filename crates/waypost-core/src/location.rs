//! Raw and normalized route locations.
//!
//! A [`RouteLocationRaw`] is whatever the caller hands to `push`, `replace`
//! or `resolve`: a URL string, a path, a route name with params, or params
//! relative to the current route. Resolution turns it into a
//! [`RouteLocation`], the fully matched form the navigation pipeline and
//! guards work with.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::query::stringify_query;
use crate::record::RouteRecord;

/// Value of a single route param.
///
/// Repeatable params (`{ids}+`, `{ids}*`) resolve to a list, all others to a
/// single string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
	/// A single segment value.
	Single(String),
	/// Values of a repeatable param.
	List(Vec<String>),
}

impl ParamValue {
	/// Returns the value when it is a single string.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Single(value) => Some(value),
			Self::List(_) => None,
		}
	}

	/// Returns every value as a slice of strings.
	pub fn values(&self) -> Vec<&str> {
		match self {
			Self::Single(value) => vec![value.as_str()],
			Self::List(values) => values.iter().map(String::as_str).collect(),
		}
	}

	/// Returns `true` for an empty string or an empty list.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Single(value) => value.is_empty(),
			Self::List(values) => values.is_empty(),
		}
	}

	/// Applies `f` to every value, keeping the shape.
	pub fn map(&self, f: impl Fn(&str) -> String) -> Self {
		match self {
			Self::Single(value) => Self::Single(f(value)),
			Self::List(values) => Self::List(values.iter().map(|v| f(v)).collect()),
		}
	}

	/// Compares two values, treating a one-element list as equal to its
	/// single value.
	pub fn is_equivalent(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Single(a), Self::Single(b)) => a == b,
			(Self::List(a), Self::List(b)) => a == b,
			(Self::List(list), Self::Single(single)) | (Self::Single(single), Self::List(list)) => {
				list.len() == 1 && list[0] == *single
			}
		}
	}
}

impl fmt::Display for ParamValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Single(value) => f.write_str(value),
			Self::List(values) => f.write_str(&values.join("/")),
		}
	}
}

impl From<&str> for ParamValue {
	fn from(value: &str) -> Self {
		Self::Single(value.to_string())
	}
}

impl From<String> for ParamValue {
	fn from(value: String) -> Self {
		Self::Single(value)
	}
}

impl From<Vec<String>> for ParamValue {
	fn from(values: Vec<String>) -> Self {
		Self::List(values)
	}
}

impl From<Vec<&str>> for ParamValue {
	fn from(values: Vec<&str>) -> Self {
		Self::List(values.into_iter().map(str::to_string).collect())
	}
}

/// Params of a location, keyed by param name.
pub type RouteParams = IndexMap<String, ParamValue>;

/// Value of a query key. `None` entries come from keys written without `=`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
	/// The key appeared once.
	Single(Option<String>),
	/// The key appeared several times.
	List(Vec<Option<String>>),
}

impl QueryValue {
	/// First non-null value for the key.
	pub fn first(&self) -> Option<&str> {
		match self {
			Self::Single(value) => value.as_deref(),
			Self::List(values) => values.iter().find_map(|v| v.as_deref()),
		}
	}
}

impl From<&str> for QueryValue {
	fn from(value: &str) -> Self {
		Self::Single(Some(value.to_string()))
	}
}

impl From<String> for QueryValue {
	fn from(value: String) -> Self {
		Self::Single(Some(value))
	}
}

impl From<Option<String>> for QueryValue {
	fn from(value: Option<String>) -> Self {
		Self::Single(value)
	}
}

impl From<Vec<&str>> for QueryValue {
	fn from(values: Vec<&str>) -> Self {
		Self::List(values.into_iter().map(|v| Some(v.to_string())).collect())
	}
}

impl From<Vec<String>> for QueryValue {
	fn from(values: Vec<String>) -> Self {
		Self::List(values.into_iter().map(Some).collect())
	}
}

/// Query of a location, in the order keys were written.
pub type LocationQuery = IndexMap<String, QueryValue>;

/// Arbitrary metadata attached to route records.
pub type RouteMeta = serde_json::Map<String, serde_json::Value>;

/// State payload stored alongside a history entry.
pub type StateData = serde_json::Map<String, serde_json::Value>;

/// What a raw location points at.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationTarget {
	/// A URL string such as `/users/1?tab=posts#bio`, possibly relative.
	Url(String),
	/// A path; query and hash come from the surrounding raw location.
	Path(String),
	/// A named route with params.
	Named {
		/// Route name.
		name: String,
		/// Params used to build the path.
		params: RouteParams,
	},
	/// Params applied to the current route.
	Params(RouteParams),
}

/// A navigation target as written by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLocationRaw {
	/// Where to go.
	pub target: LocationTarget,
	/// Query for non-URL targets.
	pub query: Option<LocationQuery>,
	/// Hash for non-URL targets, including the leading `#`.
	pub hash: Option<String>,
	/// Replace the current history entry instead of pushing.
	pub replace: bool,
	/// Navigate even when the target equals the current location.
	pub force: bool,
	/// State stored with the history entry.
	pub state: Option<StateData>,
}

impl RouteLocationRaw {
	fn with_target(target: LocationTarget) -> Self {
		Self {
			target,
			query: None,
			hash: None,
			replace: false,
			force: false,
			state: None,
		}
	}

	/// A URL string target.
	pub fn url(url: impl Into<String>) -> Self {
		Self::with_target(LocationTarget::Url(url.into()))
	}

	/// A path target.
	pub fn path(path: impl Into<String>) -> Self {
		Self::with_target(LocationTarget::Path(path.into()))
	}

	/// A named route target without params.
	pub fn named(name: impl Into<String>) -> Self {
		Self::with_target(LocationTarget::Named {
			name: name.into(),
			params: RouteParams::new(),
		})
	}

	/// A target that only changes params of the current route.
	pub fn params(params: RouteParams) -> Self {
		Self::with_target(LocationTarget::Params(params))
	}

	/// Adds a param to a named or params-only target.
	///
	/// Params on URL and path targets are ignored during resolution, so they
	/// are dropped here with a warning.
	pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
		match &mut self.target {
			LocationTarget::Named { params, .. } | LocationTarget::Params(params) => {
				params.insert(key.into(), value.into());
			}
			LocationTarget::Url(path) | LocationTarget::Path(path) => {
				tracing::warn!(path = %path, "params passed to a path location are ignored");
			}
		}
		self
	}

	/// Adds a query entry.
	pub fn with_query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
		self.query
			.get_or_insert_with(LocationQuery::new)
			.insert(key.into(), value.into());
		self
	}

	/// Sets the hash. It should start with `#`.
	pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
		self.hash = Some(hash.into());
		self
	}

	/// Sets the history state payload.
	pub fn with_state(mut self, state: StateData) -> Self {
		self.state = Some(state);
		self
	}

	/// Marks the navigation as a history replacement.
	pub fn replacing(mut self) -> Self {
		self.replace = true;
		self
	}

	/// Forces the navigation even when it is a duplicate.
	pub fn forced(mut self) -> Self {
		self.force = true;
		self
	}
}

impl From<&str> for RouteLocationRaw {
	fn from(url: &str) -> Self {
		Self::url(url)
	}
}

impl From<String> for RouteLocationRaw {
	fn from(url: String) -> Self {
		Self::url(url)
	}
}

impl From<&RouteLocation> for RouteLocationRaw {
	fn from(location: &RouteLocation) -> Self {
		Self::url(location.full_path.clone())
	}
}

/// A fully resolved location.
#[derive(Clone)]
pub struct RouteLocation {
	/// Encoded path with query and hash.
	pub full_path: String,
	/// Encoded path.
	pub path: String,
	/// Decoded query.
	pub query: LocationQuery,
	/// Decoded hash, including the leading `#` when present.
	pub hash: String,
	/// Name of the matched route.
	pub name: Option<String>,
	/// Decoded params.
	pub params: RouteParams,
	/// Matched records, root first.
	pub matched: Vec<Arc<RouteRecord>>,
	/// Meta of every matched record merged, deepest record wins.
	pub meta: RouteMeta,
	/// Location originally requested before redirects.
	pub redirected_from: Option<Arc<RouteLocation>>,
	/// Link target for this location, as produced by the history.
	pub href: String,
}

impl RouteLocation {
	/// The location the router reports before its first navigation.
	pub fn start() -> Self {
		Self {
			full_path: "/".to_string(),
			path: "/".to_string(),
			query: LocationQuery::new(),
			hash: String::new(),
			name: None,
			params: RouteParams::new(),
			matched: Vec::new(),
			meta: RouteMeta::new(),
			redirected_from: None,
			href: String::new(),
		}
	}

	/// Deepest matched record.
	pub fn leaf(&self) -> Option<&Arc<RouteRecord>> {
		self.matched.last()
	}

	/// Single-valued param by name.
	pub fn param(&self, name: &str) -> Option<&str> {
		self.params.get(name).and_then(ParamValue::as_str)
	}

	/// Returns `true` when `record` is one of the matched records.
	pub fn contains_record(&self, record: &Arc<RouteRecord>) -> bool {
		self.matched.iter().any(|r| Arc::ptr_eq(r, record))
	}
}

impl fmt::Debug for RouteLocation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteLocation")
			.field("full_path", &self.full_path)
			.field("name", &self.name)
			.field("params", &self.params)
			.field(
				"matched",
				&self.matched.iter().map(|r| r.path()).collect::<Vec<_>>(),
			)
			.field(
				"redirected_from",
				&self.redirected_from.as_ref().map(|r| &r.full_path),
			)
			.finish()
	}
}

/// Returns `true` when both handles point at the same record.
pub fn is_same_route_record(a: &Arc<RouteRecord>, b: &Arc<RouteRecord>) -> bool {
	Arc::ptr_eq(a, b)
}

/// Compares two param maps, treating a one-element list as its single value.
pub fn is_same_route_location_params(a: &RouteParams, b: &RouteParams) -> bool {
	a.len() == b.len()
		&& a.iter().all(|(key, value)| {
			b.get(key)
				.is_some_and(|other| value.is_equivalent(other))
		})
}

/// Returns `true` when both locations render the same route: same leaf
/// record, equivalent params, same query and same hash.
pub fn is_same_route_location(a: &RouteLocation, b: &RouteLocation) -> bool {
	is_same_route_location_with(&stringify_query, a, b)
}

/// Same as [`is_same_route_location`] with a custom query serializer.
pub fn is_same_route_location_with(
	stringify: &dyn Fn(&LocationQuery) -> String,
	a: &RouteLocation,
	b: &RouteLocation,
) -> bool {
	match (a.matched.last(), b.matched.last()) {
		(Some(leaf_a), Some(leaf_b)) => {
			a.matched.len() == b.matched.len()
				&& is_same_route_record(leaf_a, leaf_b)
				&& is_same_route_location_params(&a.params, &b.params)
				&& stringify(&a.query) == stringify(&b.query)
				&& a.hash == b.hash
		}
		_ => false,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::record::{RouteRecord, RouteRecordRaw};
	use rstest::rstest;

	fn location(record: &Arc<RouteRecord>, params: RouteParams, hash: &str) -> RouteLocation {
		RouteLocation {
			full_path: format!("{}{}", record.path(), hash),
			path: record.path().to_string(),
			hash: hash.to_string(),
			params,
			matched: vec![record.clone()],
			..RouteLocation::start()
		}
	}

	#[rstest]
	#[case(ParamValue::from("a"), ParamValue::from(vec!["a"]), true)]
	#[case(ParamValue::from(vec!["a", "b"]), ParamValue::from(vec!["a", "b"]), true)]
	#[case(ParamValue::from(vec!["a", "b"]), ParamValue::from("a"), false)]
	#[case(ParamValue::from("a"), ParamValue::from("b"), false)]
	fn test_param_equivalence(#[case] a: ParamValue, #[case] b: ParamValue, #[case] expected: bool) {
		assert_eq!(a.is_equivalent(&b), expected);
		assert_eq!(b.is_equivalent(&a), expected);
	}

	#[rstest]
	fn test_same_route_location_requires_same_record() {
		// Arrange
		let users = Arc::new(RouteRecord::normalize(&RouteRecordRaw::new("/users"), "/users".into()));
		let other = Arc::new(RouteRecord::normalize(&RouteRecordRaw::new("/users"), "/users".into()));

		// Act
		let a = location(&users, RouteParams::new(), "");
		let b = location(&other, RouteParams::new(), "");

		// Assert
		assert!(is_same_route_location(&a, &a.clone()));
		assert!(!is_same_route_location(&a, &b));
	}

	#[rstest]
	fn test_same_route_location_compares_hash_and_query() {
		let record = Arc::new(RouteRecord::normalize(&RouteRecordRaw::new("/"), "/".into()));
		let a = location(&record, RouteParams::new(), "#top");
		let b = location(&record, RouteParams::new(), "#bottom");
		let mut c = a.clone();
		c.query.insert("page".into(), QueryValue::from("2"));

		assert!(!is_same_route_location(&a, &b));
		assert!(!is_same_route_location(&a, &c));
	}

	#[rstest]
	fn test_start_location_never_matches() {
		let start = RouteLocation::start();
		assert!(!is_same_route_location(&start, &start));
		assert_eq!(start.full_path, "/");
		assert!(start.matched.is_empty());
	}

	#[rstest]
	fn test_raw_builders() {
		let raw = RouteLocationRaw::named("user")
			.with_param("id", "7")
			.with_query("tab", "posts")
			.with_hash("#bio")
			.replacing();

		let LocationTarget::Named { name, params } = &raw.target else {
			panic!("expected a named target");
		};
		assert_eq!(name, "user");
		assert_eq!(params.get("id"), Some(&ParamValue::from("7")));
		assert_eq!(
			raw.query.as_ref().and_then(|q| q.get("tab")).and_then(QueryValue::first),
			Some("posts")
		);
		assert_eq!(raw.hash.as_deref(), Some("#bio"));
		assert!(raw.replace);
		assert!(!raw.force);
	}
}
