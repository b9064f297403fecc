//! Router configuration.
//!
//! [`RouterOptions`] carries everything the router needs to start: the
//! history, the routes and the pluggable behaviors. Scalar knobs live in
//! [`RouterSettings`], which can be loaded from a configuration file.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use waypost_core::{LocationQuery, RouteRecordRaw, RouterError, RouterResult};
use waypost_history::RouterHistory;
use waypost_matcher::PathParserOptions;

use crate::scroll::ScrollBehavior;

/// Custom query parser.
pub type QueryParser = Arc<dyn Fn(&str) -> LocationQuery + Send + Sync>;

/// Custom query serializer.
pub type QueryStringifier = Arc<dyn Fn(&LocationQuery) -> String + Send + Sync>;

/// Scalar router settings.
///
/// ```
/// use waypost_router::RouterSettings;
///
/// let settings = RouterSettings::from_json(r#"{ "strict": true, "guard_timeout_ms": 5000 }"#).unwrap();
/// assert!(settings.strict);
/// assert_eq!(settings.max_redirects, 10);
/// ```
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterSettings {
	/// Disallow an optional trailing slash on every route.
	#[serde(default)]
	pub strict: bool,

	/// Match routes case-sensitively.
	#[serde(default)]
	pub sensitive: bool,

	/// Patterns must match the whole path.
	#[serde(default = "default_end")]
	pub end: bool,

	/// Time a single guard may take before the navigation fails. Unbounded
	/// when unset.
	#[serde(default)]
	pub guard_timeout_ms: Option<u64>,

	/// Redirects allowed in one navigation before it fails.
	#[serde(default = "default_max_redirects")]
	pub max_redirects: usize,

	/// Class of links whose route is active.
	#[serde(default = "default_link_active_class")]
	pub link_active_class: String,

	/// Class of links whose route is exactly the current one.
	#[serde(default = "default_link_exact_active_class")]
	pub link_exact_active_class: String,
}

impl Default for RouterSettings {
	fn default() -> Self {
		Self {
			strict: false,
			sensitive: false,
			end: default_end(),
			guard_timeout_ms: None,
			max_redirects: default_max_redirects(),
			link_active_class: default_link_active_class(),
			link_exact_active_class: default_link_exact_active_class(),
		}
	}
}

impl RouterSettings {
	/// Parses settings from JSON. Missing keys take their defaults.
	pub fn from_json(json: &str) -> RouterResult<Self> {
		serde_json::from_str(json).map_err(|e| RouterError::InvalidSettings(e.to_string()))
	}

	/// Sets the guard timeout.
	pub fn with_guard_timeout(mut self, timeout: Duration) -> Self {
		self.guard_timeout_ms = Some(timeout.as_millis() as u64);
		self
	}

	/// Sets the redirect limit.
	pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
		self.max_redirects = max_redirects;
		self
	}

	/// Sets the matching options.
	pub fn with_path_options(mut self, options: PathParserOptions) -> Self {
		self.strict = options.strict;
		self.sensitive = options.sensitive;
		self.end = options.end;
		self
	}

	/// Guard timeout as a duration.
	pub fn guard_timeout(&self) -> Option<Duration> {
		self.guard_timeout_ms.map(Duration::from_millis)
	}

	/// Matching options applied to every route.
	pub fn path_options(&self) -> PathParserOptions {
		PathParserOptions {
			sensitive: self.sensitive,
			strict: self.strict,
			end: self.end,
		}
	}
}

fn default_end() -> bool {
	true
}

fn default_max_redirects() -> usize {
	10
}

fn default_link_active_class() -> String {
	"router-link-active".to_string()
}

fn default_link_exact_active_class() -> String {
	"router-link-exact-active".to_string()
}

/// Everything needed to create a [`Router`](crate::Router).
///
/// ```
/// use waypost_core::RouteRecordRaw;
/// use waypost_history::MemoryHistory;
/// use waypost_router::RouterOptions;
///
/// let options = RouterOptions::new(MemoryHistory::new("/"))
/// 	.route(RouteRecordRaw::new("/").name("home"))
/// 	.route(RouteRecordRaw::new("/about").name("about"));
/// # let _ = options;
/// ```
pub struct RouterOptions {
	pub(crate) history: Arc<dyn RouterHistory>,
	pub(crate) routes: Vec<RouteRecordRaw>,
	pub(crate) settings: RouterSettings,
	pub(crate) scroll_behavior: Option<Arc<dyn ScrollBehavior>>,
	pub(crate) parse_query: Option<QueryParser>,
	pub(crate) stringify_query: Option<QueryStringifier>,
}

impl RouterOptions {
	/// Starts options around `history`.
	pub fn new(history: impl RouterHistory + 'static) -> Self {
		Self::with_history(Arc::new(history))
	}

	/// Starts options around a shared history.
	pub fn with_history(history: Arc<dyn RouterHistory>) -> Self {
		Self {
			history,
			routes: Vec::new(),
			settings: RouterSettings::default(),
			scroll_behavior: None,
			parse_query: None,
			stringify_query: None,
		}
	}

	/// Adds a top-level route.
	pub fn route(mut self, route: RouteRecordRaw) -> Self {
		self.routes.push(route);
		self
	}

	/// Adds several top-level routes.
	pub fn routes(mut self, routes: impl IntoIterator<Item = RouteRecordRaw>) -> Self {
		self.routes.extend(routes);
		self
	}

	/// Replaces the settings.
	pub fn settings(mut self, settings: RouterSettings) -> Self {
		self.settings = settings;
		self
	}

	/// Sets the scroll behavior.
	pub fn scroll_behavior(mut self, behavior: impl ScrollBehavior + 'static) -> Self {
		self.scroll_behavior = Some(Arc::new(behavior));
		self
	}

	/// Replaces the query parser.
	pub fn parse_query(
		mut self,
		parse: impl Fn(&str) -> LocationQuery + Send + Sync + 'static,
	) -> Self {
		self.parse_query = Some(Arc::new(parse));
		self
	}

	/// Replaces the query serializer.
	pub fn stringify_query(
		mut self,
		stringify: impl Fn(&LocationQuery) -> String + Send + Sync + 'static,
	) -> Self {
		self.stringify_query = Some(Arc::new(stringify));
		self
	}
}

impl fmt::Debug for RouterOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterOptions")
			.field("history", &self.history)
			.field("routes", &self.routes)
			.field("settings", &self.settings)
			.field("has_scroll_behavior", &self.scroll_behavior.is_some())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_settings_defaults() {
		let settings = RouterSettings::default();

		assert!(settings.end);
		assert!(!settings.strict);
		assert_eq!(settings.guard_timeout(), None);
		assert_eq!(settings.max_redirects, 10);
		assert_eq!(settings.link_active_class, "router-link-active");
		assert_eq!(settings.link_exact_active_class, "router-link-exact-active");
	}

	#[rstest]
	fn test_settings_from_json_fills_defaults() {
		// Act
		let settings =
			RouterSettings::from_json(r#"{ "sensitive": true, "guard_timeout_ms": 250 }"#).unwrap();

		// Assert
		assert!(settings.sensitive);
		assert_eq!(settings.guard_timeout(), Some(Duration::from_millis(250)));
		assert!(settings.end);
		assert!(settings.path_options().sensitive);
	}

	#[rstest]
	#[case(r#"{ "max_redirects": "many" }"#)]
	#[case("not json")]
	fn test_settings_from_invalid_json(#[case] json: &str) {
		let err = RouterSettings::from_json(json).unwrap_err();
		assert!(matches!(err, RouterError::InvalidSettings(_)));
	}
}
