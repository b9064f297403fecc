//! Error types for routing and navigation.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors raised while building the route table or running a navigation.
///
/// Navigation *failures* (aborted, cancelled, duplicated) are not errors; they
/// are reported as [`NavigationFailure`](crate::NavigationFailure) values.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RouterError {
	/// No route record matches the location.
	#[error("no match for location \"{location}\"")]
	MatcherNotFound {
		/// The location that could not be matched.
		location: String,
	},

	/// A route path could not be compiled.
	#[error("invalid route path \"{path}\": {reason}")]
	InvalidPath {
		/// The offending path pattern.
		path: String,
		/// Why the path was rejected.
		reason: String,
	},

	/// A required param was not provided while building a path.
	#[error("missing required param \"{param}\" for path \"{path}\"")]
	MissingParam {
		/// Name of the missing param.
		param: String,
		/// Path pattern being stringified.
		path: String,
	},

	/// A param value does not fit the path pattern.
	#[error("invalid value for param \"{param}\": {reason}")]
	InvalidParam {
		/// Name of the param.
		param: String,
		/// Why the value was rejected.
		reason: String,
	},

	/// A record redirect resolves to neither a path nor a name.
	#[error("invalid redirect when navigating to \"{to}\": a redirect must contain a name or a path")]
	InvalidRedirect {
		/// Full path of the location carrying the redirect.
		to: String,
	},

	/// Redirects kept chaining past the configured limit.
	#[error("infinite redirect in navigation guard when going from \"{from}\" to \"{to}\"")]
	InfiniteRedirect {
		/// Full path of the route being left.
		from: String,
		/// Full path of the last redirect target.
		to: String,
	},

	/// A navigation guard did not settle in time.
	#[error("navigation guard did not settle within {0:?}")]
	GuardTimeout(Duration),

	/// A navigation guard returned an error.
	#[error("navigation guard failed: {0}")]
	Guard(Arc<anyhow::Error>),

	/// A lazily loaded component could not be resolved.
	#[error("couldn't resolve component \"{name}\" at \"{path}\": {reason}")]
	ComponentLoad {
		/// Component slot name.
		name: String,
		/// Path of the record owning the component.
		path: String,
		/// Loader error message.
		reason: String,
	},

	/// The scroll behavior failed to compute or apply a position.
	#[error("scroll behavior failed: {0}")]
	Scroll(Arc<anyhow::Error>),

	/// The parent route passed to `add_route` does not exist.
	#[error("parent route not found: {0}")]
	ParentNotFound(String),

	/// Router settings could not be parsed.
	#[error("invalid router settings: {0}")]
	InvalidSettings(String),
}

/// Result type for router operations.
pub type RouterResult<T> = Result<T, RouterError>;
