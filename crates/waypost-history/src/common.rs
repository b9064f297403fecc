//! Types shared by every history implementation.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use waypost_core::{RemoveHandle, StateData};

/// Location of a history before anything was pushed.
pub const START: &str = "";

/// What caused a history change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationType {
	/// Traversal through existing entries (back, forward, go).
	Pop,
	/// A new entry was added.
	Push,
}

/// Direction of a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationDirection {
	Back,
	Forward,
	Unknown,
}

impl NavigationDirection {
	/// Direction of a traversal by `delta` entries.
	pub fn from_delta(delta: i64) -> Self {
		match delta {
			0 => Self::Unknown,
			d if d > 0 => Self::Forward,
			_ => Self::Back,
		}
	}
}

/// Details passed to history listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationInformation {
	pub kind: NavigationType,
	pub direction: NavigationDirection,
	/// Number of entries traversed; `0` when unknown.
	pub delta: i64,
}

impl NavigationInformation {
	/// A pop traversal by `delta` entries.
	pub fn pop(delta: i64) -> Self {
		Self {
			kind: NavigationType::Pop,
			direction: NavigationDirection::from_delta(delta),
			delta,
		}
	}
}

/// Called with `(to, from, information)` when the history is traversed.
pub type HistoryListener = Arc<dyn Fn(&str, &str, &NavigationInformation) + Send + Sync>;

/// A scroll offset in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollPosition {
	pub left: f64,
	pub top: f64,
}

impl ScrollPosition {
	pub fn new(left: f64, top: f64) -> Self {
		Self { left, top }
	}
}

/// The history the router reads and writes.
///
/// Locations are full paths relative to [`base`](Self::base), e.g.
/// `/users/1?tab=posts#bio`.
pub trait RouterHistory: Send + Sync {
	/// Normalized base prepended to every location.
	fn base(&self) -> &str;

	/// Current location.
	fn location(&self) -> String;

	/// State attached to the current entry.
	fn state(&self) -> StateData;

	/// Adds an entry and makes it current, dropping forward entries.
	fn push(&self, to: &str, data: Option<StateData>);

	/// Replaces the current entry.
	fn replace(&self, to: &str, data: Option<StateData>);

	/// Traverses the history by `delta` entries.
	///
	/// Listeners are only notified when `trigger_listeners` is `true`.
	fn go(&self, delta: i64, trigger_listeners: bool);

	/// Registers a listener for traversals.
	fn listen(&self, listener: HistoryListener) -> RemoveHandle;

	/// Href to use in links pointing to `location`.
	fn create_href(&self, location: &str) -> String {
		create_href(self.base(), location)
	}

	/// Removes every listener.
	fn destroy(&self);
}

impl fmt::Debug for dyn RouterHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouterHistory")
			.field("base", &self.base())
			.field("location", &self.location())
			.finish()
	}
}

/// Normalizes a base: `/` when empty, scheme and host removed, a leading `/`
/// unless it starts with `#`, no trailing slash.
pub fn normalize_base(base: &str) -> String {
	let base = if base.is_empty() { "/" } else { base };
	let base = strip_origin(base);

	let mut normalized = if base.starts_with('/') || base.starts_with('#') {
		base.to_string()
	} else {
		format!("/{base}")
	};
	if normalized.ends_with('/') {
		normalized.pop();
	}
	normalized
}

fn strip_origin(base: &str) -> &str {
	let Some((scheme, rest)) = base.split_once("://") else {
		return base;
	};
	let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
	if scheme.is_empty() || !scheme.chars().all(is_word) {
		return base;
	}
	if rest.is_empty() || rest.starts_with('/') {
		return base;
	}
	rest.find('/').map_or("", |index| &rest[index..])
}

/// Href of `location` under `base`. Anything before a `#` in the base is
/// dropped so hash bases produce `#/path` hrefs.
pub fn create_href(base: &str, location: &str) -> String {
	match base.find('#') {
		Some(index) => format!("{}{location}", &base[index..]),
		None => format!("{base}{location}"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("", "")]
	#[case("/", "")]
	#[case("/app/", "/app")]
	#[case("app", "/app")]
	#[case("#", "#")]
	#[case("/app/#", "/app/#")]
	#[case("https://example.com/app/", "/app")]
	#[case("https://example.com", "")]
	fn test_normalize_base(#[case] base: &str, #[case] expected: &str) {
		assert_eq!(normalize_base(base), expected);
	}

	#[rstest]
	#[case("/app", "/users", "/app/users")]
	#[case("", "/users", "/users")]
	#[case("/app/#", "/users", "#/users")]
	#[case("#", "/users", "#/users")]
	fn test_create_href(#[case] base: &str, #[case] location: &str, #[case] expected: &str) {
		assert_eq!(create_href(base, location), expected);
	}

	#[rstest]
	#[case(-2, NavigationDirection::Back)]
	#[case(0, NavigationDirection::Unknown)]
	#[case(1, NavigationDirection::Forward)]
	fn test_direction_from_delta(#[case] delta: i64, #[case] expected: NavigationDirection) {
		assert_eq!(NavigationInformation::pop(delta).direction, expected);
	}
}
