//! Navigation failures: navigations that ended without an error but also
//! without reaching their target.

use std::fmt;
use std::sync::Arc;

use crate::location::RouteLocation;

/// Why a navigation did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum NavigationFailureKind {
	/// A guard returned `false`.
	Aborted,
	/// A newer navigation started before this one finished.
	Cancelled,
	/// The target is the current location.
	Duplicated,
}

/// A navigation that stopped before changing the current route.
#[derive(Clone)]
pub struct NavigationFailure {
	kind: NavigationFailureKind,
	to: Arc<RouteLocation>,
	from: Arc<RouteLocation>,
}

impl NavigationFailure {
	/// Creates a failure of `kind` for the navigation `from` → `to`.
	pub fn new(kind: NavigationFailureKind, to: Arc<RouteLocation>, from: Arc<RouteLocation>) -> Self {
		Self { kind, to, from }
	}

	/// Kind of failure.
	pub fn kind(&self) -> NavigationFailureKind {
		self.kind
	}

	/// Location the navigation was heading to.
	pub fn to(&self) -> &Arc<RouteLocation> {
		&self.to
	}

	/// Location the navigation started from.
	pub fn from(&self) -> &Arc<RouteLocation> {
		&self.from
	}

	/// Returns `true` when the failure is one of `kinds`.
	pub fn is(&self, kinds: &[NavigationFailureKind]) -> bool {
		kinds.contains(&self.kind)
	}
}

impl fmt::Display for NavigationFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.kind {
			NavigationFailureKind::Aborted => write!(
				f,
				"Navigation aborted from \"{}\" to \"{}\" via a navigation guard.",
				self.from.full_path, self.to.full_path
			),
			NavigationFailureKind::Cancelled => write!(
				f,
				"Navigation cancelled from \"{}\" to \"{}\" with a new navigation.",
				self.from.full_path, self.to.full_path
			),
			NavigationFailureKind::Duplicated => write!(
				f,
				"Avoided redundant navigation to current location: \"{}\".",
				self.from.full_path
			),
		}
	}
}

impl fmt::Debug for NavigationFailure {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NavigationFailure")
			.field("kind", &self.kind)
			.field("to", &self.to.full_path)
			.field("from", &self.from.full_path)
			.finish()
	}
}

impl std::error::Error for NavigationFailure {}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn at(path: &str) -> Arc<RouteLocation> {
		Arc::new(RouteLocation {
			full_path: path.to_string(),
			path: path.to_string(),
			..RouteLocation::start()
		})
	}

	#[rstest]
	#[case(
		NavigationFailureKind::Aborted,
		"Navigation aborted from \"/a\" to \"/b\" via a navigation guard."
	)]
	#[case(
		NavigationFailureKind::Cancelled,
		"Navigation cancelled from \"/a\" to \"/b\" with a new navigation."
	)]
	#[case(
		NavigationFailureKind::Duplicated,
		"Avoided redundant navigation to current location: \"/a\"."
	)]
	fn test_failure_messages(#[case] kind: NavigationFailureKind, #[case] expected: &str) {
		let failure = NavigationFailure::new(kind, at("/b"), at("/a"));
		assert_eq!(failure.to_string(), expected);
	}

	#[rstest]
	fn test_failure_is() {
		let failure = NavigationFailure::new(NavigationFailureKind::Cancelled, at("/b"), at("/a"));
		assert!(failure.is(&[NavigationFailureKind::Aborted, NavigationFailureKind::Cancelled]));
		assert!(!failure.is(&[NavigationFailureKind::Duplicated]));
	}
}
