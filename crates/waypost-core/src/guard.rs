//! Navigation guards.
//!
//! A guard is an async check run during navigation. It receives the target
//! and the current location and decides whether the navigation continues,
//! stops, or goes somewhere else.
//!
//! Closures are the common way to write guards:
//!
//! ```
//! use waypost_core::{GuardOutcome, RouteLocationRaw, guard_fn, guard_sync};
//!
//! let require_login = guard_sync(|to, _from| {
//! 	if to.meta.contains_key("requires_auth") {
//! 		GuardOutcome::Redirect(RouteLocationRaw::url("/login"))
//! 	} else {
//! 		GuardOutcome::Continue
//! 	}
//! });
//!
//! let slow_check = guard_fn(|_to, _from| async { true });
//! # let _ = (require_login, slow_check);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::RouterError;
use crate::failure::NavigationFailure;
use crate::location::{RouteLocation, RouteLocationRaw};

/// What a guard decided.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardOutcome {
	/// Let the navigation proceed.
	Continue,
	/// Stop the navigation with an aborted failure.
	Abort,
	/// Cancel the navigation and start a new one towards this location.
	Redirect(RouteLocationRaw),
}

/// Error returned by a guard.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum GuardError {
	/// The guard reports a navigation failure; it is returned to the caller
	/// as a failure rather than an error.
	#[error(transparent)]
	Failure(#[from] NavigationFailure),

	/// A router error, such as a failed lookup inside the guard.
	#[error(transparent)]
	Router(#[from] RouterError),

	/// Any other error.
	#[error("{0}")]
	Other(Arc<anyhow::Error>),
}

impl GuardError {
	/// Creates an error from a message.
	pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
		Self::Other(Arc::new(anyhow::Error::msg(message)))
	}
}

impl From<anyhow::Error> for GuardError {
	fn from(err: anyhow::Error) -> Self {
		Self::Other(Arc::new(err))
	}
}

/// Result of running a guard.
pub type GuardResult = Result<GuardOutcome, GuardError>;

/// Converts the values guards commonly return into a [`GuardResult`].
///
/// `()` and `true` continue, `false` aborts, a location or a URL string
/// redirects.
pub trait IntoGuardResult {
	/// Performs the conversion.
	fn into_guard_result(self) -> GuardResult;
}

impl IntoGuardResult for () {
	fn into_guard_result(self) -> GuardResult {
		Ok(GuardOutcome::Continue)
	}
}

impl IntoGuardResult for bool {
	fn into_guard_result(self) -> GuardResult {
		Ok(if self {
			GuardOutcome::Continue
		} else {
			GuardOutcome::Abort
		})
	}
}

impl IntoGuardResult for GuardOutcome {
	fn into_guard_result(self) -> GuardResult {
		Ok(self)
	}
}

impl IntoGuardResult for RouteLocationRaw {
	fn into_guard_result(self) -> GuardResult {
		Ok(GuardOutcome::Redirect(self))
	}
}

impl IntoGuardResult for &str {
	fn into_guard_result(self) -> GuardResult {
		Ok(GuardOutcome::Redirect(RouteLocationRaw::url(self)))
	}
}

impl IntoGuardResult for String {
	fn into_guard_result(self) -> GuardResult {
		Ok(GuardOutcome::Redirect(RouteLocationRaw::url(self)))
	}
}

impl<T, E> IntoGuardResult for Result<T, E>
where
	T: IntoGuardResult,
	E: Into<GuardError>,
{
	fn into_guard_result(self) -> GuardResult {
		self.map_err(Into::into)?.into_guard_result()
	}
}

/// A check run while navigating from one location to another.
#[async_trait]
pub trait NavigationGuard: Send + Sync {
	/// Decides what happens to the navigation `from` → `to`.
	async fn check(&self, to: Arc<RouteLocation>, from: Arc<RouteLocation>) -> GuardResult;
}

/// Shared handle to a guard.
pub type Guard = Arc<dyn NavigationGuard>;

/// Guard backed by an async closure.
pub struct FnGuard<F> {
	f: F,
}

#[async_trait]
impl<F, Fut, R> NavigationGuard for FnGuard<F>
where
	F: Fn(Arc<RouteLocation>, Arc<RouteLocation>) -> Fut + Send + Sync,
	Fut: Future<Output = R> + Send + 'static,
	R: IntoGuardResult + 'static,
{
	async fn check(&self, to: Arc<RouteLocation>, from: Arc<RouteLocation>) -> GuardResult {
		(self.f)(to, from).await.into_guard_result()
	}
}

/// Guard backed by a synchronous closure.
pub struct SyncGuard<F> {
	f: F,
}

#[async_trait]
impl<F, R> NavigationGuard for SyncGuard<F>
where
	F: Fn(&RouteLocation, &RouteLocation) -> R + Send + Sync,
	R: IntoGuardResult + 'static,
{
	async fn check(&self, to: Arc<RouteLocation>, from: Arc<RouteLocation>) -> GuardResult {
		(self.f)(&to, &from).into_guard_result()
	}
}

/// Creates a guard from an async closure.
pub fn guard_fn<F, Fut, R>(f: F) -> Guard
where
	F: Fn(Arc<RouteLocation>, Arc<RouteLocation>) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = R> + Send + 'static,
	R: IntoGuardResult + 'static,
{
	Arc::new(FnGuard { f })
}

/// Creates a guard from a synchronous closure.
pub fn guard_sync<F, R>(f: F) -> Guard
where
	F: Fn(&RouteLocation, &RouteLocation) -> R + Send + Sync + 'static,
	R: IntoGuardResult + 'static,
{
	Arc::new(SyncGuard { f })
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::failure::NavigationFailureKind;
	use rstest::rstest;

	fn at(path: &str) -> Arc<RouteLocation> {
		Arc::new(RouteLocation {
			full_path: path.to_string(),
			path: path.to_string(),
			..RouteLocation::start()
		})
	}

	#[rstest]
	#[case(true, GuardOutcome::Continue)]
	#[case(false, GuardOutcome::Abort)]
	fn test_bool_into_outcome(#[case] value: bool, #[case] expected: GuardOutcome) {
		assert_eq!(value.into_guard_result().ok(), Some(expected));
	}

	#[rstest]
	fn test_string_redirects() {
		let outcome = "/login".into_guard_result().ok();
		assert_eq!(
			outcome,
			Some(GuardOutcome::Redirect(RouteLocationRaw::url("/login")))
		);
	}

	#[rstest]
	fn test_result_error_is_kept() {
		let result: Result<bool, anyhow::Error> = Err(anyhow::anyhow!("denied"));
		let err = result.into_guard_result().unwrap_err();
		assert!(matches!(err, GuardError::Other(_)));
		assert_eq!(err.to_string(), "denied");
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_fn_receives_locations() {
		// Arrange
		let guard = guard_fn(|to: Arc<RouteLocation>, from: Arc<RouteLocation>| async move {
			to.path == "/b" && from.path == "/a"
		});

		// Act
		let outcome = guard.check(at("/b"), at("/a")).await;

		// Assert
		assert_eq!(outcome.ok(), Some(GuardOutcome::Continue));
	}

	#[rstest]
	#[tokio::test]
	async fn test_guard_sync_failure_error() {
		let guard = guard_sync(|to: &RouteLocation, from: &RouteLocation| {
			Err::<(), _>(NavigationFailure::new(
				NavigationFailureKind::Aborted,
				Arc::new(to.clone()),
				Arc::new(from.clone()),
			))
		});

		let err = guard.check(at("/b"), at("/a")).await.unwrap_err();

		assert!(matches!(err, GuardError::Failure(f) if f.kind() == NavigationFailureKind::Aborted));
	}
}
