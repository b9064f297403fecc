//! The router.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures::channel::oneshot;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use waypost_core::{
	CallbackList, Guard, LocationTarget, NavigationFailure, RemoveHandle, RouteLocation,
	RouteLocationRaw, RouteParams, RouteRecord, RouteRecordRaw, RouterError, RouterResult, Signal,
	encoding::{decode, encode_hash, encode_param},
	parse_query, parse_url_with, stringify_query, stringify_url_with,
};
use waypost_history::{NavigationInformation, RouterHistory};
use waypost_matcher::{CurrentLocation, MatcherLocation, RouterMatcher};

use crate::link::LinkState;
use crate::options::{QueryParser, QueryStringifier, RouterOptions, RouterSettings};
use crate::scroll::{SavedPositions, ScrollBehavior};

/// Called after every navigation with `(to, from, failure)`.
pub type AfterEachHook =
	Arc<dyn Fn(&RouteLocation, &RouteLocation, Option<&NavigationFailure>) + Send + Sync>;

/// Called with every error raised during navigation.
pub type ErrorHandler = Arc<dyn Fn(&RouterError) + Send + Sync>;

/// An application the router can be installed into.
pub trait RouterApp {
	/// Makes the router available to the application's views.
	fn provide(&mut self, router: Router);
}

/// A traversal reported by the history, waiting to be handled.
#[derive(Debug, Clone)]
pub(crate) struct PopEvent {
	pub(crate) to: String,
	pub(crate) from: String,
	pub(crate) info: NavigationInformation,
}

#[derive(Default)]
pub(crate) struct ReadyState {
	pub(crate) ready: bool,
	/// Error of the navigation that made the router ready, if any.
	pub(crate) error: Option<RouterError>,
	pub(crate) waiters: Vec<oneshot::Sender<RouterResult<()>>>,
}

#[derive(Default)]
pub(crate) struct Lifecycle {
	pub(crate) installed_apps: usize,
	pub(crate) started: bool,
}

pub(crate) struct RouterInner {
	pub(crate) history: Arc<dyn RouterHistory>,
	pub(crate) matcher: RwLock<RouterMatcher>,
	pub(crate) settings: RouterSettings,
	pub(crate) current: Signal<Arc<RouteLocation>>,
	pub(crate) start: Arc<RouteLocation>,
	pub(crate) pending: Mutex<Arc<RouteLocation>>,
	pub(crate) before_guards: CallbackList<Guard>,
	pub(crate) before_resolve_guards: CallbackList<Guard>,
	pub(crate) after_hooks: CallbackList<AfterEachHook>,
	pub(crate) error_handlers: CallbackList<ErrorHandler>,
	pub(crate) ready: Mutex<ReadyState>,
	pub(crate) lifecycle: Mutex<Lifecycle>,
	pub(crate) history_listener: Mutex<Option<RemoveHandle>>,
	pub(crate) pop_events: Arc<Mutex<VecDeque<PopEvent>>>,
	pub(crate) pop_notify: Arc<Notify>,
	pub(crate) saved_scroll: SavedPositions,
	pub(crate) scroll_behavior: Option<Arc<dyn ScrollBehavior>>,
	pub(crate) parse_query: QueryParser,
	pub(crate) stringify_query: QueryStringifier,
}

/// Resolves locations and runs navigations.
///
/// The router is cheap to clone; clones share the same state.
///
/// ```
/// use waypost_core::RouteRecordRaw;
/// use waypost_history::MemoryHistory;
/// use waypost_router::{Router, RouterOptions};
///
/// # tokio_test::block_on(async {
/// let router = Router::new(
/// 	RouterOptions::new(MemoryHistory::new("/"))
/// 		.route(RouteRecordRaw::new("/").name("home"))
/// 		.route(RouteRecordRaw::new("/about").name("about")),
/// )
/// .unwrap();
///
/// let failure = router.push("/about").await.unwrap();
/// assert!(failure.is_none());
/// assert_eq!(router.current_route().path, "/about");
/// # });
/// ```
#[derive(Clone)]
pub struct Router {
	pub(crate) inner: Arc<RouterInner>,
}

impl Router {
	/// Creates a router from `options`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::InvalidPath`] if a route path cannot be
	/// compiled.
	pub fn new(options: RouterOptions) -> RouterResult<Self> {
		let RouterOptions {
			history,
			routes,
			settings,
			scroll_behavior,
			parse_query: custom_parse,
			stringify_query: custom_stringify,
		} = options;

		let matcher = RouterMatcher::with_routes(routes, settings.path_options())?;
		let start = Arc::new(RouteLocation::start());
		let parse: QueryParser = custom_parse.unwrap_or_else(|| Arc::new(parse_query));
		let stringify: QueryStringifier =
			custom_stringify.unwrap_or_else(|| Arc::new(stringify_query));

		Ok(Self {
			inner: Arc::new(RouterInner {
				history,
				matcher: RwLock::new(matcher),
				settings,
				current: Signal::new(Arc::clone(&start)),
				pending: Mutex::new(Arc::clone(&start)),
				start,
				before_guards: CallbackList::new(),
				before_resolve_guards: CallbackList::new(),
				after_hooks: CallbackList::new(),
				error_handlers: CallbackList::new(),
				ready: Mutex::new(ReadyState::default()),
				lifecycle: Mutex::new(Lifecycle::default()),
				history_listener: Mutex::new(None),
				pop_events: Arc::new(Mutex::new(VecDeque::new())),
				pop_notify: Arc::new(Notify::new()),
				saved_scroll: SavedPositions::default(),
				scroll_behavior,
				parse_query: parse,
				stringify_query: stringify,
			}),
		})
	}

	/// Settings the router was created with.
	pub fn settings(&self) -> &RouterSettings {
		&self.inner.settings
	}

	/// The history the router writes to.
	pub fn history(&self) -> &Arc<dyn RouterHistory> {
		&self.inner.history
	}

	/// The current route.
	pub fn current_route(&self) -> Arc<RouteLocation> {
		self.inner.current.get()
	}

	/// The current route as an observable value.
	pub fn current_route_signal(&self) -> &Signal<Arc<RouteLocation>> {
		&self.inner.current
	}

	/// The location the router reports before its first navigation.
	pub fn start_location(&self) -> &Arc<RouteLocation> {
		&self.inner.start
	}

	/// Resolves `to` against the current route.
	pub fn resolve(&self, to: impl Into<RouteLocationRaw>) -> RouterResult<RouteLocation> {
		let to: RouteLocationRaw = to.into();
		self.resolve_from(&to, &self.current_route())
	}

	/// Resolves `to` against `current`.
	///
	/// A location that matches no route resolves with empty `matched`.
	///
	/// # Errors
	///
	/// Fails for unknown route names, missing or invalid params, and
	/// params-only locations when the current route is unknown.
	pub fn resolve_from(
		&self,
		to: &RouteLocationRaw,
		current: &RouteLocation,
	) -> RouterResult<RouteLocation> {
		let (location, current_params) = match &to.target {
			LocationTarget::Url(url) => return self.resolve_url(url, current),
			LocationTarget::Path(path) => {
				let parsed = parse_url_with(&*self.inner.parse_query, path, &current.path);
				(MatcherLocation::Path(parsed.path), current.params.clone())
			}
			LocationTarget::Named { name, params } => (
				MatcherLocation::Named {
					name: name.clone(),
					params: encode_params(params),
				},
				encode_params(&current.params),
			),
			LocationTarget::Params(params) => (
				MatcherLocation::Relative {
					params: encode_params(params),
				},
				encode_params(&current.params),
			),
		};

		let matched = self.inner.matcher.read().resolve(
			&location,
			CurrentLocation {
				name: current.name.as_deref(),
				path: &current.path,
				params: &current_params,
			},
		)?;

		let hash = to.hash.clone().unwrap_or_default();
		if !hash.is_empty() && !hash.starts_with('#') {
			tracing::warn!(hash = %hash, "a hash should always start with \"#\"");
		}
		let query = to.query.clone().unwrap_or_default();
		let full_path = stringify_url_with(
			&*self.inner.stringify_query,
			&matched.path,
			&query,
			&encode_hash(&hash),
		);
		let href = self.href_for(&full_path, matched.matched.is_empty());

		Ok(RouteLocation {
			full_path,
			path: matched.path,
			query,
			hash,
			name: matched.name,
			params: decode_params(&matched.params),
			matched: matched.matched,
			meta: matched.meta,
			redirected_from: None,
			href,
		})
	}

	fn resolve_url(&self, url: &str, current: &RouteLocation) -> RouterResult<RouteLocation> {
		let parsed = parse_url_with(&*self.inner.parse_query, url, &current.path);
		let matched = self.inner.matcher.read().resolve(
			&MatcherLocation::Path(parsed.path.clone()),
			CurrentLocation::from(current),
		)?;
		let href = self.href_for(&parsed.full_path, matched.matched.is_empty());

		Ok(RouteLocation {
			full_path: parsed.full_path,
			path: matched.path,
			query: parsed.query,
			hash: decode(&parsed.hash),
			name: matched.name,
			params: decode_params(&matched.params),
			matched: matched.matched,
			meta: matched.meta,
			redirected_from: None,
			href,
		})
	}

	fn href_for(&self, full_path: &str, unmatched: bool) -> String {
		let href = self.inner.history.create_href(full_path);
		if href.starts_with("//") {
			tracing::warn!(
				location = full_path,
				href = %href,
				"a resolved location cannot start with multiple slashes"
			);
		} else if unmatched {
			tracing::warn!(location = full_path, "no match found for location");
		}
		href
	}

	/// Navigates to `to`, adding a history entry.
	///
	/// Returns `Ok(None)` when the navigation completed and `Ok(Some(_))`
	/// when it was aborted, cancelled or duplicated.
	///
	/// # Errors
	///
	/// Errors are reported to the [`on_error`](Self::on_error) handlers and
	/// returned.
	pub async fn push(
		&self,
		to: impl Into<RouteLocationRaw>,
	) -> RouterResult<Option<NavigationFailure>> {
		self.push_with_redirect(to.into(), None).await
	}

	/// Navigates to `to`, replacing the current history entry.
	pub async fn replace(
		&self,
		to: impl Into<RouteLocationRaw>,
	) -> RouterResult<Option<NavigationFailure>> {
		let to: RouteLocationRaw = to.into();
		self.push(to.replacing()).await
	}

	/// Traverses the history by `delta` entries and handles the resulting
	/// navigation.
	pub async fn go(&self, delta: i64) {
		self.inner.history.go(delta, true);
		self.process_history_events().await;
	}

	/// Same as `go(-1)`.
	pub async fn back(&self) {
		self.go(-1).await;
	}

	/// Same as `go(1)`.
	pub async fn forward(&self) {
		self.go(1).await;
	}

	/// Handles the traversals reported by the history so far.
	pub async fn process_history_events(&self) {
		while let Some(event) = self.next_pop_event() {
			self.handle_pop(event).await;
		}
	}

	fn next_pop_event(&self) -> Option<PopEvent> {
		self.inner.pop_events.lock().pop_front()
	}

	/// Handles history traversals as they are reported, forever.
	///
	/// Hosts whose history reports traversals asynchronously (such as a
	/// browser `popstate` listener) spawn this once.
	pub async fn run_history_listener(&self) {
		loop {
			self.inner.pop_notify.notified().await;
			self.process_history_events().await;
		}
	}

	/// Adds a top-level route. The returned handle removes it again.
	pub fn add_route(&self, route: RouteRecordRaw) -> RouterResult<RemoveHandle> {
		let matcher = self.inner.matcher.write().add_route(&route, None)?;
		Ok(self.removal_handle(matcher))
	}

	/// Adds `route` as a child of the route named `parent`.
	///
	/// # Errors
	///
	/// Returns [`RouterError::ParentNotFound`] if no route is named `parent`.
	pub fn add_child_route(&self, parent: &str, route: RouteRecordRaw) -> RouterResult<RemoveHandle> {
		let mut table = self.inner.matcher.write();
		let parent_matcher = table
			.get_record_matcher(parent)
			.ok_or_else(|| RouterError::ParentNotFound(parent.to_string()))?;
		let matcher = table.add_route(&route, Some(&parent_matcher))?;
		drop(table);
		Ok(self.removal_handle(matcher))
	}

	fn removal_handle(&self, matcher: Arc<waypost_matcher::RouteRecordMatcher>) -> RemoveHandle {
		let inner = Arc::downgrade(&self.inner);
		RemoveHandle::new(move || {
			if let Some(inner) = inner.upgrade() {
				inner.matcher.write().remove_matcher(&matcher);
			}
		})
	}

	/// Removes the route named `name` and its children.
	pub fn remove_route(&self, name: &str) {
		if !self.inner.matcher.write().remove_route(name) {
			tracing::warn!(name, "cannot remove non-existent route");
		}
	}

	/// Returns `true` if a route named `name` exists.
	pub fn has_route(&self, name: &str) -> bool {
		self.inner.matcher.read().has_route(name)
	}

	/// Every normalized route record, most specific first.
	pub fn get_routes(&self) -> Vec<Arc<RouteRecord>> {
		self.inner.matcher.read().get_routes()
	}

	/// Adds a guard run before every navigation.
	pub fn before_each(&self, guard: Guard) -> RemoveHandle {
		self.inner.before_guards.add(guard)
	}

	/// Adds a guard run after every other guard of a navigation.
	pub fn before_resolve(&self, guard: Guard) -> RemoveHandle {
		self.inner.before_resolve_guards.add(guard)
	}

	/// Adds a hook run after every navigation, successful or not.
	pub fn after_each(
		&self,
		hook: impl Fn(&RouteLocation, &RouteLocation, Option<&NavigationFailure>)
		+ Send
		+ Sync
		+ 'static,
	) -> RemoveHandle {
		self.inner.after_hooks.add(Arc::new(hook))
	}

	/// Adds a handler called with navigation errors.
	pub fn on_error(&self, handler: impl Fn(&RouterError) + Send + Sync + 'static) -> RemoveHandle {
		self.inner.error_handlers.add(Arc::new(handler))
	}

	/// Waits for the first navigation to complete.
	///
	/// # Errors
	///
	/// Returns the error of the first navigation if it failed with one and no
	/// navigation has completed since.
	pub async fn is_ready(&self) -> RouterResult<()> {
		let waiter = {
			let mut ready = self.inner.ready.lock();
			if ready.ready {
				let at_start = Arc::ptr_eq(&self.current_route(), &self.inner.start);
				return match &ready.error {
					Some(err) if at_start => Err(err.clone()),
					_ => Ok(()),
				};
			}
			let (sender, receiver) = oneshot::channel();
			ready.waiters.push(sender);
			receiver
		};
		waiter.await.unwrap_or(Ok(()))
	}

	/// Installs the router into `app` and performs the initial navigation to
	/// the history's location the first time.
	pub async fn install<A: RouterApp + ?Sized>(&self, app: &mut A) {
		app.provide(self.clone());

		let should_start = {
			let mut lifecycle = self.inner.lifecycle.lock();
			lifecycle.installed_apps += 1;
			let at_start = Arc::ptr_eq(&self.current_route(), &self.inner.start);
			if !lifecycle.started && at_start {
				lifecycle.started = true;
				true
			} else {
				false
			}
		};

		if should_start {
			let location = self.inner.history.location();
			if let Err(err) = self.push(location).await {
				tracing::error!(error = %err, "unexpected error when starting the router");
			}
		}
	}

	/// Uninstalls the router from one application. When no application is
	/// left the router stops listening to the history and goes back to its
	/// start location.
	pub fn uninstall(&self) {
		let mut lifecycle = self.inner.lifecycle.lock();
		lifecycle.installed_apps = lifecycle.installed_apps.saturating_sub(1);
		if lifecycle.installed_apps > 0 {
			return;
		}
		lifecycle.started = false;
		drop(lifecycle);

		if let Some(listener) = self.inner.history_listener.lock().take() {
			listener.remove();
		}
		{
			let mut ready = self.inner.ready.lock();
			ready.ready = false;
			ready.error = None;
		}
		*self.inner.pending.lock() = Arc::clone(&self.inner.start);
		self.inner.current.set(Arc::clone(&self.inner.start));
		tracing::debug!("router uninstalled");
	}

	/// Link state for `to` against the current route.
	pub fn link(&self, to: impl Into<RouteLocationRaw>) -> RouterResult<LinkState> {
		LinkState::new(self, to.into())
	}
}

impl fmt::Debug for Router {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Router")
			.field("current_route", &self.current_route().full_path)
			.field("history", &self.inner.history)
			.field("routes", &self.inner.matcher.read().get_routes().len())
			.field("settings", &self.inner.settings)
			.finish()
	}
}

fn encode_params(params: &RouteParams) -> RouteParams {
	map_params(params, encode_param)
}

fn decode_params(params: &RouteParams) -> RouteParams {
	map_params(params, decode)
}

fn map_params(params: &RouteParams, f: fn(&str) -> String) -> RouteParams {
	params
		.iter()
		.map(|(key, value)| (key.clone(), value.map(f)))
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::{fixture, rstest};
	use waypost_core::QueryValue;
	use waypost_history::MemoryHistory;

	#[fixture]
	fn router() -> Router {
		Router::new(
			RouterOptions::new(MemoryHistory::new("/app"))
				.route(RouteRecordRaw::new("/").name("home"))
				.route(RouteRecordRaw::new("/users/{id}").name("user"))
				.route(RouteRecordRaw::new("/files/{path:*}").name("files")),
		)
		.unwrap()
	}

	#[rstest]
	fn test_resolve_url(router: Router) {
		// Act
		let location = router.resolve("/users/42?tab=posts#bio").unwrap();

		// Assert
		assert_eq!(location.name.as_deref(), Some("user"));
		assert_eq!(location.param("id"), Some("42"));
		assert_eq!(location.query.get("tab"), Some(&QueryValue::from("posts")));
		assert_eq!(location.hash, "#bio");
		assert_eq!(location.full_path, "/users/42?tab=posts#bio");
		assert_eq!(location.href, "/app/users/42?tab=posts#bio");
	}

	#[rstest]
	fn test_resolve_named_encodes_params(router: Router) {
		let location = router
			.resolve(RouteLocationRaw::named("user").with_param("id", "a b/c"))
			.unwrap();

		assert_eq!(location.path, "/users/a%20b%2Fc");
		assert_eq!(location.param("id"), Some("a b/c"));
	}

	#[rstest]
	fn test_resolve_path_with_query_and_hash(router: Router) {
		let location = router
			.resolve(
				RouteLocationRaw::path("/files/docs/readme.md")
					.with_query("v", "2")
					.with_hash("#intro"),
			)
			.unwrap();

		assert_eq!(location.full_path, "/files/docs/readme.md?v=2#intro");
		assert_eq!(location.param("path"), Some("docs/readme.md"));
	}

	#[rstest]
	fn test_resolve_round_trip(router: Router) {
		let first = router.resolve("/users/7?a=1&a=2#x").unwrap();
		let again = router.resolve(first.full_path.as_str()).unwrap();

		assert_eq!(again.path, first.path);
		assert_eq!(again.query, first.query);
		assert_eq!(again.hash, first.hash);
	}

	#[rstest]
	fn test_resolve_unmatched_has_no_records(router: Router) {
		let location = router.resolve("/nowhere").unwrap();
		assert!(location.matched.is_empty());
	}

	#[rstest]
	fn test_add_and_remove_routes(router: Router) {
		// Arrange
		let handle = router.add_route(RouteRecordRaw::new("/about").name("about")).unwrap();
		router
			.add_child_route("user", RouteRecordRaw::new("posts").name("user-posts"))
			.unwrap();

		// Act
		let child = router.resolve("/users/1/posts").unwrap();
		handle.remove();

		// Assert
		assert_eq!(child.matched.len(), 2);
		assert!(!router.has_route("about"));
		router.remove_route("user");
		assert!(!router.has_route("user-posts"));
	}

	#[rstest]
	fn test_add_child_route_unknown_parent(router: Router) {
		let err = router
			.add_child_route("ghost", RouteRecordRaw::new("x"))
			.unwrap_err();
		assert!(matches!(err, RouterError::ParentNotFound(_)));
	}
}
