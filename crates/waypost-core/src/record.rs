//! Route records.
//!
//! [`RouteRecordRaw`] is the route definition written by the application,
//! possibly nested through `children`. The matcher normalizes each raw record
//! into a [`RouteRecord`] with its full path; normalized records are shared
//! through `Arc` handles and compared by identity.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::callbacks::{CallbackList, RemoveHandle};
use crate::guard::Guard;
use crate::location::{RouteLocation, RouteLocationRaw, RouteMeta};

/// Name of the component slot used when a record has a single component.
pub const DEFAULT_VIEW: &str = "default";

/// A view bound to a route, with optional in-component guards.
pub trait RouteComponent: Send + Sync {
	/// Guard run before the route rendering this component is entered.
	fn before_route_enter(&self) -> Option<Guard> {
		None
	}

	/// Guard run when the route changes but keeps rendering this component.
	fn before_route_update(&self) -> Option<Guard> {
		None
	}

	/// Guard run before the route rendering this component is left.
	fn before_route_leave(&self) -> Option<Guard> {
		None
	}
}

/// Loads a component on first use.
pub type ComponentLoader =
	Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<Arc<dyn RouteComponent>>> + Send + Sync>;

/// A component slot of a record.
#[derive(Clone)]
pub enum ComponentSlot {
	/// An already available component.
	Ready(Arc<dyn RouteComponent>),
	/// A component loaded when the route is first entered.
	Lazy(ComponentLoader),
}

impl fmt::Debug for ComponentSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ready(_) => f.write_str("Ready"),
			Self::Lazy(_) => f.write_str("Lazy"),
		}
	}
}

/// Where a record redirects to.
#[derive(Clone)]
pub enum RouteRedirect {
	/// A fixed location.
	To(RouteLocationRaw),
	/// A location computed from the resolved target.
	With(Arc<dyn Fn(&RouteLocation) -> RouteLocationRaw + Send + Sync>),
}

impl RouteRedirect {
	/// Returns the redirect target for `to`.
	pub fn target(&self, to: &RouteLocation) -> RouteLocationRaw {
		match self {
			Self::To(location) => location.clone(),
			Self::With(f) => f(to),
		}
	}
}

impl fmt::Debug for RouteRedirect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::To(location) => f.debug_tuple("To").field(location).finish(),
			Self::With(_) => f.write_str("With(..)"),
		}
	}
}

/// A route definition as written by the application.
///
/// ```
/// use waypost_core::RouteRecordRaw;
///
/// let users = RouteRecordRaw::new("/users/{id}")
/// 	.name("user")
/// 	.meta("requires_auth", true)
/// 	.child(RouteRecordRaw::new("posts").name("user-posts"));
/// assert_eq!(users.children.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct RouteRecordRaw {
	/// Path pattern. Children may use paths relative to their parent.
	pub path: String,
	/// Unique route name.
	pub name: Option<String>,
	/// Redirect applied when this record is the deepest match.
	pub redirect: Option<RouteRedirect>,
	/// Arbitrary metadata.
	pub meta: RouteMeta,
	/// Components keyed by view name.
	pub components: IndexMap<String, ComponentSlot>,
	/// Guards run when entering this record from outside of it.
	pub before_enter: Vec<Guard>,
	/// Nested routes.
	pub children: Vec<RouteRecordRaw>,
	/// Overrides the router's case sensitivity.
	pub sensitive: Option<bool>,
	/// Overrides the router's trailing slash strictness.
	pub strict: Option<bool>,
	/// Overrides whether the pattern must match the whole path.
	pub end: Option<bool>,
}

impl RouteRecordRaw {
	/// Creates a record for `path`.
	pub fn new(path: impl Into<String>) -> Self {
		Self {
			path: path.into(),
			..Self::default()
		}
	}

	/// Sets the route name.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Redirects to a fixed location.
	pub fn redirect(mut self, to: impl Into<RouteLocationRaw>) -> Self {
		self.redirect = Some(RouteRedirect::To(to.into()));
		self
	}

	/// Redirects to a location computed from the target.
	pub fn redirect_with(
		mut self,
		f: impl Fn(&RouteLocation) -> RouteLocationRaw + Send + Sync + 'static,
	) -> Self {
		self.redirect = Some(RouteRedirect::With(Arc::new(f)));
		self
	}

	/// Adds a meta entry.
	pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
		self.meta.insert(key.into(), value.into());
		self
	}

	/// Sets the default component.
	pub fn component(self, component: impl RouteComponent + 'static) -> Self {
		self.named_component(DEFAULT_VIEW, component)
	}

	/// Sets a component for a named view.
	pub fn named_component(
		mut self,
		view: impl Into<String>,
		component: impl RouteComponent + 'static,
	) -> Self {
		self.components
			.insert(view.into(), ComponentSlot::Ready(Arc::new(component)));
		self
	}

	/// Sets a default component loaded on first navigation.
	pub fn lazy_component<F, Fut>(mut self, loader: F) -> Self
	where
		F: Fn() -> Fut + Send + Sync + 'static,
		Fut: Future<Output = anyhow::Result<Arc<dyn RouteComponent>>> + Send + 'static,
	{
		let loader: ComponentLoader = Arc::new(move || loader().boxed());
		self.components
			.insert(DEFAULT_VIEW.to_string(), ComponentSlot::Lazy(loader));
		self
	}

	/// Adds a guard run when the record is entered.
	pub fn before_enter(mut self, guard: Guard) -> Self {
		self.before_enter.push(guard);
		self
	}

	/// Adds a nested route.
	pub fn child(mut self, child: RouteRecordRaw) -> Self {
		self.children.push(child);
		self
	}

	/// Adds several nested routes.
	pub fn children(mut self, children: impl IntoIterator<Item = RouteRecordRaw>) -> Self {
		self.children.extend(children);
		self
	}

	/// Overrides case sensitivity for this record.
	pub fn sensitive(mut self, sensitive: bool) -> Self {
		self.sensitive = Some(sensitive);
		self
	}

	/// Overrides trailing slash strictness for this record.
	pub fn strict(mut self, strict: bool) -> Self {
		self.strict = Some(strict);
		self
	}

	/// Overrides whether the pattern must match the whole path.
	pub fn end(mut self, end: bool) -> Self {
		self.end = Some(end);
		self
	}
}

impl fmt::Debug for RouteRecordRaw {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRecordRaw")
			.field("path", &self.path)
			.field("name", &self.name)
			.field("redirect", &self.redirect)
			.field("components", &self.components.keys().collect::<Vec<_>>())
			.field("before_enter", &self.before_enter.len())
			.field("children", &self.children)
			.finish()
	}
}

/// A normalized route record.
pub struct RouteRecord {
	path: String,
	name: Option<String>,
	redirect: Option<RouteRedirect>,
	meta: RouteMeta,
	before_enter: Vec<Guard>,
	components: RwLock<IndexMap<String, ComponentSlot>>,
	leave_guards: CallbackList<Guard>,
	update_guards: CallbackList<Guard>,
}

impl RouteRecord {
	/// Builds a record from its raw definition and its full path.
	pub fn normalize(raw: &RouteRecordRaw, path: String) -> Self {
		Self {
			path,
			name: raw.name.clone(),
			redirect: raw.redirect.clone(),
			meta: raw.meta.clone(),
			before_enter: raw.before_enter.clone(),
			components: RwLock::new(raw.components.clone()),
			leave_guards: CallbackList::new(),
			update_guards: CallbackList::new(),
		}
	}

	/// Full path pattern.
	pub fn path(&self) -> &str {
		&self.path
	}

	/// Route name.
	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	/// Redirect of the record.
	pub fn redirect(&self) -> Option<&RouteRedirect> {
		self.redirect.as_ref()
	}

	/// Metadata of the record alone.
	pub fn meta(&self) -> &RouteMeta {
		&self.meta
	}

	/// Guards run when the record is entered.
	pub fn before_enter(&self) -> &[Guard] {
		&self.before_enter
	}

	/// Snapshot of the component slots.
	pub fn components(&self) -> Vec<(String, ComponentSlot)> {
		self.components
			.read()
			.iter()
			.map(|(name, slot)| (name.clone(), slot.clone()))
			.collect()
	}

	/// Components that are already loaded.
	pub fn ready_components(&self) -> Vec<Arc<dyn RouteComponent>> {
		self.components
			.read()
			.values()
			.filter_map(|slot| match slot {
				ComponentSlot::Ready(component) => Some(Arc::clone(component)),
				ComponentSlot::Lazy(_) => None,
			})
			.collect()
	}

	/// Replaces a view's slot with a loaded component.
	pub fn set_component(&self, view: &str, component: Arc<dyn RouteComponent>) {
		self.components
			.write()
			.insert(view.to_string(), ComponentSlot::Ready(component));
	}

	/// Registers a guard run when the record is left.
	pub fn on_leave(&self, guard: Guard) -> RemoveHandle {
		self.leave_guards.add(guard)
	}

	/// Registers a guard run when the route changes while the record stays
	/// matched.
	pub fn on_update(&self, guard: Guard) -> RemoveHandle {
		self.update_guards.add(guard)
	}

	/// Registered leave guards.
	pub fn leave_guards(&self) -> Vec<Guard> {
		self.leave_guards.list()
	}

	/// Registered update guards.
	pub fn update_guards(&self) -> Vec<Guard> {
		self.update_guards.list()
	}
}

impl fmt::Debug for RouteRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RouteRecord")
			.field("path", &self.path)
			.field("name", &self.name)
			.field("redirect", &self.redirect)
			.field("meta", &self.meta)
			.field("components", &self.components.read().keys().collect::<Vec<_>>())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::guard::guard_sync;
	use rstest::rstest;

	struct Page;

	impl RouteComponent for Page {}

	#[rstest]
	fn test_normalize_copies_definition() {
		// Arrange
		let raw = RouteRecordRaw::new("posts")
			.name("posts")
			.meta("title", "Posts")
			.component(Page)
			.before_enter(guard_sync(|_, _| true));

		// Act
		let record = RouteRecord::normalize(&raw, "/users/{id}/posts".into());

		// Assert
		assert_eq!(record.path(), "/users/{id}/posts");
		assert_eq!(record.name(), Some("posts"));
		assert_eq!(record.meta().get("title"), Some(&serde_json::json!("Posts")));
		assert_eq!(record.before_enter().len(), 1);
		assert_eq!(record.ready_components().len(), 1);
	}

	#[rstest]
	fn test_runtime_leave_guards() {
		let record = RouteRecord::normalize(&RouteRecordRaw::new("/"), "/".into());
		let handle = record.on_leave(guard_sync(|_, _| false));
		record.on_update(guard_sync(|_, _| true));

		assert_eq!(record.leave_guards().len(), 1);
		handle.remove();
		assert!(record.leave_guards().is_empty());
		assert_eq!(record.update_guards().len(), 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_lazy_component_can_be_replaced() {
		// Arrange
		let raw = RouteRecordRaw::new("/lazy")
			.lazy_component(|| async { Ok(Arc::new(Page) as Arc<dyn RouteComponent>) });
		let record = RouteRecord::normalize(&raw, "/lazy".into());
		assert!(record.ready_components().is_empty());

		// Act
		let (view, slot) = record.components().remove(0);
		let ComponentSlot::Lazy(loader) = slot else {
			panic!("expected a lazy slot");
		};
		let component = loader().await.unwrap();
		record.set_component(&view, component);

		// Assert
		assert_eq!(record.ready_components().len(), 1);
	}

	#[rstest]
	fn test_redirect_with_uses_target() {
		let redirect = RouteRedirect::With(Arc::new(|to: &RouteLocation| {
			RouteLocationRaw::url(format!("{}/overview", to.path))
		}));
		let to = RouteLocation {
			path: "/team".into(),
			full_path: "/team".into(),
			..RouteLocation::start()
		};

		assert_eq!(redirect.target(&to), RouteLocationRaw::url("/team/overview"));
	}
}
