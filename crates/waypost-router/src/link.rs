//! State of a link pointing at a route.
//!
//! Views rendering navigation links compute a [`LinkState`] for every link
//! to know where it points and whether it should be highlighted.

use std::sync::Arc;

use waypost_core::{
	NavigationFailure, ParamValue, RouteLocation, RouteLocationRaw, RouteParams, RouterResult,
	is_same_route_location_params, is_same_route_record,
};

use crate::router::Router;

/// Where a link points and how it relates to the current route.
#[derive(Debug, Clone)]
pub struct LinkState {
	/// The location the link was created with.
	pub to: RouteLocationRaw,
	/// The resolved target.
	pub route: Arc<RouteLocation>,
	/// Value for the link's `href` attribute.
	pub href: String,
	/// The target is the current route or one of its ancestors.
	pub is_active: bool,
	/// The target is exactly the current route.
	pub is_exact_active: bool,
	/// Classes to set on the link.
	pub classes: Vec<String>,
}

impl LinkState {
	pub(crate) fn new(router: &Router, to: RouteLocationRaw) -> RouterResult<Self> {
		let route = Arc::new(router.resolve(to.clone())?);
		let current = router.current_route();

		let index = active_record_index(&route, &current);
		let is_active = index.is_some() && includes_params(&current.params, &route.params);
		let is_exact_active = index.is_some_and(|index| index + 1 == current.matched.len())
			&& is_same_route_location_params(&current.params, &route.params);

		let settings = router.settings();
		let mut classes = Vec::new();
		if is_active {
			classes.push(settings.link_active_class.clone());
		}
		if is_exact_active {
			classes.push(settings.link_exact_active_class.clone());
		}

		Ok(Self {
			to,
			href: route.href.clone(),
			route,
			is_active,
			is_exact_active,
			classes,
		})
	}

	/// Navigates to the link target if `event` is a plain activation.
	///
	/// Returns `Ok(None)` without navigating when the event should be left
	/// to the platform.
	pub async fn navigate(
		&self,
		router: &Router,
		event: &LinkEvent,
		replace: bool,
	) -> RouterResult<Option<NavigationFailure>> {
		if !event.should_navigate() {
			return Ok(None);
		}
		if replace {
			router.replace(self.to.clone()).await
		} else {
			router.push(self.to.clone()).await
		}
	}
}

/// Index in `current.matched` of the record the link points at.
fn active_record_index(route: &RouteLocation, current: &RouteLocation) -> Option<usize> {
	let route_leaf = route.matched.last()?;
	if current.matched.is_empty() {
		return None;
	}

	let index = current
		.matched
		.iter()
		.position(|record| is_same_route_record(record, route_leaf));
	if index.is_some() {
		return index;
	}

	// A child with an empty path shares its parent's path: the link is
	// active when the current route is another child of that parent.
	let len = route.matched.len();
	if len < 2 {
		return None;
	}
	let parent = &route.matched[len - 2];
	let current_leaf_path = current.matched.last().map(|record| record.path());
	if route_leaf.path() == parent.path() && current_leaf_path != Some(parent.path()) {
		current
			.matched
			.iter()
			.position(|record| is_same_route_record(record, parent))
	} else {
		None
	}
}

/// Returns `true` when every param of `inner` has the same value in `outer`.
pub fn includes_params(outer: &RouteParams, inner: &RouteParams) -> bool {
	inner.iter().all(|(key, inner_value)| match (inner_value, outer.get(key)) {
		(ParamValue::Single(inner), Some(ParamValue::Single(outer))) => inner == outer,
		(ParamValue::List(inner), Some(ParamValue::List(outer))) => inner == outer,
		_ => false,
	})
}

/// The parts of a click event that decide whether a link navigates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkEvent {
	pub meta_key: bool,
	pub alt_key: bool,
	pub ctrl_key: bool,
	pub shift_key: bool,
	pub default_prevented: bool,
	/// Mouse button, when the event came from a mouse.
	pub button: Option<u16>,
	/// `target` attribute of the link.
	pub target: Option<String>,
}

impl LinkEvent {
	/// A plain primary click.
	pub fn click() -> Self {
		Self {
			button: Some(0),
			..Self::default()
		}
	}

	/// Returns `false` for clicks the platform should handle itself:
	/// modified clicks, non-primary buttons, prevented events and links
	/// opening a new window.
	pub fn should_navigate(&self) -> bool {
		if self.meta_key || self.alt_key || self.ctrl_key || self.shift_key {
			return false;
		}
		if self.default_prevented {
			return false;
		}
		if self.button.is_some_and(|button| button != 0) {
			return false;
		}
		!self.target.as_deref().is_some_and(opens_new_window)
	}
}

fn opens_new_window(target: &str) -> bool {
	target
		.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
		.any(|word| word.eq_ignore_ascii_case("_blank"))
}
