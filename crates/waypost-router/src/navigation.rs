//! The navigation pipeline.
//!
//! Every navigation, pushed or popped, runs through [`Router::navigate`]. A
//! pushed navigation additionally follows record redirects, detects
//! duplicates and writes the history once its guards have passed.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use waypost_core::{
	LocationTarget, NavigationFailure, NavigationFailureKind, RouteLocation, RouteLocationRaw,
	RouterError, RouterResult, StateData, is_same_route_location_with,
};
use waypost_history::NavigationInformation;

use crate::guards::{
	GuardStage, Interrupt, before_enter_guards, enter_guards, extract_changing_records,
	leave_guards, run_guard, update_guards,
};
use crate::router::{PopEvent, Router};
use crate::scroll::{scroll_key, state_scroll};

impl Router {
	/// Runs a pushed navigation, reporting errors to the error handlers.
	pub(crate) async fn push_with_redirect(
		&self,
		to: RouteLocationRaw,
		redirected_from: Option<Arc<RouteLocation>>,
	) -> RouterResult<Option<NavigationFailure>> {
		self.push_chain(to, redirected_from, 0)
			.await
			.map_err(|err| self.trigger_error(err))
	}

	fn push_chain(
		&self,
		to: RouteLocationRaw,
		redirected_from: Option<Arc<RouteLocation>>,
		redirects: usize,
	) -> BoxFuture<'_, RouterResult<Option<NavigationFailure>>> {
		async move {
			let from = self.current_route();
			let state = to.state.clone();
			let force = to.force;
			let replace = to.replace;

			let mut target = self.resolve_from(&to, &from)?;
			target.redirected_from = redirected_from.clone();
			let target = Arc::new(target);
			*self.inner.pending.lock() = Arc::clone(&target);

			if let Some(redirect) = redirect_location(&target)? {
				let redirects = self.count_redirect(redirects, &from, &target)?;
				tracing::debug!(
					from = %target.full_path,
					redirects,
					"following route record redirect"
				);
				return self
					.push_chain(
						carry_flags(redirect, state, force, replace),
						Some(redirected_from.unwrap_or(target)),
						redirects,
					)
					.await;
			}

			if target.matched.is_empty() {
				return Err(RouterError::MatcherNotFound {
					location: target.full_path.clone(),
				});
			}

			if !force && is_same_route_location_with(&*self.inner.stringify_query, &from, &target) {
				let failure = NavigationFailure::new(
					NavigationFailureKind::Duplicated,
					Arc::clone(&target),
					Arc::clone(&from),
				);
				self.handle_scroll(&from, &from, true, false).await;
				self.trigger_after_each(&target, &from, Some(&failure));
				return Ok(Some(failure));
			}

			let failure = match self.navigate(&target, &from).await {
				Ok(()) => {
					self.finalize_navigation(&target, &from, true, replace, state)
						.await
				}
				Err(Interrupt::Failure(failure)) => Some(failure),
				Err(Interrupt::Redirect(location)) => {
					if let Err(failure) = self.check_cancelled(&target, &from) {
						self.trigger_after_each(&target, &from, Some(&failure));
						return Ok(Some(failure));
					}
					let redirects = self.count_redirect(redirects, &from, &target)?;
					return self
						.push_chain(
							carry_flags(location, state, force, replace),
							Some(redirected_from.unwrap_or(target)),
							redirects,
						)
						.await;
				}
				Err(Interrupt::Error(err)) => return Err(err),
			};

			self.trigger_after_each(&target, &from, failure.as_ref());
			Ok(failure)
		}
		.boxed()
	}

	fn count_redirect(
		&self,
		redirects: usize,
		from: &RouteLocation,
		to: &RouteLocation,
	) -> RouterResult<usize> {
		let redirects = redirects + 1;
		if redirects > self.inner.settings.max_redirects {
			tracing::warn!(
				from = %from.full_path,
				to = %to.full_path,
				"detected an infinite redirection, aborting the navigation"
			);
			return Err(RouterError::InfiniteRedirect {
				from: from.full_path.clone(),
				to: to.full_path.clone(),
			});
		}
		Ok(redirects)
	}

	/// Runs every guard stage of the navigation `from` → `to`.
	pub(crate) async fn navigate(
		&self,
		to: &Arc<RouteLocation>,
		from: &Arc<RouteLocation>,
	) -> Result<(), Interrupt> {
		let records = extract_changing_records(to, from);
		let timeout = self.inner.settings.guard_timeout();

		for stage in GuardStage::ORDER {
			let guards = match stage {
				GuardStage::Leave => leave_guards(&records.leaving),
				GuardStage::BeforeEach => self.inner.before_guards.list(),
				GuardStage::Update => update_guards(&records.updating),
				GuardStage::BeforeEnter => before_enter_guards(to, from),
				GuardStage::EnterComponents => match enter_guards(&records.entering).await {
					Ok(guards) => guards,
					Err(err) => {
						self.check_cancelled(to, from)?;
						return Err(err.into());
					}
				},
				GuardStage::BeforeResolve => self.inner.before_resolve_guards.list(),
			};
			tracing::trace!(?stage, guards = guards.len(), to = %to.full_path, "running guards");

			for guard in &guards {
				// a newer navigation overrides whatever a superseded guard decided
				if let Err(interrupt) = run_guard(guard, to, from, timeout).await {
					self.check_cancelled(to, from)?;
					return Err(interrupt);
				}
			}
			self.check_cancelled(to, from)?;
		}
		Ok(())
	}

	fn check_cancelled(
		&self,
		to: &Arc<RouteLocation>,
		from: &Arc<RouteLocation>,
	) -> Result<(), NavigationFailure> {
		if Arc::ptr_eq(&*self.inner.pending.lock(), to) {
			Ok(())
		} else {
			tracing::debug!(to = %to.full_path, "navigation cancelled by a newer one");
			Err(NavigationFailure::new(
				NavigationFailureKind::Cancelled,
				Arc::clone(to),
				Arc::clone(from),
			))
		}
	}

	/// Commits `to` as the current route.
	async fn finalize_navigation(
		&self,
		to: &Arc<RouteLocation>,
		from: &Arc<RouteLocation>,
		is_push: bool,
		replace: bool,
		data: Option<StateData>,
	) -> Option<NavigationFailure> {
		if let Err(failure) = self.check_cancelled(to, from) {
			return Some(failure);
		}

		let is_first = Arc::ptr_eq(from, &self.inner.start);
		if is_push {
			if replace || is_first {
				let scroll = if is_first {
					self.inner
						.history
						.state()
						.get("scroll")
						.cloned()
						.unwrap_or(Value::Null)
				} else {
					Value::Null
				};
				let mut state = StateData::new();
				state.insert("scroll".to_string(), scroll);
				state.extend(data.unwrap_or_default());
				self.inner.history.replace(&to.full_path, Some(state));
			} else {
				self.inner.history.push(&to.full_path, data);
			}
		}

		self.inner.current.set(Arc::clone(to));
		tracing::debug!(from = %from.full_path, to = %to.full_path, "navigation finalized");
		self.mark_as_ready(None);
		self.handle_scroll(to, from, is_push, is_first).await;
		None
	}

	/// Handles one traversal reported by the history.
	pub(crate) async fn handle_pop(&self, event: PopEvent) {
		let PopEvent {
			to,
			from: previous,
			info,
		} = event;
		tracing::debug!(to = %to, from = %previous, delta = info.delta, "history traversal");
		let from = self.current_route();

		let target = match self.resolve_from(&RouteLocationRaw::url(to), &from) {
			Ok(target) => target,
			Err(err) => {
				self.trigger_error(err);
				return;
			}
		};

		match redirect_location(&target) {
			Ok(Some(redirect)) => {
				let _ = self
					.push_with_redirect(redirect.replacing(), Some(Arc::new(target)))
					.await;
				return;
			}
			Ok(None) => {}
			Err(err) => {
				self.trigger_error(err);
				return;
			}
		}

		let target = Arc::new(target);
		*self.inner.pending.lock() = Arc::clone(&target);
		if let Some(behavior) = &self.inner.scroll_behavior {
			let key = scroll_key(&self.inner.history.state(), &from.full_path, info.delta);
			self.inner.saved_scroll.save(key, behavior.current_position());
		}

		if target.matched.is_empty() {
			self.restore_position(&info);
			self.trigger_error(RouterError::MatcherNotFound {
				location: target.full_path.clone(),
			});
			return;
		}

		let failure = match self.navigate(&target, &from).await {
			Ok(()) => {
				self.finalize_navigation(&target, &from, false, false, None)
					.await
			}
			Err(Interrupt::Failure(failure)) => Some(failure),
			Err(Interrupt::Redirect(location)) => {
				if let Err(failure) = self.check_cancelled(&target, &from) {
					self.trigger_after_each(&target, &from, Some(&failure));
					return;
				}
				let _ = self
					.push_with_redirect(location, Some(Arc::clone(&target)))
					.await;
				return;
			}
			Err(Interrupt::Error(err)) => {
				self.restore_position(&info);
				self.trigger_error(err);
				return;
			}
		};

		if failure.is_some() {
			self.restore_position(&info);
		}
		self.trigger_after_each(&target, &from, failure.as_ref());
	}

	/// Moves the history back to where it was before a failed traversal.
	fn restore_position(&self, info: &NavigationInformation) {
		if info.delta != 0 {
			self.inner.history.go(-info.delta, false);
		}
	}

	/// Asks the scroll behavior where to scroll after a navigation.
	pub(crate) async fn handle_scroll(
		&self,
		to: &RouteLocation,
		from: &RouteLocation,
		is_push: bool,
		is_first: bool,
	) {
		let Some(behavior) = self.inner.scroll_behavior.clone() else {
			return;
		};

		let state = self.inner.history.state();
		let saved = if is_push {
			None
		} else {
			self.inner.saved_scroll.take(&scroll_key(&state, &to.full_path, 0))
		};
		let position = saved.or_else(|| {
			if is_first || !is_push {
				state_scroll(&state)
			} else {
				None
			}
		});

		match behavior.resolve(to, from, position).await {
			Ok(Some(position)) => behavior.scroll_to(position),
			Ok(None) => {}
			Err(err) => {
				self.trigger_error(RouterError::Scroll(Arc::new(err)));
			}
		}
	}

	fn trigger_after_each(
		&self,
		to: &RouteLocation,
		from: &RouteLocation,
		failure: Option<&NavigationFailure>,
	) {
		for hook in self.inner.after_hooks.list() {
			hook(to, from, failure);
		}
	}

	/// Reports `err` to the error handlers and hands it back.
	pub(crate) fn trigger_error(&self, err: RouterError) -> RouterError {
		self.mark_as_ready(Some(&err));
		let handlers = self.inner.error_handlers.list();
		if handlers.is_empty() {
			tracing::error!(error = %err, "uncaught error during route navigation");
		} else {
			tracing::debug!(error = %err, handlers = handlers.len(), "navigation error");
		}
		for handler in handlers {
			handler(&err);
		}
		err
	}

	/// Marks the router ready once, starting to listen to the history and
	/// settling pending [`is_ready`](Router::is_ready) calls.
	pub(crate) fn mark_as_ready(&self, err: Option<&RouterError>) {
		let waiters = {
			let mut ready = self.inner.ready.lock();
			if ready.ready {
				return;
			}
			ready.ready = true;
			ready.error = err.cloned();
			std::mem::take(&mut ready.waiters)
		};

		self.setup_listeners();
		for waiter in waiters {
			let result = match err {
				Some(err) => Err(err.clone()),
				None => Ok(()),
			};
			// the caller may have stopped waiting
			let _ = waiter.send(result);
		}
	}

	fn setup_listeners(&self) {
		let events = Arc::clone(&self.inner.pop_events);
		let notify = Arc::clone(&self.inner.pop_notify);
		let handle = self.inner.history.listen(Arc::new(
			move |to: &str, from: &str, info: &NavigationInformation| {
				events.lock().push_back(PopEvent {
					to: to.to_string(),
					from: from.to_string(),
					info: *info,
				});
				notify.notify_one();
			},
		));

		if let Some(previous) = self.inner.history_listener.lock().replace(handle) {
			previous.remove();
		}
	}
}

/// Where the deepest record of `to` redirects, with the query, hash and
/// params of `to` filled in when the redirect does not set them.
fn redirect_location(to: &RouteLocation) -> RouterResult<Option<RouteLocationRaw>> {
	let Some(redirect) = to.leaf().and_then(|record| record.redirect()) else {
		return Ok(None);
	};

	let mut location = redirect.target(to);
	if let LocationTarget::Url(url) = &location.target {
		if !url.contains('?') && !url.contains('#') {
			location.target = LocationTarget::Path(url.clone());
		}
	}

	match &mut location.target {
		LocationTarget::Url(_) => return Ok(Some(location)),
		LocationTarget::Path(_) => {}
		LocationTarget::Named { params, .. } => {
			if params.is_empty() {
				params.clone_from(&to.params);
			}
		}
		LocationTarget::Params(_) => {
			tracing::warn!(
				to = %to.full_path,
				"a redirect must contain a name or a path"
			);
			return Err(RouterError::InvalidRedirect {
				to: to.full_path.clone(),
			});
		}
	}

	if location.query.is_none() {
		location.query = Some(to.query.clone());
	}
	if location.hash.is_none() {
		location.hash = Some(to.hash.clone());
	}
	Ok(Some(location))
}

/// Gives a redirect target the navigation flags of the location it replaces.
fn carry_flags(
	mut location: RouteLocationRaw,
	state: Option<StateData>,
	force: bool,
	replace: bool,
) -> RouteLocationRaw {
	location.state = state;
	location.force = force;
	location.replace = replace;
	location
}
