//! The guard pipeline.
//!
//! A navigation runs its guards stage by stage, in the order of
//! [`GuardStage::ORDER`]. Within a stage guards run one after the other; the
//! first guard that does not continue interrupts the navigation.

use std::sync::Arc;
use std::time::Duration;

use waypost_core::{
	ComponentSlot, Guard, GuardError, GuardOutcome, NavigationFailure, RouteComponent,
	RouteLocation, RouteLocationRaw, RouteRecord, RouterError,
};

/// A step of the guard pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardStage {
	/// Leave guards of the records being left, deepest record first.
	Leave,
	/// Global `before_each` guards.
	BeforeEach,
	/// Update guards of the records matched by both locations.
	Update,
	/// `before_enter` guards of the records being entered.
	BeforeEnter,
	/// Enter guards of the components being entered, after loading them.
	EnterComponents,
	/// Global `before_resolve` guards.
	BeforeResolve,
}

impl GuardStage {
	/// Stages in the order they run.
	pub const ORDER: [GuardStage; 6] = [
		GuardStage::Leave,
		GuardStage::BeforeEach,
		GuardStage::Update,
		GuardStage::BeforeEnter,
		GuardStage::EnterComponents,
		GuardStage::BeforeResolve,
	];
}

/// Why a navigation stopped before finalizing.
#[derive(Debug)]
pub(crate) enum Interrupt {
	/// Aborted or cancelled.
	Failure(NavigationFailure),
	/// A guard asked to go somewhere else.
	Redirect(RouteLocationRaw),
	/// A guard or a component loader failed.
	Error(RouterError),
}

impl From<NavigationFailure> for Interrupt {
	fn from(failure: NavigationFailure) -> Self {
		Self::Failure(failure)
	}
}

impl From<RouterError> for Interrupt {
	fn from(err: RouterError) -> Self {
		Self::Error(err)
	}
}

/// Records of `from` and `to` split by what happens to them.
#[derive(Debug, Default)]
pub(crate) struct ChangingRecords {
	/// In `from` but not in `to`, shallowest first.
	pub(crate) leaving: Vec<Arc<RouteRecord>>,
	/// In both.
	pub(crate) updating: Vec<Arc<RouteRecord>>,
	/// In `to` but not in `from`.
	pub(crate) entering: Vec<Arc<RouteRecord>>,
}

pub(crate) fn extract_changing_records(to: &RouteLocation, from: &RouteLocation) -> ChangingRecords {
	let mut records = ChangingRecords::default();
	let len = from.matched.len().max(to.matched.len());

	for i in 0..len {
		if let Some(record) = from.matched.get(i) {
			if to.contains_record(record) {
				records.updating.push(Arc::clone(record));
			} else {
				records.leaving.push(Arc::clone(record));
			}
		}
		if let Some(record) = to.matched.get(i) {
			if !from.contains_record(record) {
				records.entering.push(Arc::clone(record));
			}
		}
	}
	records
}

/// Runs one guard, converting its outcome.
pub(crate) async fn run_guard(
	guard: &Guard,
	to: &Arc<RouteLocation>,
	from: &Arc<RouteLocation>,
	timeout: Option<Duration>,
) -> Result<(), Interrupt> {
	let check = guard.check(Arc::clone(to), Arc::clone(from));
	let result = match timeout {
		Some(timeout) => match tokio::time::timeout(timeout, check).await {
			Ok(result) => result,
			Err(_) => {
				tracing::warn!(to = %to.full_path, ?timeout, "navigation guard timed out");
				return Err(Interrupt::Error(RouterError::GuardTimeout(timeout)));
			}
		},
		None => check.await,
	};

	match result {
		Ok(GuardOutcome::Continue) => Ok(()),
		Ok(GuardOutcome::Abort) => Err(Interrupt::Failure(NavigationFailure::new(
			waypost_core::NavigationFailureKind::Aborted,
			Arc::clone(to),
			Arc::clone(from),
		))),
		Ok(GuardOutcome::Redirect(location)) => Err(Interrupt::Redirect(location)),
		Err(GuardError::Failure(failure)) => Err(Interrupt::Failure(failure)),
		Err(GuardError::Router(err)) => Err(Interrupt::Error(err)),
		Err(GuardError::Other(err)) => Err(Interrupt::Error(RouterError::Guard(err))),
		Err(err) => Err(Interrupt::Error(RouterError::Guard(Arc::new(anyhow::Error::new(err))))),
	}
}

/// Leave guards of `records`, deepest record first: component guards, then
/// guards registered on the records.
pub(crate) fn leave_guards(records: &[Arc<RouteRecord>]) -> Vec<Guard> {
	let records: Vec<&Arc<RouteRecord>> = records.iter().rev().collect();
	let mut guards: Vec<Guard> = records
		.iter()
		.flat_map(|record| record.ready_components())
		.filter_map(|component| component.before_route_leave())
		.collect();
	guards.extend(records.iter().flat_map(|record| record.leave_guards()));
	guards
}

/// Update guards of `records`: component guards, then guards registered on
/// the records.
pub(crate) fn update_guards(records: &[Arc<RouteRecord>]) -> Vec<Guard> {
	let mut guards: Vec<Guard> = records
		.iter()
		.flat_map(|record| record.ready_components())
		.filter_map(|component| component.before_route_update())
		.collect();
	guards.extend(records.iter().flat_map(|record| record.update_guards()));
	guards
}

/// `before_enter` guards of the records of `to` that `from` does not have.
pub(crate) fn before_enter_guards(to: &RouteLocation, from: &RouteLocation) -> Vec<Guard> {
	to.matched
		.iter()
		.filter(|record| !from.contains_record(record))
		.flat_map(|record| record.before_enter().iter().cloned())
		.collect()
}

/// Enter guards of the components of `records`, loading lazy components
/// first. Loaded components replace their loader in the record.
pub(crate) async fn enter_guards(records: &[Arc<RouteRecord>]) -> Result<Vec<Guard>, RouterError> {
	let mut guards = Vec::new();
	for record in records {
		for (view, slot) in record.components() {
			let component: Arc<dyn RouteComponent> = match slot {
				ComponentSlot::Ready(component) => component,
				ComponentSlot::Lazy(loader) => {
					tracing::debug!(path = record.path(), view = %view, "loading route component");
					let component = loader().await.map_err(|err| RouterError::ComponentLoad {
						name: view.clone(),
						path: record.path().to_string(),
						reason: err.to_string(),
					})?;
					record.set_component(&view, Arc::clone(&component));
					component
				}
			};
			guards.extend(component.before_route_enter());
		}
	}
	Ok(guards)
}
