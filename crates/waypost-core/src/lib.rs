//! Core types for waypost.
//!
//! This crate holds the vocabulary shared by the matcher, the history
//! implementations and the router:
//!
//! - [`RouteLocationRaw`] / [`RouteLocation`]: navigation targets before and
//!   after resolution
//! - [`RouteRecordRaw`] / [`RouteRecord`]: route definitions
//! - [`NavigationGuard`]: async guards and their outcomes
//! - [`NavigationFailure`] and [`RouterError`]
//! - URL helpers: [`parse_url`], [`parse_query`], [`stringify_query`],
//!   [`resolve_relative_path`] and the encoders in [`encoding`]

pub mod callbacks;
pub mod encoding;
pub mod error;
pub mod failure;
pub mod guard;
pub mod location;
pub mod query;
pub mod reactive;
pub mod record;
pub mod url;

pub use callbacks::{CallbackList, RemoveHandle};
pub use error::{RouterError, RouterResult};
pub use failure::{NavigationFailure, NavigationFailureKind};
pub use guard::{
	FnGuard, Guard, GuardError, GuardOutcome, GuardResult, IntoGuardResult, NavigationGuard,
	SyncGuard, guard_fn, guard_sync,
};
pub use location::{
	LocationQuery, LocationTarget, ParamValue, QueryValue, RouteLocation, RouteLocationRaw,
	RouteMeta, RouteParams, StateData, is_same_route_location, is_same_route_location_params,
	is_same_route_location_with, is_same_route_record,
};
pub use query::{parse_query, stringify_query};
pub use reactive::Signal;
pub use record::{
	ComponentLoader, ComponentSlot, DEFAULT_VIEW, RouteComponent, RouteRecord, RouteRecordRaw,
	RouteRedirect,
};
pub use url::{
	ParsedUrl, parse_url, parse_url_with, resolve_relative_path, strip_base, stringify_url,
	stringify_url_with,
};
