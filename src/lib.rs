//! # Waypost
//!
//! Client-side routing for Rust hosts: path matching with ranked patterns, a
//! pluggable history and an async navigation pipeline with guards, redirects
//! and cancellation.
//!
//! The facade re-exports the member crates:
//!
//! - [`core`]: locations, route records, guards, failures and URL helpers
//! - [`matcher`]: path patterns and the route table
//! - [`history`]: the history abstraction with memory and web implementations
//! - [`router`]: the router itself
//!
//! ## Feature Flags
//!
//! - `web-history` (default): [`WebHistory`](history::WebHistory), the
//!   browser history bookkeeping over a host-provided backend
//!
//! ## Quick Example
//!
//! ```
//! use waypost::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let router = Router::new(
//! 	RouterOptions::new(MemoryHistory::new("/"))
//! 		.route(RouteRecordRaw::new("/").name("home"))
//! 		.route(RouteRecordRaw::new("/users/{id}").name("user")),
//! )
//! .unwrap();
//!
//! router.before_each(guard_sync(|to, _| to.param("id") != Some("0")));
//!
//! router.push("/").await.unwrap();
//! let failure = router
//! 	.push(RouteLocationRaw::named("user").with_param("id", "0"))
//! 	.await
//! 	.unwrap();
//!
//! assert!(failure.is_some_and(|f| f.kind() == NavigationFailureKind::Aborted));
//! assert_eq!(router.current_route().path, "/");
//! # });
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

pub use waypost_core as core;
pub use waypost_history as history;
pub use waypost_matcher as matcher;
pub use waypost_router as router;

pub use waypost_core::{
	NavigationFailure, NavigationFailureKind, RouteLocation, RouteLocationRaw, RouteRecordRaw,
	RouterError, RouterResult,
};
pub use waypost_router::{Router, RouterOptions, RouterSettings};

pub mod prelude {
	pub use waypost_core::{
		Guard, GuardError, GuardOutcome, LocationQuery, NavigationFailure, NavigationFailureKind,
		NavigationGuard, ParamValue, QueryValue, RemoveHandle, RouteComponent, RouteLocation,
		RouteLocationRaw, RouteParams, RouteRecordRaw, RouterError, RouterResult, guard_fn,
		guard_sync,
	};
	pub use waypost_history::{MemoryHistory, RouterHistory, ScrollPosition};
	#[cfg(feature = "web-history")]
	#[cfg_attr(docsrs, doc(cfg(feature = "web-history")))]
	pub use waypost_history::{BrowserBackend, WebHistory};
	pub use waypost_router::{
		LinkEvent, LinkState, Router, RouterApp, RouterOptions, RouterSettings, ScrollBehavior,
	};
}
