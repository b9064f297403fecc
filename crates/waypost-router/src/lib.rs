//! Navigation for waypost.
//!
//! [`Router`] ties the matcher and a history together:
//!
//! - resolving raw locations into [`RouteLocation`](waypost_core::RouteLocation)s
//! - running navigations through the guard pipeline ([`GuardStage`]), with
//!   record and guard redirects, duplicate detection and cancellation of
//!   superseded navigations
//! - reacting to history traversals
//! - readiness, error handlers, scroll restoration and link state
//!
//! ## Guard order
//!
//! Leave guards of the records being left, global `before_each` guards,
//! update guards of the records kept, `before_enter` guards of the records
//! entered, enter guards of their components and finally global
//! `before_resolve` guards.

pub mod guards;
pub mod link;
mod navigation;
pub mod options;
pub mod router;
pub mod scroll;

pub use guards::GuardStage;
pub use link::{LinkEvent, LinkState, includes_params};
pub use options::{QueryParser, QueryStringifier, RouterOptions, RouterSettings};
pub use router::{AfterEachHook, ErrorHandler, Router, RouterApp};
pub use scroll::ScrollBehavior;
