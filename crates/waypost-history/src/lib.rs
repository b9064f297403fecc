//! History implementations for waypost.
//!
//! The router only talks to the [`RouterHistory`] trait. Two implementations
//! are provided:
//!
//! - [`MemoryHistory`]: an in-memory stack, for servers, tests and native
//!   hosts
//! - [`WebHistory`] (feature `web`): browser history bookkeeping over a
//!   [`BrowserBackend`] supplied by the host

pub mod common;
pub mod memory;
#[cfg(feature = "web")]
pub mod web;

pub use common::{
	HistoryListener, NavigationDirection, NavigationInformation, NavigationType, RouterHistory,
	START, ScrollPosition, create_href, normalize_base,
};
pub use memory::MemoryHistory;
#[cfg(feature = "web")]
pub use web::{BrowserBackend, BrowserLocation, HistoryError, HistoryState, WebHistory};
