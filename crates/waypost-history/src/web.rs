//! Browser history bookkeeping over an abstract backend.
//!
//! [`WebHistory`] keeps the same per-entry state a browser router stores in
//! `history.state` (previous, current and next locations, position, saved
//! scroll) while the actual browser calls go through a [`BrowserBackend`]
//! provided by the host, e.g. a `web-sys` binding or a test double.

use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use waypost_core::{CallbackList, RemoveHandle, StateData, strip_base};

use crate::common::{
	HistoryListener, NavigationInformation, RouterHistory, ScrollPosition, normalize_base,
};

/// Errors reported by a [`BrowserBackend`].
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum HistoryError {
	/// `pushState`/`replaceState` threw, e.g. because of a quota or a
	/// cross-origin URL.
	#[error("browser rejected the history state update: {0}")]
	StateRejected(String),
}

/// The parts of `window.location` the history reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowserLocation {
	/// `protocol//host`, empty when there is no host.
	pub origin: String,
	pub pathname: String,
	pub search: String,
	pub hash: String,
}

/// The browser APIs a [`WebHistory`] drives.
pub trait BrowserBackend: Send + Sync {
	/// Current `window.location`.
	fn location(&self) -> BrowserLocation;

	/// `history.length`.
	fn history_length(&self) -> usize;

	/// `history.state`, `None` when unset.
	fn history_state(&self) -> Option<StateData>;

	/// `history.pushState(state, "", url)`.
	fn push_state(&self, state: &StateData, url: &str) -> Result<(), HistoryError>;

	/// `history.replaceState(state, "", url)`.
	fn replace_state(&self, state: &StateData, url: &str) -> Result<(), HistoryError>;

	/// `history.go(delta)`; the browser answers with a `popstate` event.
	fn go(&self, delta: i64);

	/// `location.assign(url)`, used when the state API fails.
	fn assign(&self, url: &str);

	/// `location.replace(url)`, used when the state API fails.
	fn replace_location(&self, url: &str);

	/// Current window scroll offset.
	fn scroll_position(&self) -> ScrollPosition;
}

/// The state stored with every entry written by [`WebHistory`].
///
/// Extra keys passed by the router or by the application are kept next to
/// the bookkeeping fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryState {
	pub back: Option<String>,
	pub current: String,
	pub forward: Option<String>,
	pub replaced: bool,
	pub position: i64,
	pub scroll: Option<ScrollPosition>,
	#[serde(flatten)]
	pub extra: StateData,
}

impl HistoryState {
	/// Reads the bookkeeping fields out of raw entry state.
	///
	/// Returns `None` when the entry was not written by a [`WebHistory`].
	pub fn from_data(data: &StateData) -> Option<Self> {
		serde_json::from_value(serde_json::Value::Object(data.clone())).ok()
	}

	/// Converts to raw entry state.
	pub fn into_data(self) -> StateData {
		let Self {
			back,
			current,
			forward,
			replaced,
			position,
			scroll,
			extra,
		} = self;

		let mut data = extra;
		data.insert("back".into(), back.into());
		data.insert("current".into(), current.into());
		data.insert("forward".into(), forward.into());
		data.insert("replaced".into(), replaced.into());
		data.insert("position".into(), position.into());
		data.insert(
			"scroll".into(),
			match scroll {
				Some(scroll) => serde_json::json!({ "left": scroll.left, "top": scroll.top }),
				None => serde_json::Value::Null,
			},
		);
		data
	}
}

struct WebState {
	location: String,
	state: StateData,
	paused_at: Option<String>,
}

/// A history backed by the browser History API.
///
/// Bases containing a `#` (see [`WebHistory::hash`]) keep the route in the
/// URL fragment.
pub struct WebHistory<B> {
	backend: B,
	base: String,
	inner: Mutex<WebState>,
	listeners: CallbackList<HistoryListener>,
}

impl<B: BrowserBackend> WebHistory<B> {
	/// Creates a history for `base`, writing an initial state entry when the
	/// current entry has none.
	pub fn new(backend: B, base: &str) -> Self {
		let base = normalize_base(base);
		let location = current_location(&base, &backend.location());
		let existing = backend.history_state();

		let history = Self {
			inner: Mutex::new(WebState {
				location: location.clone(),
				state: existing.clone().unwrap_or_default(),
				paused_at: None,
			}),
			backend,
			base,
			listeners: CallbackList::new(),
		};

		if existing.is_none() {
			let initial = HistoryState {
				back: None,
				current: location.clone(),
				forward: None,
				replaced: true,
				position: history.backend.history_length() as i64 - 1,
				scroll: None,
				extra: StateData::new(),
			};
			history.change_location(&location, initial.into_data(), true);
		}
		history
	}

	/// Creates a history that keeps the route after a `#`.
	///
	/// An empty base uses the current pathname when the page has an origin.
	pub fn hash(backend: B, base: &str) -> Self {
		let location = backend.location();
		let mut base = if !base.is_empty() {
			base.to_string()
		} else if !location.origin.is_empty() {
			location.pathname.clone()
		} else {
			String::new()
		};
		if !base.contains('#') {
			base.push('#');
		}
		if !base.ends_with("#/") && !base.ends_with('#') {
			tracing::warn!(
				base = %base,
				"a hash base must end with a \"#\""
			);
		}
		Self::new(backend, &base)
	}

	/// The browser backend.
	pub fn backend(&self) -> &B {
		&self.backend
	}

	/// Handles a browser `popstate` event carrying `state`.
	///
	/// Listeners are notified unless the traversal was started by
	/// [`go`](RouterHistory::go) with `trigger_listeners` set to `false`.
	pub fn handle_pop_state(&self, state: Option<StateData>) {
		let to = current_location(&self.base, &self.backend.location());

		let (from, delta) = {
			let mut inner = self.inner.lock();
			let from = inner.location.clone();
			match state {
				Some(state) => {
					let from_position = HistoryState::from_data(&inner.state).map(|s| s.position);
					let to_position = HistoryState::from_data(&state).map(|s| s.position);
					inner.location = to.clone();
					inner.state = state;

					if inner.paused_at.as_deref() == Some(from.as_str()) {
						inner.paused_at = None;
						return;
					}
					let delta = match (from_position, to_position) {
						(Some(from), Some(to)) => to - from,
						_ => 0,
					};
					(from, delta)
				}
				None => {
					drop(inner);
					self.replace(&to, None);
					(from, 0)
				}
			}
		};

		let location = self.location();
		let info = NavigationInformation::pop(delta);
		for listener in self.listeners.list() {
			listener(&location, &from, &info);
		}
	}

	/// Handles `beforeunload` by saving the scroll position in the current
	/// entry.
	pub fn handle_before_unload(&self) {
		let Some(mut state) = self.backend.history_state() else {
			return;
		};
		let scroll = self.backend.scroll_position();
		state.insert(
			"scroll".into(),
			serde_json::json!({ "left": scroll.left, "top": scroll.top }),
		);
		if let Err(err) = self.backend.replace_state(&state, &self.url_for(&self.location())) {
			tracing::warn!(error = %err, "failed to save the scroll position");
		}
	}

	fn url_for(&self, to: &str) -> String {
		match self.base.find('#') {
			Some(index) => format!("{}{to}", &self.base[index..]),
			None => {
				let origin = self.backend.location().origin;
				format!("{origin}{}{to}", self.base)
			}
		}
	}

	fn change_location(&self, to: &str, state: StateData, replace: bool) {
		let url = self.url_for(to);
		let result = if replace {
			self.backend.replace_state(&state, &url)
		} else {
			self.backend.push_state(&state, &url)
		};

		match result {
			Ok(()) => self.inner.lock().state = state,
			Err(err) => {
				tracing::warn!(error = %err, url = %url, "error with push/replace state");
				if replace {
					self.backend.replace_location(&url);
				} else {
					self.backend.assign(&url);
				}
			}
		}
	}

	fn bookkeeping(&self) -> HistoryState {
		let inner = self.inner.lock();
		HistoryState::from_data(&inner.state).unwrap_or_else(|| HistoryState {
			back: None,
			current: inner.location.clone(),
			forward: None,
			replaced: false,
			position: self.backend.history_length() as i64 - 1,
			scroll: None,
			extra: StateData::new(),
		})
	}
}

impl<B: BrowserBackend> RouterHistory for WebHistory<B> {
	fn base(&self) -> &str {
		&self.base
	}

	fn location(&self) -> String {
		self.inner.lock().location.clone()
	}

	fn state(&self) -> StateData {
		self.inner.lock().state.clone()
	}

	fn push(&self, to: &str, data: Option<StateData>) {
		let browser_state = self.backend.history_state();
		if browser_state.is_none() {
			tracing::warn!(
				"history.state seems to have been manually replaced without preserving the necessary values"
			);
		}

		// remember where we are leaving and the scroll position
		let mut leaving = self.state();
		leaving.extend(browser_state.unwrap_or_default());
		leaving.insert("forward".into(), to.into());
		let scroll = self.backend.scroll_position();
		leaving.insert(
			"scroll".into(),
			serde_json::json!({ "left": scroll.left, "top": scroll.top }),
		);
		let current = leaving
			.get("current")
			.and_then(|value| value.as_str())
			.map(str::to_string)
			.unwrap_or_else(|| self.location());
		let position = leaving
			.get("position")
			.and_then(|value| value.as_i64())
			.unwrap_or(self.backend.history_length() as i64 - 1);
		self.change_location(&current, leaving, true);

		let mut state = HistoryState {
			back: Some(self.location()),
			current: to.to_string(),
			forward: None,
			replaced: false,
			position: position + 1,
			scroll: None,
			extra: StateData::new(),
		}
		.into_data();
		state.extend(data.unwrap_or_default());
		self.change_location(to, state, false);
		self.inner.lock().location = to.to_string();
	}

	fn replace(&self, to: &str, data: Option<StateData>) {
		let previous = self.bookkeeping();
		let mut state = self.backend.history_state().unwrap_or_default();
		state.extend(
			HistoryState {
				back: previous.back,
				current: to.to_string(),
				forward: previous.forward,
				replaced: true,
				position: previous.position,
				scroll: None,
				extra: StateData::new(),
			}
			.into_data(),
		);
		state.extend(data.unwrap_or_default());
		state.insert("position".into(), previous.position.into());

		self.change_location(to, state, true);
		self.inner.lock().location = to.to_string();
	}

	fn go(&self, delta: i64, trigger_listeners: bool) {
		if !trigger_listeners {
			let mut inner = self.inner.lock();
			inner.paused_at = Some(inner.location.clone());
		}
		self.backend.go(delta);
	}

	fn listen(&self, listener: HistoryListener) -> RemoveHandle {
		self.listeners.add(listener)
	}

	fn destroy(&self) {
		self.listeners.reset();
	}
}

impl<B> fmt::Debug for WebHistory<B> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebHistory")
			.field("base", &self.base)
			.field("location", &self.inner.lock().location)
			.finish()
	}
}

/// Location relative to `base` read from the browser location.
fn current_location(base: &str, location: &BrowserLocation) -> String {
	if base.contains('#') {
		let from_hash = location.hash.get(1..).unwrap_or("");
		return if from_hash.starts_with('/') {
			from_hash.to_string()
		} else {
			format!("/{from_hash}")
		};
	}
	let path = strip_base(&location.pathname, base);
	format!("{path}{}{}", location.search, location.hash)
}
