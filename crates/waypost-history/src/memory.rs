//! An in-memory history for servers, tests and non-browser hosts.

use std::fmt;

use parking_lot::Mutex;
use waypost_core::{CallbackList, RemoveHandle, StateData};

use crate::common::{
	HistoryListener, NavigationInformation, RouterHistory, START, normalize_base,
};

struct Entry {
	location: String,
	data: StateData,
}

struct Stack {
	entries: Vec<Entry>,
	position: usize,
}

impl Stack {
	fn current(&self) -> &Entry {
		&self.entries[self.position]
	}
}

/// A history kept in a vector of entries.
///
/// It starts with a single empty location. `go` moves the position and
/// notifies listeners like a browser `popstate` would; positions are clamped
/// to the existing entries and listeners receive the distance actually
/// travelled, or nothing when the position did not change.
///
/// # Examples
///
/// ```
/// use waypost_history::{MemoryHistory, RouterHistory};
///
/// let history = MemoryHistory::new("/");
/// history.push("/about", None);
/// history.push("/contact", None);
/// history.go(-1, false);
/// assert_eq!(history.location(), "/about");
/// ```
pub struct MemoryHistory {
	base: String,
	stack: Mutex<Stack>,
	listeners: CallbackList<HistoryListener>,
}

impl MemoryHistory {
	/// Creates a history whose only entry is the empty start location.
	pub fn new(base: &str) -> Self {
		Self {
			base: normalize_base(base),
			stack: Mutex::new(Stack {
				entries: vec![Entry {
					location: START.to_string(),
					data: StateData::new(),
				}],
				position: 0,
			}),
			listeners: CallbackList::new(),
		}
	}

	/// Index of the current entry.
	pub fn position(&self) -> usize {
		self.stack.lock().position
	}

	/// Number of entries.
	pub fn len(&self) -> usize {
		self.stack.lock().entries.len()
	}

	/// Always `false`: the start entry is never removed.
	pub fn is_empty(&self) -> bool {
		false
	}

	/// Locations of every entry, oldest first.
	pub fn entries(&self) -> Vec<String> {
		self.stack
			.lock()
			.entries
			.iter()
			.map(|entry| entry.location.clone())
			.collect()
	}
}

impl RouterHistory for MemoryHistory {
	fn base(&self) -> &str {
		&self.base
	}

	fn location(&self) -> String {
		self.stack.lock().current().location.clone()
	}

	fn state(&self) -> StateData {
		let stack = self.stack.lock();
		let mut state = stack.current().data.clone();
		state.insert("position".to_string(), stack.position.into());
		state
	}

	fn push(&self, to: &str, data: Option<StateData>) {
		let mut stack = self.stack.lock();
		let next = stack.position + 1;
		stack.entries.truncate(next);
		stack.entries.push(Entry {
			location: to.to_string(),
			data: data.unwrap_or_default(),
		});
		stack.position = next;
	}

	fn replace(&self, to: &str, data: Option<StateData>) {
		let mut stack = self.stack.lock();
		let position = stack.position;
		stack.entries.truncate(position + 1);
		stack.entries[position] = Entry {
			location: to.to_string(),
			data: data.unwrap_or_default(),
		};
	}

	fn go(&self, delta: i64, trigger_listeners: bool) {
		let (to, from, moved) = {
			let mut stack = self.stack.lock();
			let from = stack.current().location.clone();
			let last = stack.entries.len() as i64 - 1;
			let current = stack.position as i64;
			let position = current.saturating_add(delta).clamp(0, last);
			stack.position = position as usize;
			(stack.current().location.clone(), from, position - current)
		};

		// listeners only hear about traversals that happened
		if trigger_listeners && moved != 0 {
			let info = NavigationInformation::pop(moved);
			for listener in self.listeners.list() {
				listener(&to, &from, &info);
			}
		}
	}

	fn listen(&self, listener: HistoryListener) -> RemoveHandle {
		self.listeners.add(listener)
	}

	fn destroy(&self) {
		self.listeners.reset();
	}
}

impl fmt::Debug for MemoryHistory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let stack = self.stack.lock();
		f.debug_struct("MemoryHistory")
			.field("base", &self.base)
			.field("position", &stack.position)
			.field(
				"entries",
				&stack.entries.iter().map(|e| &e.location).collect::<Vec<_>>(),
			)
			.finish()
	}
}
