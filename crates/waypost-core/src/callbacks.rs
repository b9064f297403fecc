//! Registration lists for hooks, listeners and guards.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

struct Entries<T> {
	next_id: u64,
	items: Vec<(u64, T)>,
}

/// An ordered list of callbacks that hands out a [`RemoveHandle`] per entry.
///
/// Cloning the list shares the underlying entries.
pub struct CallbackList<T> {
	entries: Arc<Mutex<Entries<T>>>,
}

impl<T: Clone + Send + 'static> CallbackList<T> {
	/// Creates an empty list.
	pub fn new() -> Self {
		Self {
			entries: Arc::new(Mutex::new(Entries {
				next_id: 0,
				items: Vec::new(),
			})),
		}
	}

	/// Appends `item` and returns a handle that removes it again.
	pub fn add(&self, item: T) -> RemoveHandle {
		let id = {
			let mut entries = self.entries.lock();
			let id = entries.next_id;
			entries.next_id += 1;
			entries.items.push((id, item));
			id
		};

		let weak = Arc::downgrade(&self.entries);
		RemoveHandle::new(move || {
			if let Some(entries) = weak.upgrade() {
				entries.lock().items.retain(|(entry_id, _)| *entry_id != id);
			}
		})
	}

	/// Snapshot of the registered items in registration order.
	///
	/// Callers iterate the snapshot, so callbacks may register or remove
	/// entries while running.
	pub fn list(&self) -> Vec<T> {
		self.entries
			.lock()
			.items
			.iter()
			.map(|(_, item)| item.clone())
			.collect()
	}

	/// Removes every entry.
	pub fn reset(&self) {
		self.entries.lock().items.clear();
	}

	/// Number of registered entries.
	pub fn len(&self) -> usize {
		self.entries.lock().items.len()
	}

	/// Returns `true` when nothing is registered.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<T: Clone + Send + 'static> Default for CallbackList<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Clone for CallbackList<T> {
	fn clone(&self) -> Self {
		Self {
			entries: Arc::clone(&self.entries),
		}
	}
}

impl<T> fmt::Debug for CallbackList<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CallbackList")
			.field("len", &self.entries.lock().items.len())
			.finish()
	}
}

/// Removes a registration when [`remove`](Self::remove) is called.
///
/// Dropping the handle keeps the registration in place.
pub struct RemoveHandle {
	remover: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl RemoveHandle {
	/// Wraps a removal closure.
	pub fn new(remover: impl FnOnce() + Send + Sync + 'static) -> Self {
		Self {
			remover: Some(Box::new(remover)),
		}
	}

	/// A handle that removes nothing.
	pub fn noop() -> Self {
		Self { remover: None }
	}

	/// Removes the registration.
	pub fn remove(mut self) {
		if let Some(remover) = self.remover.take() {
			remover();
		}
	}
}

impl fmt::Debug for RemoveHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RemoveHandle")
			.field("active", &self.remover.is_some())
			.finish()
	}
}
