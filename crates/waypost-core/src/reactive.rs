//! A thread-safe observable value.
//!
//! The router exposes its current route through a [`Signal`] so that views
//! can subscribe to changes instead of polling.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::callbacks::{CallbackList, RemoveHandle};

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A value that notifies subscribers whenever it is set.
pub struct Signal<T> {
	value: Arc<RwLock<T>>,
	subscribers: CallbackList<Subscriber<T>>,
}

impl<T: Clone + Send + Sync + 'static> Signal<T> {
	/// Creates a signal holding `value`.
	pub fn new(value: T) -> Self {
		Self {
			value: Arc::new(RwLock::new(value)),
			subscribers: CallbackList::new(),
		}
	}

	/// Clones the current value.
	pub fn get(&self) -> T {
		self.value.read().clone()
	}

	/// Runs `f` with a reference to the current value.
	pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
		f(&self.value.read())
	}

	/// Replaces the value and notifies subscribers.
	///
	/// Subscribers run after the lock is released and may read the signal.
	pub fn set(&self, value: T) {
		*self.value.write() = value.clone();
		for subscriber in self.subscribers.list() {
			subscriber(&value);
		}
	}

	/// Calls `f` with every new value.
	pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> RemoveHandle {
		self.subscribers.add(Arc::new(f))
	}
}

impl<T> Clone for Signal<T> {
	fn clone(&self) -> Self {
		Self {
			value: Arc::clone(&self.value),
			subscribers: self.subscribers.clone(),
		}
	}
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Signal")
			.field("value", &*self.value.read())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::sync::atomic::{AtomicUsize, Ordering};

	#[rstest]
	fn test_signal_get_set() {
		let signal = Signal::new(1);
		signal.set(2);
		assert_eq!(signal.get(), 2);
		assert_eq!(signal.with(|v| v * 10), 20);
	}

	#[rstest]
	fn test_signal_notifies_until_removed() {
		// Arrange
		let signal = Signal::new(String::from("/"));
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = Arc::clone(&calls);
		let handle = signal.subscribe(move |_| {
			counter.fetch_add(1, Ordering::SeqCst);
		});

		// Act
		signal.set("/a".into());
		handle.remove();
		signal.set("/b".into());

		// Assert
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[rstest]
	fn test_subscriber_can_read_signal() {
		let signal = Signal::new(0);
		let reader = signal.clone();
		let seen = Arc::new(AtomicUsize::new(0));
		let seen_clone = Arc::clone(&seen);
		signal.subscribe(move |_| {
			seen_clone.store(reader.get(), Ordering::SeqCst);
		});

		signal.set(7);

		assert_eq!(seen.load(Ordering::SeqCst), 7);
	}
}
