//! Scroll restoration.
//!
//! The router never scrolls by itself. When a [`ScrollBehavior`] is
//! configured, it remembers the position of pages left through history
//! traversal and asks the behavior where to scroll after every navigation.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use waypost_core::{RouteLocation, StateData};
use waypost_history::ScrollPosition;

/// Decides and applies scroll positions after navigations.
#[async_trait]
pub trait ScrollBehavior: Send + Sync {
	/// Current scroll offset of the page.
	fn current_position(&self) -> ScrollPosition;

	/// Position to scroll to after navigating from `from` to `to`.
	///
	/// `saved` is the position the page had when it was last left through
	/// history traversal, if known. Returning `None` leaves the scroll
	/// position untouched.
	async fn resolve(
		&self,
		to: &RouteLocation,
		from: &RouteLocation,
		saved: Option<ScrollPosition>,
	) -> anyhow::Result<Option<ScrollPosition>>;

	/// Scrolls the page.
	fn scroll_to(&self, position: ScrollPosition);
}

/// Positions saved while leaving pages through history traversal.
#[derive(Debug, Default)]
pub(crate) struct SavedPositions {
	positions: Mutex<HashMap<String, ScrollPosition>>,
}

impl SavedPositions {
	pub(crate) fn save(&self, key: String, position: ScrollPosition) {
		self.positions.lock().insert(key, position);
	}

	/// Returns and forgets the position saved under `key`.
	pub(crate) fn take(&self, key: &str) -> Option<ScrollPosition> {
		self.positions.lock().remove(key)
	}
}

/// Key of the entry `delta` steps away from the current one, for `path`.
pub(crate) fn scroll_key(state: &StateData, path: &str, delta: i64) -> String {
	let position = state
		.get("position")
		.and_then(|value| value.as_i64())
		.map_or(-1, |position| position - delta);
	format!("{position}{path}")
}

/// Scroll position stored in a history entry.
pub(crate) fn state_scroll(state: &StateData) -> Option<ScrollPosition> {
	state
		.get("scroll")
		.filter(|value| !value.is_null())
		.and_then(|value| serde_json::from_value(value.clone()).ok())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn state(position: Option<i64>) -> StateData {
		let mut state = StateData::new();
		if let Some(position) = position {
			state.insert("position".into(), position.into());
		}
		state
	}

	#[rstest]
	#[case(Some(3), 0, "3/a")]
	#[case(Some(3), -1, "4/a")]
	#[case(None, -1, "-1/a")]
	fn test_scroll_key(#[case] position: Option<i64>, #[case] delta: i64, #[case] expected: &str) {
		assert_eq!(scroll_key(&state(position), "/a", delta), expected);
	}

	#[rstest]
	fn test_saved_positions_are_taken_once() {
		let saved = SavedPositions::default();
		saved.save("1/a".into(), ScrollPosition::new(0.0, 10.0));

		assert_eq!(saved.take("1/a"), Some(ScrollPosition::new(0.0, 10.0)));
		assert_eq!(saved.take("1/a"), None);
	}

	#[rstest]
	fn test_state_scroll() {
		let mut data = StateData::new();
		data.insert("scroll".into(), serde_json::json!({ "left": 1.0, "top": 2.0 }));
		assert_eq!(state_scroll(&data), Some(ScrollPosition::new(1.0, 2.0)));

		data.insert("scroll".into(), serde_json::Value::Null);
		assert_eq!(state_scroll(&data), None);
	}
}
