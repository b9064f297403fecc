//! Query string parsing and serialization.

use crate::encoding::{decode, encode_query_key, encode_query_value};
use crate::location::{LocationQuery, QueryValue};

/// Parses a search string (with or without the leading `?`).
///
/// `+` is read as a space, keys and values are percent-decoded, a key
/// without `=` maps to `None` and repeated keys collect into a list.
pub fn parse_query(search: &str) -> LocationQuery {
	let mut query = LocationQuery::new();
	let search = search.strip_prefix('?').unwrap_or(search);
	if search.is_empty() {
		return query;
	}

	for param in search.split('&') {
		let param = param.replace('+', " ");
		let (key, value) = match param.split_once('=') {
			Some((key, value)) => (decode(key), Some(decode(value))),
			None => (decode(&param), None),
		};

		match query.get_mut(&key) {
			Some(QueryValue::List(values)) => values.push(value),
			Some(existing) => {
				if let QueryValue::Single(first) = existing {
					*existing = QueryValue::List(vec![first.take(), value]);
				}
			}
			None => {
				query.insert(key, QueryValue::Single(value));
			}
		}
	}
	query
}

/// Serializes a query without the leading `?`.
///
/// `None` values write the bare key; lists repeat the key once per value.
pub fn stringify_query(query: &LocationQuery) -> String {
	let mut parts = Vec::new();
	for (key, value) in query {
		let key = encode_query_key(key);
		let values: &[Option<String>] = match value {
			QueryValue::Single(value) => std::slice::from_ref(value),
			QueryValue::List(values) => values,
		};
		for value in values {
			match value {
				Some(value) => parts.push(format!("{}={}", key, encode_query_value(value))),
				None => parts.push(key.clone()),
			}
		}
	}
	parts.join("&")
}
