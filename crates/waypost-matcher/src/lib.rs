//! Route matching for waypost.
//!
//! Route paths use a brace syntax:
//!
//! ```
//! use waypost_core::{RouteParams, RouteRecordRaw};
//! use waypost_matcher::{CurrentLocation, MatcherLocation, PathParserOptions, RouterMatcher};
//!
//! let matcher = RouterMatcher::with_routes(
//! 	[
//! 		RouteRecordRaw::new("/users/{id:\\d+}").name("user"),
//! 		RouteRecordRaw::new("/{path:*}").name("not-found"),
//! 	],
//! 	PathParserOptions::default(),
//! )
//! .unwrap();
//!
//! let empty = RouteParams::new();
//! let current = CurrentLocation { name: None, path: "/", params: &empty };
//! let resolved = matcher
//! 	.resolve(&MatcherLocation::Path("/users/42".into()), current)
//! 	.unwrap();
//! assert_eq!(resolved.name.as_deref(), Some("user"));
//! ```

pub mod matcher;
pub mod parser;
pub mod tokenizer;

pub use matcher::{
	CurrentLocation, MatchedRoute, MatcherLocation, RouteRecordMatcher, RouterMatcher,
};
pub use parser::{ParamKey, PathParser, PathParserOptions, compare_path_parser_score};
pub use tokenizer::{ParamToken, Segment, Token, tokenize_path};
