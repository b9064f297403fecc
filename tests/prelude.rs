//! The facade exposes everything needed to build and drive a router.

use std::sync::Arc;

use rstest::rstest;
use waypost::prelude::*;

struct Shell {
	router: Option<Router>,
}

impl RouterApp for Shell {
	fn provide(&mut self, router: Router) {
		self.router = Some(router);
	}
}

#[rstest]
#[tokio::test]
async fn test_router_from_settings_and_prelude() {
	// Arrange
	let settings = RouterSettings::from_json(r#"{ "strict": true, "max_redirects": 2 }"#).unwrap();
	let history = MemoryHistory::new("/");
	history.replace("/docs/guide/", None);
	let router = Router::new(
		RouterOptions::new(history)
			.settings(settings)
			.route(RouteRecordRaw::new("/").name("home"))
			.route(RouteRecordRaw::new("/docs/{page:*}").name("docs"))
			.route(RouteRecordRaw::new("/{path:*}").name("not-found")),
	)
	.unwrap();
	let mut shell = Shell { router: None };

	// Act
	router.install(&mut shell).await;

	// Assert
	let current = router.current_route();
	assert!(shell.router.is_some());
	assert_eq!(current.name.as_deref(), Some("docs"));
	assert_eq!(current.param("page"), Some("guide/"));
	assert!(router.is_ready().await.is_ok());
}

#[rstest]
#[tokio::test]
async fn test_catch_all_route_handles_unknown_paths() {
	let router = Router::new(
		RouterOptions::with_history(Arc::new(MemoryHistory::new("/")))
			.route(RouteRecordRaw::new("/").name("home"))
			.route(RouteRecordRaw::new("/{path:*}").name("not-found")),
	)
	.unwrap();

	let failure = router.push("/some/where").await.unwrap();

	assert!(failure.is_none());
	assert_eq!(router.current_route().name.as_deref(), Some("not-found"));
	assert_eq!(router.current_route().param("path"), Some("some/where"));
}
