//! Shared harness for gateway integration tests backed by `httpmock`.

#![allow(dead_code)]

// std
use std::sync::Arc;
// crates.io
use httpmock::MockServer;
// self
use bearer_gateway::{
	config::{GatewayConfig, GatewayConfigBuilder},
	gateway::{Gateway, GatewayContext},
	router::{NavigationTarget, RouteAccess, Router},
	session::SessionState,
	store::{ClientStore, MemoryStore, StoreKey},
	url::Url,
};

/// Everything one integration test needs: the mock API, the gateway, and its collaborators.
pub struct Harness {
	pub server: MockServer,
	pub gateway: Gateway,
	pub store: Arc<MemoryStore>,
	pub router: Arc<Router>,
}
impl Harness {
	/// Full URL path of an API endpoint on the mock server.
	pub fn api_path(path: &str) -> String {
		format!("/api/v1{path}")
	}
}

/// Starts a mock API and wires a gateway against it.
///
/// With `credential` set the store is seeded as a signed-in client and the router starts
/// on `/dashboard?tab=stats`; otherwise it starts on `/`.
pub async fn harness(credential: Option<&str>) -> Harness {
	harness_with(credential, |builder| builder).await
}

/// Like [`harness`], with a hook to adjust the gateway configuration.
pub async fn harness_with(
	credential: Option<&str>,
	configure: impl FnOnce(GatewayConfigBuilder) -> GatewayConfigBuilder,
) -> Harness {
	let server = MockServer::start_async().await;
	let store = Arc::new(MemoryStore::default());

	if let Some(credential) = credential {
		store.set(StoreKey::AccessToken, credential.into()).await.expect("Seeding should succeed.");
		store
			.set(StoreKey::User, "{\"id\":1,\"name\":\"Ada\",\"email\":\"ada@example.com\"}".into())
			.await
			.expect("Seeding should succeed.");
	}

	let session =
		Arc::new(SessionState::restore(store.clone()).await.expect("Session should restore."));
	let initial = match credential {
		Some(_) => NavigationTarget::new("/dashboard").with_query("tab", "stats"),
		None => NavigationTarget::new("/"),
	};
	let router = Arc::new(
		Router::builder(session.clone())
			.route("/", "home", RouteAccess::Public)
			.route("/login", "login", RouteAccess::Guest)
			.route("/register", "register", RouteAccess::Guest)
			.route("/dashboard", "dashboard", RouteAccess::Authenticated)
			.route("/leaderboard", "leaderboard", RouteAccess::Public)
			.initial(initial)
			.build()
			.expect("Router should build."),
	);
	let base_url = Url::parse(&server.url("/api/v1")).expect("Mock base URL should parse.");
	let config = configure(GatewayConfig::builder(base_url)).build().expect("Config should build.");
	let context = GatewayContext::new(session).with_navigator(router.clone());
	let gateway = Gateway::new(config, context).expect("Gateway should build.");

	Harness { server, gateway, store, router }
}
