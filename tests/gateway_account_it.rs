mod common;

// crates.io
use httpmock::prelude::*;
// self
use bearer_gateway::{gateway::FormOutcome, store::StoreKey};
use common::{Harness, harness};

#[tokio::test]
async fn login_persists_credential_and_sends_it_on_profile_fetch() {
	let Harness { server, gateway, store, .. } = harness(None).await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(Harness::api_path("/auth/login"))
				.json_body(serde_json::json!({ "email": "ada@example.com", "password": "hunter2" }));
			then.status(200).header("content-type", "application/json").body("{\"token\":\"T1\"}");
		})
		.await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/profile/me")).header("authorization", "Bearer T1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":1,\"name\":\"Ada\",\"email\":\"ada@example.com\"}");
		})
		.await;
	let outcome =
		gateway.login("ada@example.com", "hunter2").await.expect("Login should succeed.");
	let FormOutcome::Accepted(Some(user)) = outcome else {
		panic!("Login should load the profile, got {outcome:?}.");
	};

	assert_eq!(user.email, "ada@example.com");
	assert_eq!(store.peek(StoreKey::AccessToken).as_deref(), Some("T1"));
	assert!(gateway.session.is_authenticated());
	assert_eq!(gateway.session.user(), Some(user));

	login.assert_async().await;
	profile.assert_async().await;
}

#[tokio::test]
async fn rejected_login_exposes_field_errors_without_storing_a_credential() {
	let Harness { server, gateway, store, .. } = harness(None).await;
	let login = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/login"));
			then.status(422)
				.header("content-type", "application/json")
				.body("{\"message\":\"Invalid.\",\"errors\":{\"email\":[\"The email field is required.\"]}}");
		})
		.await;
	let outcome = gateway.login("", "hunter2").await.expect("A 422 should not be an error.");

	assert_eq!(
		outcome.errors().and_then(|errors| errors.first("email")),
		Some("The email field is required.")
	);
	assert_eq!(gateway.session.errors().first("email"), Some("The email field is required."));
	assert!(!store.contains(StoreKey::AccessToken));
	assert!(!gateway.session.is_authenticated());

	login.assert_async().await;
}

#[tokio::test]
async fn logout_is_idempotent() {
	let Harness { server, gateway, store, .. } = harness(Some("T1")).await;
	let logout = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/logout"));
			then.status(204);
		})
		.await;

	gateway.logout().await.expect("First logout should succeed.");
	gateway.logout().await.expect("Second logout should succeed.");

	assert!(!store.contains(StoreKey::AccessToken));
	assert!(!store.contains(StoreKey::User));
	assert!(!gateway.session.is_authenticated());
	assert_eq!(gateway.session.user(), None);

	logout.assert_calls_async(2).await;
}

#[tokio::test]
async fn restore_reloads_the_profile_for_a_stored_credential() {
	let Harness { server, gateway, .. } = harness(Some("T1")).await;
	let profile = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/profile/me")).header("authorization", "Bearer T1");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"id\":1,\"name\":\"Ada Lovelace\",\"email\":\"ada@example.com\",\"rank\":3}");
		})
		.await;
	let user = gateway
		.restore()
		.await
		.expect("Restore should succeed.")
		.expect("A signed-in session should reload its profile.");

	assert_eq!(user.name, "Ada Lovelace");
	assert_eq!(user.extra.get("rank"), Some(&serde_json::Value::from(3)));
	assert_eq!(gateway.session.user().map(|user| user.name), Some("Ada Lovelace".into()));

	profile.assert_async().await;
}
