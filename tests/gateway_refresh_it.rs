mod common;

// std
use std::time::Duration;
// crates.io
use httpmock::prelude::*;
// self
use bearer_gateway::{
	config::AuthFailurePolicy,
	error::{Error, TransportError},
	http::ApiRequest,
	router::{NavigationTarget, Navigator},
	store::StoreKey,
};
use common::{Harness, harness, harness_with};

#[tokio::test]
async fn expired_credential_is_refreshed_and_request_reissued() -> color_eyre::Result<()> {
	let Harness { server, gateway, store, .. } = harness(Some("T1")).await;
	let rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/leaderboard")).header("authorization", "Bearer T1");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Token has expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(200).header("content-type", "application/json").body("{\"token\":\"T2\"}");
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/leaderboard")).header("authorization", "Bearer T2");
			then.status(200).header("content-type", "application/json").body("[{\"rank\":1}]");
		})
		.await;
	let response = gateway.send(ApiRequest::get("/leaderboard")).await?;
	let body: serde_json::Value = response.json()?;

	assert_eq!(body[0]["rank"], 1);
	assert_eq!(store.peek(StoreKey::AccessToken).as_deref(), Some("T2"));
	assert!(gateway.session.is_authenticated());

	rejected.assert_calls_async(1).await;
	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(1).await;

	Ok(())
}

#[tokio::test]
async fn concurrent_expiry_triggers_a_single_refresh() {
	let Harness { server, gateway, .. } = harness(Some("T1")).await;
	let _rejected = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer T1");
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Token has expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token\":\"T2\"}")
				.delay(Duration::from_millis(300));
		})
		.await;
	let accepted = server
		.mock_async(|when, then| {
			when.method(GET).header("authorization", "Bearer T2");
			then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
		})
		.await;
	let (a, b, c) = tokio::join!(
		gateway.send(ApiRequest::get("/posts/1")),
		gateway.send(ApiRequest::get("/posts/2")),
		gateway.send(ApiRequest::get("/posts/3")),
	);

	for result in [a, b, c] {
		assert_eq!(result.expect("Every caller should recover.").status, 200);
	}

	refresh.assert_calls_async(1).await;
	accepted.assert_calls_async(3).await;

	assert_eq!(gateway.refresh_metrics.attempts(), 1);
	assert_eq!(gateway.refresh_metrics.queued(), 2);
	assert!(!gateway.is_refreshing());
}

#[tokio::test]
async fn failed_refresh_signs_out_and_redirects_to_login() {
	let Harness { server, gateway, store, router } = harness(Some("T1")).await;
	let _rejected = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/profile/me"));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Token has expired\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Unauthenticated.\"}");
		})
		.await;
	let err = gateway
		.send(ApiRequest::get("/profile/me"))
		.await
		.expect_err("An unrecoverable refresh should fail the request.");

	assert!(matches!(err, Error::RefreshFailure { .. }), "Unexpected error: {err:?}.");
	assert!(!store.contains(StoreKey::AccessToken));
	assert!(!store.contains(StoreKey::User));
	assert!(!gateway.session.is_authenticated());
	assert_eq!(gateway.session.user(), None);
	assert_eq!(
		router.current(),
		NavigationTarget::new("/login").with_query("redirect", "/dashboard?tab=stats")
	);
	assert_eq!(router.post_login_target(), NavigationTarget::parse("/dashboard?tab=stats"));

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn non_auth_errors_pass_through_without_refresh() {
	let Harness { server, gateway, store, .. } = harness(Some("T1")).await;
	let failing = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/leaderboard"));
			then.status(503).body("Service Unavailable");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(200).header("content-type", "application/json").body("{\"token\":\"T2\"}");
		})
		.await;
	let err = gateway
		.send(ApiRequest::get("/leaderboard"))
		.await
		.expect_err("A 503 should reach the caller.");

	assert!(matches!(err, Error::Server { status: 503, .. }), "Unexpected error: {err:?}.");
	assert_eq!(store.peek(StoreKey::AccessToken).as_deref(), Some("T1"));

	failing.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

#[tokio::test]
async fn policy_message_limits_which_401s_refresh() {
	let Harness { server, gateway, .. } =
		harness_with(Some("T1"), |builder| {
			builder.auth_failure(AuthFailurePolicy::default().with_message("Token has expired"))
		})
		.await;
	let forbidden = server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/admin"));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Invalid signature\"}");
		})
		.await;
	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(200).header("content-type", "application/json").body("{\"token\":\"T2\"}");
		})
		.await;
	let err =
		gateway.send(ApiRequest::get("/admin")).await.expect_err("The 401 should reach the caller.");

	assert!(matches!(err, Error::Server { status: 401, .. }), "Unexpected error: {err:?}.");

	forbidden.assert_calls_async(1).await;
	refresh.assert_calls_async(0).await;
}

async fn mock_expired_leaderboard(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path(Harness::api_path("/leaderboard"));
			then.status(401)
				.header("content-type", "application/json")
				.body("{\"message\":\"Token has expired\"}");
		})
		.await
}

fn assert_signed_out_and_redirected(harness: &Harness) {
	assert!(!harness.store.contains(StoreKey::AccessToken));
	assert!(!harness.store.contains(StoreKey::User));
	assert!(!harness.gateway.session.is_authenticated());
	assert_eq!(
		harness.router.current(),
		NavigationTarget::new("/login").with_query("redirect", "/dashboard?tab=stats")
	);
}

#[tokio::test]
async fn malformed_refresh_body_signs_out_and_redirects() {
	let harness = harness(Some("T1")).await;
	let _rejected = mock_expired_leaderboard(&harness.server).await;
	let refresh = harness
		.server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(200).header("content-type", "application/json").body("{\"access\":\"T2\"}");
		})
		.await;
	let err = harness
		.gateway
		.send(ApiRequest::get("/leaderboard"))
		.await
		.expect_err("A refresh body without a token should fail the request.");
	let Error::RefreshFailure { source } = &err else {
		panic!("Unexpected error: {err:?}.");
	};

	assert!(matches!(**source, Error::Decode { status: 200, .. }), "Unexpected source: {source:?}.");
	assert_signed_out_and_redirected(&harness);

	refresh.assert_calls_async(1).await;
}

#[tokio::test]
async fn refresh_timeout_signs_out_and_redirects() {
	let harness =
		harness_with(Some("T1"), |builder| builder.refresh_timeout(Duration::from_millis(200))).await;
	let _rejected = mock_expired_leaderboard(&harness.server).await;
	let refresh = harness
		.server
		.mock_async(|when, then| {
			when.method(POST).path(Harness::api_path("/auth/refresh-token"));
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"token\":\"T2\"}")
				.delay(Duration::from_secs(2));
		})
		.await;
	let err = harness
		.gateway
		.send(ApiRequest::get("/leaderboard"))
		.await
		.expect_err("A refresh exceeding its timeout should fail the request.");
	let Error::RefreshFailure { source } = &err else {
		panic!("Unexpected error: {err:?}.");
	};

	assert!(
		matches!(**source, Error::Transport(TransportError::Timeout { .. })),
		"Unexpected source: {source:?}."
	);
	assert_signed_out_and_redirected(&harness);

	refresh.assert_calls_async(1).await;
}
