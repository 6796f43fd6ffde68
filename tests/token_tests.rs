//! Refresh, logout, and revocation behavior through the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::{TestSetup, setup};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn test_refresh_with_body_token() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;

    let response = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": registered.str("refreshToken") }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let access_token = response.str("accessToken");

    // The new access token works.
    let me = ctx
        .get(
            "/api/auth/me",
            &[("authorization", &format!("Bearer {}", access_token))],
        )
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["email"], "a@x.com");
}

#[tokio::test]
async fn test_refresh_with_cookie_token() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;

    let response = ctx
        .request(
            "POST",
            "/api/auth/refresh-token",
            None,
            &[(
                "cookie",
                &format!("refresh_token={}", registered.str("refreshToken")),
            )],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(!response.str("accessToken").is_empty());
}

#[tokio::test]
async fn test_refresh_body_takes_precedence_over_cookie() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;

    // Valid body token + garbage cookie: body wins, so this succeeds.
    let response = ctx
        .request(
            "POST",
            "/api/auth/refresh-token",
            Some(json!({ "refreshToken": registered.str("refreshToken") })),
            &[("cookie", "refresh_token=garbage")],
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_without_token() {
    let ctx = setup().await;

    let response = ctx.request("POST", "/api/auth/refresh-token", None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Refresh token is required");
}

#[tokio::test]
async fn test_refresh_with_access_token_rejected() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;

    // An access token is signed with the other context's secret.
    let response = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": registered.str("accessToken") }),
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid or expired refresh token");
}

#[tokio::test]
async fn test_logout_then_refresh_fails() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;
    let access_token = registered.str("accessToken");
    let refresh_token = registered.str("refreshToken");

    // Refresh works before logout.
    let before = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": refresh_token }),
        )
        .await;
    assert_eq!(before.status, StatusCode::OK);

    let logout = ctx
        .request(
            "POST",
            "/api/auth/logout",
            Some(json!({ "refreshToken": refresh_token })),
            &[("authorization", &format!("Bearer {}", access_token))],
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    // The cookie is cleared.
    let cookie = logout.refresh_cookie().expect("clear cookie not set");
    assert!(cookie.contains("Max-Age=0"));

    // The token's signature is still valid and unexpired, yet refresh fails.
    let after = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": refresh_token }),
        )
        .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        after.body["message"],
        "Refresh token not found or has been revoked"
    );
}

#[tokio::test]
async fn test_logout_reads_cookie_when_body_empty() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;
    let refresh_token = registered.str("refreshToken");

    let logout = ctx
        .request(
            "POST",
            "/api/auth/logout",
            None,
            &[
                (
                    "authorization",
                    &format!("Bearer {}", registered.str("accessToken")),
                ),
                ("cookie", &format!("refresh_token={}", refresh_token)),
            ],
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);

    let after = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": refresh_token }),
        )
        .await;
    assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_without_any_token_is_ok() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;

    // No refresh token anywhere: idempotent no-op, still 200.
    let logout = ctx
        .request(
            "POST",
            "/api/auth/logout",
            None,
            &[(
                "authorization",
                &format!("Bearer {}", registered.str("accessToken")),
            )],
        )
        .await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(logout.body["success"], true);
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let ctx = setup().await;

    let response = ctx.request("POST", "/api/auth/logout", None, &[]).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_all_revokes_every_device() {
    let ctx = setup().await;

    // Device A registers, device B logs in with its own metadata.
    let device_a = ctx.register("Alice", "a@x.com", "secret1").await;
    let device_b = ctx
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "a@x.com", "password": "secret1" })),
            &[("user-agent", "device-b/2.0"), ("x-forwarded-for", "10.0.0.2")],
        )
        .await;
    assert_eq!(device_b.status, StatusCode::OK);

    // An unrelated account keeps its session.
    let other = ctx.register("Bob", "b@x.com", "secret1").await;

    let logout_all = ctx
        .request(
            "POST",
            "/api/auth/logout-all",
            None,
            &[(
                "authorization",
                &format!("Bearer {}", device_a.str("accessToken")),
            )],
        )
        .await;
    assert_eq!(logout_all.status, StatusCode::OK);
    assert_eq!(logout_all.body["revoked"], 2);
    assert!(logout_all.refresh_cookie().unwrap().contains("Max-Age=0"));

    for token in [device_a.str("refreshToken"), device_b.str("refreshToken")] {
        let refresh = ctx
            .post("/api/auth/refresh-token", json!({ "refreshToken": token }))
            .await;
        assert_eq!(refresh.status, StatusCode::UNAUTHORIZED);
    }

    let unaffected = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": other.str("refreshToken") }),
        )
        .await;
    assert_eq!(unaffected.status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_for_soft_deleted_account() {
    let ctx = setup().await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;
    ctx.soft_delete(registered.body["user"]["uuid"].as_str().unwrap())
        .await;

    let response = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": registered.str("refreshToken") }),
        )
        .await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
    assert_eq!(response.body["message"], "Account has been deleted");
}

#[tokio::test]
async fn test_expired_access_token_rejected() {
    let ctx = TestSetup::new()
        .with_access_expire(Duration::from_secs(1))
        .build()
        .await;

    let registered = ctx.register("Alice", "a@x.com", "secret1").await;
    let access_token = registered.str("accessToken");

    tokio::time::sleep(Duration::from_secs(2)).await;

    let response = ctx
        .get(
            "/api/auth/me",
            &[("authorization", &format!("Bearer {}", access_token))],
        )
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["message"], "Invalid or expired token");

    // The refresh token is unaffected by access-token expiry.
    let refresh = ctx
        .post(
            "/api/auth/refresh-token",
            json!({ "refreshToken": registered.str("refreshToken") }),
        )
        .await;
    assert_eq!(refresh.status, StatusCode::OK);
}

#[tokio::test]
async fn test_session_metadata_stored_per_device() {
    let ctx = setup().await;

    ctx.register("Alice", "a@x.com", "secret1").await;
    let login = ctx
        .request(
            "POST",
            "/api/auth/login",
            Some(json!({ "email": "a@x.com", "password": "secret1" })),
            &[("user-agent", "device-b/2.0"), ("x-forwarded-for", "10.0.0.2")],
        )
        .await;
    assert_eq!(login.status, StatusCode::OK);

    let record = ctx
        .db
        .refresh_tokens()
        .find_by_token(&login.str("refreshToken"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.user_agent.as_deref(), Some("device-b/2.0"));
    assert_eq!(record.ip_address.as_deref(), Some("10.0.0.2"));
}
