#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bkbs_admin::{ServerConfig, create_app, db::Database};
use std::time::Duration;
use tower::ServiceExt;

pub struct TestContext {
    pub router: Router,
    pub db: Database,
}

pub async fn setup() -> TestContext {
    TestSetup::new().build().await
}

/// Builder for test setup with various options.
pub struct TestSetup {
    access_expire: Duration,
    refresh_expire: Duration,
    secure_cookies: bool,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            access_expire: Duration::from_secs(15 * 60),
            refresh_expire: Duration::from_secs(7 * 24 * 60 * 60),
            secure_cookies: false,
        }
    }

    pub fn with_access_expire(mut self, access_expire: Duration) -> Self {
        self.access_expire = access_expire;
        self
    }

    pub fn with_secure_cookies(mut self, secure_cookies: bool) -> Self {
        self.secure_cookies = secure_cookies;
        self
    }

    pub async fn build(self) -> TestContext {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");

        let config = ServerConfig {
            db: db.clone(),
            access_secret: b"test-access-secret-for-testing-only".to_vec(),
            refresh_secret: b"test-refresh-secret-for-testing-only".to_vec(),
            access_expire: self.access_expire,
            refresh_expire: self.refresh_expire,
            // Minimum bcrypt cost keeps the test suite fast.
            bcrypt_cost: 4,
            secure_cookies: self.secure_cookies,
        };

        TestContext {
            router: create_app(&config),
            db,
        }
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: serde_json::Value,
}

impl TestResponse {
    /// All Set-Cookie header values.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// The refresh-token Set-Cookie value, if any.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.set_cookies()
            .into_iter()
            .find(|c| c.starts_with("refresh_token="))
    }

    pub fn str(&self, key: &str) -> String {
        self.body[key]
            .as_str()
            .unwrap_or_else(|| panic!("missing string field `{}` in {}", key, self.body))
            .to_string()
    }
}

impl TestContext {
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<serde_json::Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .expect("Failed to build request"),
            None => builder.body(Body::empty()).expect("Failed to build request"),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Request failed");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(&bytes).into()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> TestResponse {
        self.request("POST", path, Some(body), &[]).await
    }

    pub async fn get(&self, path: &str, headers: &[(&str, &str)]) -> TestResponse {
        self.request("GET", path, None, headers).await
    }

    /// Register an account; panics unless it succeeds.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> TestResponse {
        self.register_with_role(name, email, password, "user").await
    }

    pub async fn register_with_role(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> TestResponse {
        let response = self
            .post(
                "/api/auth/register",
                serde_json::json!({
                    "name": name,
                    "role": role,
                    "email": email,
                    "password": password,
                }),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "registration failed: {}",
            response.body
        );
        response
    }

    pub async fn login(&self, identifier: &str, password: &str) -> TestResponse {
        self.post(
            "/api/auth/login",
            serde_json::json!({ "email": identifier, "password": password }),
        )
        .await
    }

    /// Soft-delete the account with the given UUID directly in the store.
    pub async fn soft_delete(&self, uuid: &str) {
        let account = self
            .db
            .accounts()
            .find_by_uuid(uuid)
            .await
            .unwrap()
            .expect("account not found");
        self.db.accounts().soft_delete(account.id).await.unwrap();
    }
}
