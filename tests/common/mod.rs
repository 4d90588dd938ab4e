// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use bloggy::config::Config;
use bloggy::db::{FirestoreDb, MemoryDb, Stores, UserStore};
use bloggy::error::AppError;
use bloggy::models::{Role, User};
use bloggy::routes::create_router;
use bloggy::services::{GoogleUserInfo, IdentityProvider, MemorySessionStore};
use bloggy::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Unique suffix for test isolation.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Identity provider that answers from a canned profile.
///
/// Authorization code "bad" fails the exchange.
pub struct FakeProvider {
    pub profile: Mutex<GoogleUserInfo>,
    pub exchanges: AtomicUsize,
}

impl FakeProvider {
    pub fn new(profile: GoogleUserInfo) -> Self {
        Self {
            profile: Mutex::new(profile),
            exchanges: AtomicUsize::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://accounts.test/auth?client_id=test_client_id&state={state}")
    }

    async fn exchange_code(&self, code: &str) -> Result<String, AppError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if code == "bad" {
            return Err(AppError::Provider("invalid_grant".to_string()));
        }
        Ok(format!("provider-token-{code}"))
    }

    async fn fetch_user_info(&self, _access_token: &str) -> Result<GoogleUserInfo, AppError> {
        Ok(self.profile.lock().unwrap().clone())
    }
}

pub fn google_profile(id: &str, email: &str) -> GoogleUserInfo {
    GoogleUserInfo {
        id: id.to_string(),
        email: email.to_string(),
        verified_email: true,
        name: format!("User {id}"),
        given_name: "User".to_string(),
        family_name: id.to_string(),
        picture: format!("https://img.test/{id}.png"),
        locale: "en".to_string(),
    }
}

/// Everything a route test needs to poke at.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: Arc<MemoryDb>,
    pub provider: Arc<FakeProvider>,
}

/// Create a test app backed by the in-memory store.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with_stores(None)
}

/// Like `create_test_app`, optionally overriding some ports.
#[allow(dead_code)]
pub fn create_test_app_with_stores(customize: Option<&dyn Fn(&mut Stores)>) -> TestApp {
    let db = Arc::new(MemoryDb::new());
    let mut stores = Stores::from_shared(db.clone());
    if let Some(customize) = customize {
        customize(&mut stores);
    }

    let provider = Arc::new(FakeProvider::new(google_profile(
        "reader-1",
        "reader@example.com",
    )));
    let state = Arc::new(AppState::new(
        Config::test_default(),
        stores,
        provider.clone(),
        Arc::new(MemorySessionStore::new()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        provider,
    }
}

/// Store a user directly.
#[allow(dead_code)]
pub async fn seed_user(app: &TestApp, id: &str, email: &str, role: Role) -> User {
    let now = chrono::Utc::now();
    let user = User {
        id: id.to_string(),
        name: format!("User {id}"),
        email: email.to_string(),
        is_verified: true,
        role,
        picture: String::new(),
        created_at: now,
        updated_at: now,
    };
    app.db.create_user(&user).await.unwrap();
    user
}

/// Issue and persist a token for `user_id`, as login does.
#[allow(dead_code)]
pub async fn login_token(app: &TestApp, user_id: &str) -> String {
    let details = app.state.tokens.generate_token(user_id).unwrap();
    app.state.tokens.save_token(user_id, &details).await.unwrap();
    details.access_token
}

#[allow(dead_code)]
pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Build a JSON request with an optional Authorization header.
#[allow(dead_code)]
pub fn json_request(
    method: &str,
    uri: &str,
    auth: Option<&str>,
    body: serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Build a bodiless request with an optional Authorization header.
#[allow(dead_code)]
pub fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
