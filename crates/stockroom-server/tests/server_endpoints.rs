use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use stockroom_auth::{JwtService, Role};
use stockroom_server::cache::{CacheError, CacheStore, CacheTtls, DynCacheStore};
use stockroom_server::{AppConfig, AppState, CacheBackend, EntityCache, build_app};
use tokio::task::JoinHandle;

struct TestServer {
    base: String,
    jwt: Arc<JwtService>,
    shutdown: tokio::sync::oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl TestServer {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn token(&self, role: Role) -> String {
        self.jwt
            .issue(&uuid::Uuid::new_v4().to_string(), role)
            .expect("issue token")
    }

    async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
    }
}

async fn start_server() -> TestServer {
    start_server_with(Arc::new(CacheBackend::new_local())).await
}

async fn start_server_with(cache_store: DynCacheStore) -> TestServer {
    let cfg = AppConfig::default();
    let jwt = Arc::new(
        JwtService::new(b"integration-test-secret-0123456789", Duration::from_secs(3600))
            .expect("jwt service"),
    );
    let state = AppState::new(
        stockroom_db_memory::create_memory_store(),
        EntityCache::new(cache_store, CacheTtls::default()),
        jwt.clone(),
    );
    let app = build_app(state, &cfg);

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    TestServer {
        base: format!("http://{addr}"),
        jwt,
        shutdown: tx,
        handle,
    }
}

fn pen() -> Value {
    json!({
        "name": "Pen",
        "description": "Blue ink pen, medium tip",
        "price": 1.5,
        "category": "stationery",
        "stock": 100
    })
}

async fn signup(client: &reqwest::Client, server: &TestServer, email: &str) -> Value {
    let resp = client
        .post(server.url("/signup"))
        .json(&json!({"name": "Ann", "email": email, "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

async fn login(client: &reqwest::Client, server: &TestServer, email: &str) -> Value {
    let resp = client
        .post(server.url("/login"))
        .json(&json!({"email": email, "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn health_reports_backends() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/health")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["cache"], "local");

    let resp = client.get(server.url("/nowhere")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn product_lifecycle_with_cache_headers() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let admin = server.token(Role::MasterAdmin);

    let resp = client
        .post(server.url("/product"))
        .bearer_auth(&admin)
        .json(&pen())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Product created successfully");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    // First list misses, the identical second list hits.
    let list_url = server.url("/products?category=stationery");
    let resp = client.get(&list_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.headers()["x-cache"], "MISS");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Products fetched successfully");
    assert_eq!(body["pagination"]["total_items"], 1);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["data"][0]["name"], "Pen");

    let resp = client.get(&list_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.headers()["x-cache"], "HIT");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Products fetched from cache");

    // Detail read follows the same pattern.
    let detail_url = server.url(&format!("/product/{id}"));
    let resp = client.get(&detail_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.headers()["x-cache"], "MISS");
    let resp = client.get(&detail_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.headers()["x-cache"], "HIT");

    // An update invalidates both the detail and the listings.
    let resp = client
        .put(&detail_url)
        .bearer_auth(&admin)
        .json(&json!({"price": 2.0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["price"], 2.0);

    let resp = client.get(&detail_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.headers()["x-cache"], "MISS");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["price"], 2.0);

    let resp = client.get(&list_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.headers()["x-cache"], "MISS");

    // Delete, then the entity is gone everywhere.
    let resp = client.delete(&detail_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Product successfully deleted");

    let resp = client.get(&detail_url).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Product not found");

    let resp = client.get(&list_url).bearer_auth(&admin).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["total_items"], 0);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    server.stop().await;
}

#[tokio::test]
async fn product_requests_are_validated() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let admin = server.token(Role::MasterAdmin);

    let resp = client
        .post(server.url("/product"))
        .bearer_auth(&admin)
        .json(&json!({"name": "P", "price": -1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert!(!body["errors"].as_array().unwrap().is_empty());

    let resp = client
        .post(server.url("/product"))
        .bearer_auth(&admin)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid request body");

    let resp = client
        .get(server.url("/product/not-a-uuid"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid product ID");

    // Extractor rejections use the same JSON envelope as handler errors.
    let resp = client
        .get(server.url("/product/%FF"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid product ID");

    let resp = client
        .get(server.url("/products?page=1&page=2"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": 400, "message": "Invalid query parameters"}));

    let resp = client
        .patch(server.url(&format!("/product/{}", uuid::Uuid::new_v4())))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 405);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body, json!({"status": 405, "message": "Method not allowed"}));

    let resp = client.delete(server.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Method not allowed");

    let created: Value = client
        .post(server.url("/product"))
        .bearer_auth(&admin)
        .json(&pen())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["data"]["id"].as_str().unwrap();
    let resp = client
        .put(server.url(&format!("/product/{id}")))
        .bearer_auth(&admin)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No fields to update");

    server.stop().await;
}

#[tokio::test]
async fn protected_routes_require_credentials_and_permissions() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client.get(server.url("/products")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Authorization header is required");

    let resp = client
        .get(server.url("/products"))
        .header("authorization", "Token abc")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let user = server.token(Role::User);
    let resp = client
        .post(server.url("/product"))
        .bearer_auth(&user)
        .json(&pen())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Insufficient permissions");

    let sub_admin = server.token(Role::SubAdmin);
    let resp = client
        .get(server.url("/users"))
        .bearer_auth(&sub_admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .post(server.url("/roles"))
        .bearer_auth(&sub_admin)
        .json(&json!({"user_id": uuid::Uuid::new_v4().to_string(), "role": "sub_admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    server.stop().await;
}

#[tokio::test]
async fn signup_login_and_self_access() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let body = signup(&client, &server, "Ann@Example.com").await;
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["data"]["email"], "ann@example.com");
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("password").is_none());
    let ann_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(server.url("/signup"))
        .json(&json!({"name": "Ann", "email": "ann@example.com", "password": "secret1"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = client
        .post(server.url("/login"))
        .json(&json!({"email": "ann@example.com", "password": "wrong-pass"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid email or password");

    let body = login(&client, &server, "ann@example.com").await;
    assert_eq!(body["message"], "Login successful");
    let token = body["data"]["token"].as_str().unwrap().to_string();
    let claims = server.jwt.verify(&token).expect("token verifies");
    assert_eq!(claims.sub, ann_id);
    assert_eq!(claims.role, Role::User);

    let resp = client
        .get(server.url(&format!("/user/{ann_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["x-cache"], "MISS");

    let resp = client
        .put(server.url(&format!("/user/{ann_id}")))
        .bearer_auth(&token)
        .json(&json!({"address": "1 Main St"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["address"], "1 Main St");

    // Another user's record is off limits for a plain user.
    let other = signup(&client, &server, "bob@example.com").await;
    let other_id = other["data"]["id"].as_str().unwrap();
    let resp = client
        .get(server.url(&format!("/user/{other_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = client
        .put(server.url(&format!("/user/{other_id}")))
        .bearer_auth(&token)
        .json(&json!({"name": "Mallory"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], 403);

    server.stop().await;
}

#[tokio::test]
async fn sub_admin_cannot_edit_a_master_admin() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let admin = server.token(Role::MasterAdmin);
    let sub_admin = server.token(Role::SubAdmin);

    let body = signup(&client, &server, "root@example.com").await;
    let root_id = body["data"]["id"].as_str().unwrap().to_string();
    let body = signup(&client, &server, "dan@example.com").await;
    let dan_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .post(server.url("/roles"))
        .bearer_auth(&admin)
        .json(&json!({"user_id": root_id, "role": "master_admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .put(server.url(&format!("/user/{root_id}")))
        .bearer_auth(&sub_admin)
        .json(&json!({"password": "taken-over"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // The original password still works.
    login(&client, &server, "root@example.com").await;

    let resp = client
        .put(server.url(&format!("/user/{dan_id}")))
        .bearer_auth(&sub_admin)
        .json(&json!({"address": "2 Side St"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client
        .put(server.url(&format!("/user/{root_id}")))
        .bearer_auth(&admin)
        .json(&json!({"address": "HQ"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}

#[tokio::test]
async fn master_admin_assigns_roles() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    let admin = server.token(Role::MasterAdmin);

    let body = signup(&client, &server, "carol@example.com").await;
    let carol_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = client
        .get(server.url("/roles"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["master_admin"].is_array());

    let resp = client
        .post(server.url("/roles"))
        .bearer_auth(&admin)
        .json(&json!({"user_id": carol_id, "role": "overlord"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = client
        .post(server.url("/roles"))
        .bearer_auth(&admin)
        .json(&json!({"user_id": carol_id, "role": "sub_admin"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User role updated successfully");
    assert_eq!(body["data"]["role"], "sub_admin");

    // A fresh login carries the new role.
    let body = login(&client, &server, "carol@example.com").await;
    let claims = server
        .jwt
        .verify(body["data"]["token"].as_str().unwrap())
        .unwrap();
    assert_eq!(claims.role, Role::SubAdmin);

    let resp = client
        .get(server.url("/users?role=sub_admin"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["pagination"]["total_items"], 1);
    assert_eq!(body["data"][0]["id"], carol_id.as_str());

    let resp = client
        .delete(server.url(&format!("/user/{carol_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client
        .get(server.url(&format!("/user/{carol_id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.stop().await;
}

struct FailingCacheStore;

#[async_trait]
impl CacheStore for FailingCacheStore {
    async fn get(&self, _key: &str) -> Result<Option<Arc<Vec<u8>>>, CacheError> {
        Err(CacheError::unavailable("cache offline"))
    }
    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::unavailable("cache offline"))
    }
    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::unavailable("cache offline"))
    }
    async fn delete_by_prefix(&self, _prefix: &str) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("cache offline"))
    }
    fn mode(&self) -> &'static str {
        "offline"
    }
}

#[tokio::test]
async fn requests_succeed_when_the_cache_fails() {
    let server = start_server_with(Arc::new(FailingCacheStore)).await;
    let client = reqwest::Client::new();
    let admin = server.token(Role::MasterAdmin);

    let created: Value = client
        .post(server.url("/product"))
        .bearer_auth(&admin)
        .json(&pen())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["data"]["id"].as_str().unwrap();

    for _ in 0..2 {
        let resp = client
            .get(server.url(&format!("/product/{id}")))
            .bearer_auth(&admin)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["x-cache"], "MISS");
    }

    let resp = client
        .delete(server.url(&format!("/product/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}
