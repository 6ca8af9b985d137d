use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use warden_api::app::services::{AppServices, build_services};
use warden_api::config::{AdminBootstrap, ApiConfig};
use warden_events::{AccountEvent, Event, USER_LOGIN_ROUTING_KEY, USER_REGISTRATION_ROUTING_KEY};

const SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@x.com";
const ADMIN_PASSWORD: &str = "adminpassword";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let mut config = ApiConfig::for_tests(SECRET);
        config.bootstrap_admin = Some(AdminBootstrap {
            email: ADMIN_EMAIL.to_string(),
            username: "admin".to_string(),
            password: ADMIN_PASSWORD.to_string(),
        });

        // Same router as prod, bound to an ephemeral port.
        let services = Arc::new(build_services(&config).expect("services"));
        let app = warden_api::app::build_app_with(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str, email: &str) -> reqwest::Response {
        self.client
            .post(self.url("/users/register"))
            .json(&json!({
                "name": username,
                "username": username,
                "email": email,
                "password": "pw12345678",
            }))
            .send()
            .await
            .unwrap()
    }

    async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/users/login"))
            .header("X-Forwarded-For", "198.51.100.4")
            .header("User-Agent", "black-box")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap()
    }

    async fn token_for(&self, email: &str, password: &str) -> String {
        let res = self.login(email, password).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        req.send().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(secret: &str, sub: &str, roles: &[&str], iat_offset: ChronoDuration, ttl: ChronoDuration) -> String {
    let iat = Utc::now() + iat_offset;
    let claims = json!({
        "sub": sub,
        "roles": roles.iter().map(|r| format!("ROLE_{r}")).collect::<Vec<_>>(),
        "iat": iat.timestamp(),
        "exp": (iat + ttl).timestamp(),
    });

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn decode_payload(token: &str) -> Value {
    let mut validation = jsonwebtoken::Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    jsonwebtoken::decode::<Value>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(SECRET.as_bytes()),
        &validation,
    )
    .expect("token verifies with server secret")
    .claims
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.get("/health", None).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_me() {
    let srv = TestServer::spawn().await;

    let res = srv.register("alice", "a@x.com").await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "a@x.com");
    assert_eq!(body["data"]["roles"], json!(["USER"]));

    let res = srv.login("A@x.com", "pw12345678").await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["token_type"], "Bearer");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let claims = decode_payload(&token);
    assert_eq!(claims["sub"], "a@x.com");
    assert_eq!(claims["roles"], json!(["ROLE_USER"]));

    let res = srv.get("/users/me", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["username"], "alice");
    assert!(body["data"]["last_login_at"].is_string());
}

#[tokio::test]
async fn unknown_identity_and_wrong_password_look_the_same() {
    let srv = TestServer::spawn().await;
    srv.register("alice", "a@x.com").await;

    let unknown = srv.login("ghost@x.com", "pw12345678").await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown: Value = unknown.json().await.unwrap();
    assert!(unknown.get("data").is_none());

    let wrong = srv.login("a@x.com", "not-the-password").await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong: Value = wrong.json().await.unwrap();

    assert_eq!(unknown, wrong);
}

#[tokio::test]
async fn every_token_failure_yields_the_same_401() {
    let srv = TestServer::spawn().await;

    let missing = srv.get("/users/me", None).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let baseline: Value = missing.json().await.unwrap();

    let wrong_scheme = srv
        .client
        .get(srv.url("/users/me"))
        .header("Authorization", "Token abc")
        .send()
        .await
        .unwrap();
    let forged = mint_jwt("other-secret", ADMIN_EMAIL, &["ADMIN"], ChronoDuration::zero(), ChronoDuration::hours(1));
    let expired = mint_jwt(SECRET, ADMIN_EMAIL, &["ADMIN"], ChronoDuration::hours(-2), ChronoDuration::hours(1));

    let responses = vec![
        wrong_scheme,
        srv.get("/users/me", Some("garbage")).await,
        srv.get("/users/me", Some(&forged)).await,
        srv.get("/users/me", Some(&expired)).await,
        srv.get("/admin/stats", Some(&forged)).await,
    ];

    for res in responses {
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, baseline);
    }
}

#[tokio::test]
async fn future_issued_at_is_accepted() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(SECRET, ADMIN_EMAIL, &["ADMIN"], ChronoDuration::minutes(10), ChronoDuration::hours(1));
    let res = srv.get("/admin/stats", Some(&token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_token_is_forbidden_on_admin_operations() {
    let srv = TestServer::spawn().await;
    srv.register("alice", "a@x.com").await;
    let token = srv.token_for("a@x.com", "pw12345678").await;

    for path in ["/roles", "/admin/stats"] {
        let res = srv.get(path, Some(&token)).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{path}");
    }

    let res = srv
        .client
        .post(srv.url("/roles"))
        .bearer_auth(&token)
        .json(&json!({ "name": "MANAGER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // The guard runs before the handler: nothing was created.
    let names: Vec<String> = srv
        .services
        .accounts
        .list_roles()
        .unwrap()
        .into_iter()
        .map(|r| r.name.as_str().to_string())
        .collect();
    assert!(!names.contains(&"MANAGER".to_string()));
}

#[tokio::test]
async fn admin_manages_roles_and_changes_are_visible_immediately() {
    let srv = TestServer::spawn().await;
    let res = srv.register("alice", "a@x.com").await;
    let alice: Value = res.json().await.unwrap();
    let alice_id = alice["data"]["id"].as_str().unwrap().to_string();

    let user_token = srv.token_for("a@x.com", "pw12345678").await;
    let admin_token = srv.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    // Prime the principal cache.
    let res = srv.get("/users/me", Some(&user_token)).await;
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["data"]["roles"], json!(["USER"]));

    let res = srv
        .client
        .post(srv.url("/roles"))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "manager", "description": "Managers" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let role: Value = res.json().await.unwrap();
    assert_eq!(role["data"]["name"], "MANAGER");
    let role_id = role["data"]["id"].as_str().unwrap().to_string();

    let dup = srv
        .client
        .post(srv.url("/roles"))
        .bearer_auth(&admin_token)
        .json(&json!({ "name": "MANAGER" }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), StatusCode::CONFLICT);

    let res = srv
        .client
        .post(srv.url(&format!("/roles/users/{alice_id}/roles")))
        .bearer_auth(&admin_token)
        .json(&json!({ "role_ids": [role_id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.get("/users/me", Some(&user_token)).await;
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["data"]["roles"], json!(["MANAGER", "USER"]));

    let unknown_role = srv
        .client
        .post(srv.url(&format!("/roles/users/{alice_id}/roles")))
        .bearer_auth(&admin_token)
        .json(&json!({ "role_ids": [uuid::Uuid::new_v4()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown_role.status(), StatusCode::NOT_FOUND);

    let bad_user = srv
        .client
        .post(srv.url("/roles/users/not-a-uuid/roles"))
        .bearer_auth(&admin_token)
        .json(&json!({ "role_ids": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_user.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_stats_reports_totals() {
    let srv = TestServer::spawn().await;
    srv.register("alice", "a@x.com").await;
    srv.register("bobby", "b@x.com").await;
    let admin_token = srv.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let res = srv.get("/admin/stats", Some(&admin_token)).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let stats = &body["data"];
    assert_eq!(stats["total_users"], 3);
    assert_eq!(stats["total_roles"], 2);
    assert_eq!(stats["active_users"], 1);

    let bobby = stats["users"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["username"] == "bobby")
        .unwrap();
    assert_eq!(bobby["login_status"], "Never logged in");
}

#[tokio::test]
async fn registration_rejects_duplicates_and_bad_input() {
    let srv = TestServer::spawn().await;
    assert_eq!(srv.register("alice", "a@x.com").await.status(), StatusCode::CREATED);
    assert_eq!(srv.register("alice", "other@x.com").await.status(), StatusCode::CONFLICT);
    assert_eq!(srv.register("alice2", "A@X.COM").await.status(), StatusCode::CONFLICT);
    assert_eq!(srv.register("al", "c@x.com").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(srv.register("carol", "not-an-email").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn account_events_are_published() {
    let srv = TestServer::spawn().await;
    let sub = warden_events::EventBus::subscribe(&*srv.services.events);

    srv.register("alice", "a@x.com").await;
    srv.login("a@x.com", "wrong-password").await;
    srv.token_for("a@x.com", "pw12345678").await;

    let events: Vec<AccountEvent> = sub.drain().into_iter().map(|e| e.into_payload()).collect();
    let keys: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(keys, vec![USER_REGISTRATION_ROUTING_KEY, USER_LOGIN_ROUTING_KEY, USER_LOGIN_ROUTING_KEY]);

    match &events[2] {
        AccountEvent::LoggedIn(e) => {
            assert!(e.successful);
            assert_eq!(e.client.ip_address.as_deref(), Some("198.51.100.4"));
            assert_eq!(e.client.user_agent.as_deref(), Some("black-box"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn malformed_bodies_get_the_error_envelope() {
    let srv = TestServer::spawn().await;
    let admin_token = srv.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let responses = vec![
        srv.client
            .post(srv.url("/users/register"))
            .header("Content-Type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap(),
        srv.client
            .post(srv.url("/users/login"))
            .json(&json!({ "email": "a@x.com" }))
            .send()
            .await
            .unwrap(),
        srv.client
            .post(srv.url("/roles"))
            .bearer_auth(&admin_token)
            .body(r#"{"name":"MANAGER"}"#)
            .send()
            .await
            .unwrap(),
    ];

    for res in responses {
        assert!(res.status().is_client_error(), "{}", res.status());
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "invalid_request_body");
        assert!(body["message"].is_string());
    }
}

#[tokio::test]
async fn admin_clears_the_principal_cache() {
    let srv = TestServer::spawn().await;
    srv.register("alice", "a@x.com").await;
    let user_token = srv.token_for("a@x.com", "pw12345678").await;
    let admin_token = srv.token_for(ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let denied = srv
        .client
        .delete(srv.url("/admin/cache"))
        .bearer_auth(&user_token)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .delete(srv.url("/admin/cache"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["namespace"], "userCache");

    let res = srv.get("/users/me", Some(&user_token)).await;
    assert_eq!(res.status(), StatusCode::OK);
}
