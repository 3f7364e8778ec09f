//! Shared setup for finance-service integration tests.
//!
//! Each test gets its own MongoDB database (from `MONGODB_URI`, default
//! `mongodb://localhost:27017`) which is dropped in [`TestApp::cleanup`].

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use finance_service::config::{
    AuthorizationConfig, FinanceConfig, JwtConfig, MongoConfig, SecurityConfig,
};
use finance_service::models::{midnight_utc, EntryKind, LedgerEntry, Role, User, UserStatus};
use finance_service::services::{MongoDb, RoleLookup};
use finance_service::utils::password::{hash_password, Password};
use finance_service::{build_router, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use service_core::config::{Config as CoreConfig, Environment};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "s3cret-pass";
pub const BYPASS_ROLE: &str = "superAdmin";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db_name: String,
}

pub fn test_config(db_name: &str) -> FinanceConfig {
    FinanceConfig {
        common: CoreConfig { port: 0 },
        environment: Environment::Dev,
        service_name: "finance-service-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        mongodb: MongoConfig {
            uri: std::env::var("MONGODB_URI")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            database: db_name.to_string(),
        },
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            expiry_days: 60,
        },
        authorization: AuthorizationConfig {
            bypass_role: BYPASS_ROLE.to_string(),
        },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        let db_name = format!("finance_test_{}", Uuid::new_v4().simple());
        let config = test_config(&db_name);

        let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
            .await
            .expect("Failed to connect to MongoDB");
        db.initialize_indexes()
            .await
            .expect("Failed to create indexes");

        let state = AppState::new(config, db);
        let router = build_router(state.clone());

        TestApp {
            router,
            state,
            db_name,
        }
    }

    pub fn db(&self) -> &MongoDb {
        &self.state.db
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty or non-JSON body).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, token, None).await
    }

    pub async fn seed_role(&self, name: &str, permissions: &[&str]) -> Role {
        let role = Role::new(
            name.to_string(),
            permissions.iter().map(|p| p.to_string()).collect(),
        );
        self.db().insert_role(&role).await.expect("Failed to seed role");
        role
    }

    /// Inserts an active user holding `role` (or no role).
    pub async fn seed_user(&self, email: &str, role: Option<&Role>) -> User {
        let hash = hash_password(&Password::new(TEST_PASSWORD.to_string()))
            .expect("Failed to hash password");
        let mut user = User::new("Test User".to_string(), email.to_string(), hash.into_string());
        user.role_id = role.map(|r| r.id.clone());
        user.status = UserStatus::Active;
        self.db().insert_user(&user).await.expect("Failed to seed user");
        user
    }

    /// Seeds a user with `permissions` and returns a bearer token for them.
    pub async fn token_with(&self, permissions: &[&str]) -> String {
        let role = self
            .seed_role(&format!("role-{}", Uuid::new_v4().simple()), permissions)
            .await;
        let user = self
            .seed_user(&format!("{}@example.com", Uuid::new_v4().simple()), Some(&role))
            .await;
        self.token_for(&user)
    }

    pub async fn admin_token(&self) -> String {
        let role = match self.state.roles.find_role_by_name(BYPASS_ROLE).await.unwrap() {
            Some(role) => role,
            None => self.seed_role(BYPASS_ROLE, &[]).await,
        };
        let user = self
            .seed_user(&format!("admin-{}@example.com", Uuid::new_v4().simple()), Some(&role))
            .await;
        self.token_for(&user)
    }

    pub fn token_for(&self, user: &User) -> String {
        self.state
            .jwt
            .issue(&user.id, &user.email, &user.name)
            .expect("Failed to issue token")
    }

    pub async fn seed_entry(&self, kind: EntryKind, label: &str, date: &str, amount: f64) -> LedgerEntry {
        let date = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        let entry = LedgerEntry::new(label.to_string(), date, amount, "seed-user".to_string());
        assert_eq!(entry.date, midnight_utc(date));
        self.db()
            .insert_entry(kind, &entry)
            .await
            .expect("Failed to seed entry");
        entry
    }

    pub async fn cleanup(&self) {
        let _ = self
            .db()
            .client()
            .database(&self.db_name)
            .drop(None)
            .await;
    }
}
