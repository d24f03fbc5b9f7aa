#![allow(dead_code)]

use std::net::TcpListener;

use locate_this::configuration::{
    ApplicationSettings, DatabaseSettings, JwtSettings, PasswordSettings, Settings,
};
use locate_this::database;
use locate_this::startup::run;
use reqwest::{RequestBuilder, Response};
use serde_json::{json, Value};
use sqlx::SqlitePool;

/// Lowest cost bcrypt accepts, keeps registration fast in tests
pub const TEST_HASH_COST: u32 = 4;

pub struct TestApp {
    pub address: String,
    pub db_pool: SqlitePool,
    pub settings: Settings,
    pub client: reqwest::Client,
}

/// A registered user with a live token pair
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_settings() -> Settings {
    Settings {
        database: DatabaseSettings::in_memory(),
        application: ApplicationSettings {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        jwt: JwtSettings {
            access_secret: "integration-access-secret-at-least-32-chars".to_string(),
            refresh_secret: "integration-refresh-secret-at-least-32-chars".to_string(),
            access_token_expiry: 7200,
            refresh_token_expiry: 10800,
            issuer: "locate_this_test".to_string(),
        },
        password: PasswordSettings {
            hash_cost: TEST_HASH_COST,
        },
    }
}

pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let settings = test_settings();
    let db_pool = database::in_memory()
        .await
        .expect("Failed to create in-memory database");

    let server = run(listener, db_pool.clone(), &settings).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        db_pool,
        settings,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.client.get(format!("{}{}", self.address, path))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.client.post(format!("{}{}", self.address, path))
    }

    pub fn put(&self, path: &str) -> RequestBuilder {
        self.client.put(format!("{}{}", self.address, path))
    }

    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.client.delete(format!("{}{}", self.address, path))
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.post(path)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn register(&self, username: &str) -> TestUser {
        let email = format!("{}@example.com", username);
        let password = "SecurePass123".to_string();

        let response = self
            .post_json(
                "/auth/register",
                &json!({ "email": email, "username": username, "password": password }),
            )
            .await;
        assert_eq!(201, response.status().as_u16(), "registration of {} failed", username);

        let body: Value = response.json().await.expect("Failed to parse response");
        TestUser {
            id: body["user"]["user_id"].as_i64().expect("missing user id"),
            email,
            username: username.to_string(),
            password,
            access_token: body["access_token"].as_str().unwrap().to_string(),
            refresh_token: body["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    /// Authenticated GET returning status and parsed body
    pub async fn get_as(&self, user: &TestUser, path: &str) -> (u16, Value) {
        let response = self
            .get(path)
            .bearer_auth(&user.access_token)
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// Authenticated POST returning status and parsed body
    pub async fn post_as(&self, user: &TestUser, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .post(path)
            .bearer_auth(&user.access_token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// Authenticated PUT returning status and parsed body
    pub async fn put_as(&self, user: &TestUser, path: &str, body: &Value) -> (u16, Value) {
        let response = self
            .put(path)
            .bearer_auth(&user.access_token)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.");
        let status = response.status().as_u16();
        (status, response.json().await.unwrap_or(Value::Null))
    }

    /// Authenticated DELETE returning the status
    pub async fn delete_as(&self, user: &TestUser, path: &str) -> u16 {
        self.delete(path)
            .bearer_auth(&user.access_token)
            .send()
            .await
            .expect("Failed to execute request.")
            .status()
            .as_u16()
    }
}
