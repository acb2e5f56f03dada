#![allow(dead_code)]

use axum::Router;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mongo::Mongo;

use dealroom::app::{build_router, AppState};
use dealroom::config::{AppConfig, RateLimitConfig};

pub const ADMIN_EMAIL: &str = "admin@dealroom.test";
pub const ADMIN_PASSWORD: &str = "admin-password-1";

/// Holds a running MongoDB container and the router wired to it.
///
/// The container lives as long as this struct; dropping it stops and
/// removes the container.
pub struct TestEnv {
    _mongo: ContainerAsync<Mongo>,
    pub db: mongodb::Database,
    pub state: AppState,
    pub router: Router,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        mongodb_uri: String::new(),
        mongodb_database: "dealroom_test".to_string(),
        session_secret: "integration-secret-0123456789abcdef".to_string(),
        session_ttl_hours: 1,
        cookie_secure: false,
        static_dir: concat!(env!("CARGO_MANIFEST_DIR"), "/public").to_string(),
        rate_limit: RateLimitConfig {
            window_secs: 60,
            comment_limit: 5,
            max_tracked_clients: 1_000,
        },
    }
}

impl TestEnv {
    pub async fn start() -> Self {
        let mongo_container = Mongo::default()
            .start()
            .await
            .expect("Failed to start MongoDB container");
        let mongo_port = mongo_container
            .get_host_port_ipv4(27017)
            .await
            .expect("Failed to get MongoDB port");
        let mongo_uri = format!("mongodb://127.0.0.1:{mongo_port}");

        let mongo_client = mongodb::Client::with_uri_str(&mongo_uri)
            .await
            .expect("Failed to connect to MongoDB");
        let config = AppConfig {
            mongodb_uri: mongo_uri,
            ..test_config()
        };
        let db = mongo_client.database(&config.mongodb_database);

        let state = AppState::from_database(&db, &config)
            .await
            .expect("Failed to build application state");
        let router = build_router(state.clone(), &config.static_dir);

        Self {
            _mongo: mongo_container,
            db,
            state,
            router,
        }
    }

    /// Build an `axum_test::TestServer` that keeps cookies between requests.
    pub fn server(&self) -> axum_test::TestServer {
        axum_test::TestServer::builder()
            .save_cookies()
            .build(self.router.clone())
    }

    /// Create the admin account directly through the service layer.
    pub async fn create_admin(&self) {
        dealroom::api::users::ensure_admin(
            self.state.user_repo.as_ref(),
            "Site Admin",
            ADMIN_EMAIL,
            ADMIN_PASSWORD,
        )
        .await
        .expect("Failed to create admin");
    }

    /// A server already signed in as the admin.
    pub async fn admin_server(&self) -> axum_test::TestServer {
        self.create_admin().await;
        let server = self.server();
        login(&server, ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .assert_status_ok();
        server
    }
}

pub async fn login(
    server: &axum_test::TestServer,
    email: &str,
    password: &str,
) -> axum_test::TestResponse {
    server
        .post("/api/auth/login")
        .json(&serde_json::json!({ "email": email, "password": password }))
        .await
}

pub async fn register(
    server: &axum_test::TestServer,
    name: &str,
    email: &str,
    password: &str,
) -> axum_test::TestResponse {
    server
        .post("/api/auth/register")
        .json(&serde_json::json!({ "name": name, "email": email, "password": password }))
        .await
}

/// Create a blog post through the admin API and return its JSON.
pub async fn create_post(
    server: &axum_test::TestServer,
    title: &str,
    status: &str,
) -> serde_json::Value {
    let response = server
        .post("/api/admin/blogs")
        .json(&serde_json::json!({
            "title": title,
            "content": format!("<p>{title} body</p>"),
            "status": status,
            "category": "insights",
            "tags": ["m&a"]
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json()
}

pub async fn create_model(server: &axum_test::TestServer, title: &str) -> serde_json::Value {
    let response = server
        .post("/api/admin/models")
        .json(&serde_json::json!({
            "title": title,
            "description": "Carve-out of a regional logistics business",
            "deal_size": "$250M",
            "industry": "Industrials",
            "deal_type": "LBO",
            "featured": true
        }))
        .await;
    response.assert_status(axum::http::StatusCode::CREATED);
    response.json()
}
