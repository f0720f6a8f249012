use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    auth::{AuthService, RegisterInput, UserPublic},
    config::{AppConfig, GatewayConfig},
    db,
    entities::product,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Helper harness backed by a throwaway SQLite database.
pub struct TestApp {
    pub state: AppState,
    #[allow(dead_code)]
    pub router: axum::Router,
    _tmp: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    #[allow(dead_code)]
    pub async fn new() -> Self {
        // No test exercises the gateway through this constructor; the URL
        // points nowhere on purpose.
        Self::with_gateway_url("http://127.0.0.1:9").await
    }

    /// Construct a test application whose payment gateway client targets the
    /// given base URL (a wiremock server in practice).
    pub async fn with_gateway_url(gateway_base_url: &str) -> Self {
        let tmp = TempDir::new().expect("failed to create temp dir");
        let db_path = tmp.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_32chars".to_string(),
            3_600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
            GatewayConfig {
                key_id: "key_test".to_string(),
                key_secret: "gateway_secret_for_tests".to_string(),
                base_url: gateway_base_url.to_string(),
                timeout_secs: 5,
            },
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");
        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(
            db_arc.clone(),
            event_sender.clone(),
            &cfg.jwt_secret,
            cfg.jwt_expiration,
        ));
        let services = AppServices::new(db_arc.clone(), event_sender.clone(), &cfg);

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth: auth.clone(),
        };
        let router = storefront_api::app_router(state.clone());

        Self {
            state,
            router,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    /// Registers an account and returns its token and public profile.
    pub async fn register_user(&self, name: &str, role: Option<&str>) -> (String, UserPublic) {
        self.state
            .auth
            .register(RegisterInput {
                name: name.to_string(),
                email: format!("{}-{}@example.com", name, Uuid::new_v4().simple()),
                password: "correct horse battery staple".to_string(),
                address: "12 Potters Lane".to_string(),
                role: role.map(|r| r.to_string()),
            })
            .await
            .expect("failed to register test user")
    }

    /// Inserts a catalog product directly.
    #[allow(dead_code)]
    pub async fn seed_product(
        &self,
        name: &str,
        price: Decimal,
        discount: Decimal,
    ) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            discount: Set(discount),
            category: Set("Decor".to_string()),
            description: Set("Handmade test product".to_string()),
            stock: Set(25),
            sold_count: Set(0),
            images: Set(serde_json::json!(["https://cdn.example/item.jpg"])),
            video: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("failed to seed product")
    }
}
