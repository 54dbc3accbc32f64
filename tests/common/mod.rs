use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    auth,
    config::AppConfig,
    db,
    entities::product,
    errors::ServiceError,
    events::{self, EventSender},
    gateway::{PaymentGateway, PaymentIntent},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub struct RecordedIntent {
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
}

/// In-process stand-in for the payment provider. Records every intent it
/// is asked to create and can be flipped into a failing mode to exercise
/// the no-partial-writes path.
pub struct FakeGateway {
    calls: Mutex<Vec<RecordedIntent>>,
    fail: AtomicBool,
    counter: AtomicU64,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            counter: AtomicU64::new(0),
        }
    }

    #[allow(dead_code)]
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<RecordedIntent> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(
        &self,
        amount: i64,
        currency: &str,
        receipt: &str,
    ) -> Result<PaymentIntent, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "gateway unavailable".to_string(),
            ));
        }

        self.calls.lock().unwrap().push(RecordedIntent {
            amount,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
        });

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(PaymentIntent {
            id: format!("order_test_{n}"),
            amount,
            currency: currency.to_string(),
        })
    }
}

/// Helper harness for spinning up an application backed by a throwaway
/// SQLite database file.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub gateway: Arc<FakeGateway>,
    router: Router,
    _db_file: tempfile::NamedTempFile,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_file = tempfile::NamedTempFile::new().expect("create temp database file");
        let database_url = format!("sqlite://{}?mode=rwc", db_file.path().display());

        let cfg = AppConfig::for_tests(database_url);

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::ensure_schema(&pool)
            .await
            .expect("failed to create test schema");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = Arc::new(FakeGateway::new());
        let services = AppServices::new(
            db_arc.clone(),
            event_sender.clone(),
            gateway.clone() as Arc<dyn PaymentGateway>,
            &cfg,
        );

        let state = Arc::new(AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        });

        let router = Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .with_state(state.clone());

        Self {
            state,
            gateway,
            router,
            _db_file: db_file,
            _event_task: event_task,
        }
    }

    /// HMAC secret the confirmation endpoint verifies against.
    #[allow(dead_code)]
    pub fn merchant_secret(&self) -> &str {
        &self.state.config.gateway.key_secret
    }

    /// Bearer token for a plain customer.
    #[allow(dead_code)]
    pub fn customer_token(&self, customer_id: Uuid) -> String {
        auth::issue_token(
            customer_id,
            Some("customer@example.com".to_string()),
            vec!["customer".to_string()],
            &self.state.config.jwt_secret,
            3600,
        )
        .expect("issue customer token")
    }

    /// Bearer token carrying the admin role.
    #[allow(dead_code)]
    pub fn admin_token(&self, user_id: Uuid) -> String {
        auth::issue_token(
            user_id,
            Some("admin@example.com".to_string()),
            vec!["admin".to_string()],
            &self.state.config.jwt_secret,
            3600,
        )
        .expect("issue admin token")
    }

    /// Sends a JSON request through the router and returns the status
    /// plus the parsed response body.
    #[allow(dead_code)]
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = builder
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read response body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is not valid JSON")
        };

        (status, json)
    }
}

/// Inserts a catalog row directly, bypassing the admin endpoint.
#[allow(dead_code)]
pub async fn seed_product(app: &TestApp, name: &str, price: Decimal, stock: i32) -> Uuid {
    let id = Uuid::new_v4();
    let now = Utc::now();

    product::ActiveModel {
        id: Set(id),
        name: Set(name.to_string()),
        description: Set(format!("{name} description")),
        category: Set("test".to_string()),
        price: Set(price),
        stock: Set(stock),
        images: Set(serde_json::json!(["https://img.example.com/one.png"])),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&*app.state.db)
    .await
    .expect("failed to seed product");

    id
}
