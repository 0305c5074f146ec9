//! Shared fixtures: an in-process router over the memory store, a recording
//! mailer and a temporary upload directory.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront::config::{Config, PayFastConfig, StoreBackend};
use storefront::notifications::{Email, MailError, Mailer, Notifier, RetryPolicy};
use storefront::shutdown::{self, ShutdownTrigger};
use storefront::store::MemoryStore;
use storefront::{api, AppState};

pub const ADMIN_PASSWORD: &str = "correct-horse-battery";
pub const STORE_EMAIL: &str = "orders@shop.test";
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13, b'I', b'H', b'D', b'R'];

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<Email>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, email: &Email) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub uploads: tempfile::TempDir,
    pub trigger: ShutdownTrigger,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().unwrap();
        let config = Config {
            store: StoreBackend::Memory,
            site_url: "https://shop.test".into(),
            upload_dir: uploads.path().to_path_buf(),
            max_upload_bytes: 1024,
            verify_delay_min_secs: 0,
            verify_delay_max_secs: 0,
            admin_password: ADMIN_PASSWORD.into(),
            jwt_secret: "test-secret-test-secret-test-secret".into(),
            store_email: STORE_EMAIL.into(),
            payfast: PayFastConfig {
                merchant_id: "10000100".into(),
                merchant_key: "46f0cd694581a".into(),
                passphrase: "jt7NOE43FZPn".into(),
                process_url: "https://sandbox.payfast.co.za/eng/process".into(),
            },
            ..Config::default()
        };
        let mailer = Arc::new(RecordingMailer::default());
        let policy = RetryPolicy { attempts: 1, base_delay: Duration::from_millis(1) };
        let (notifier, _worker) = Notifier::spawn(mailer.clone(), 64, STORE_EMAIL, policy);
        let (trigger, shutdown) = shutdown::channel();
        let state = AppState::new(config, Arc::new(MemoryStore::new()), notifier, shutdown);
        let router = api::router(state.clone());
        Self { router, state, mailer, uploads, trigger }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        TestResponse { status, headers, body }
    }

    pub async fn json(&self, method: &str, uri: &str, cookie: Option<&str>, body: Value) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// Starts a shopping session and returns its `Cookie` header value.
    pub async fn session(&self) -> String {
        let response = self.get("/api/cart", None).await;
        let set_cookie = response.headers.get(header::SET_COOKIE).unwrap().to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    pub async fn add_item(&self, cookie: &str, product_ref: &str, price: i64, quantity: i64) -> TestResponse {
        let body = json!({
            "productRef": product_ref,
            "slug": product_ref.to_lowercase(),
            "name": format!("Product {product_ref}"),
            "price": price,
            "image": format!("/images/{product_ref}.jpg"),
            "quantity": quantity,
        });
        self.json("POST", "/api/cart", Some(cookie), body).await
    }

    pub async fn checkout(&self, cookie: &str, method: &str) -> TestResponse {
        self.json("POST", "/api/checkout", Some(cookie), json!({
            "shippingAddress": shipping_address(),
            "paymentMethod": method,
        })).await
    }

    /// A fresh session with one line in the cart, checked out with `method`.
    pub async fn place_order(&self, method: &str, price: i64) -> String {
        self.place_order_in_session(method, price).await.0
    }

    /// Like `place_order`, also returning the owning session's cookie.
    pub async fn place_order_in_session(&self, method: &str, price: i64) -> (String, String) {
        let cookie = self.session().await;
        self.add_item(&cookie, "WATCH-1", price, 1).await;
        let response = self.checkout(&cookie, method).await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        (response.body["order"]["orderNumber"].as_str().unwrap().to_string(), cookie)
    }

    pub async fn payment_status(&self, order_number: &str) -> String {
        self.state.orders.get(order_number).await.unwrap().payment_status().to_string()
    }

    pub async fn upload(&self, order_number: &str, method: &str, content_type: &str, bytes: &[u8]) -> TestResponse {
        let boundary = "storefront-test-boundary";
        let mut body = Vec::new();
        for (name, value) in [("orderNumber", order_number), ("paymentMethod", method)] {
            body.extend_from_slice(format!("--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes());
        }
        body.extend_from_slice(format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"screenshot\"; filename=\"proof.png\"\r\nContent-Type: {content_type}\r\n\r\n"
        ).as_bytes());
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/payment-verification")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn admin_token(&self) -> String {
        let response = self.json("POST", "/api/admin/login", None, json!({ "password": ADMIN_PASSWORD })).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["token"].as_str().unwrap().to_string()
    }

    pub async fn admin(&self, method: &str, uri: &str, token: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri).header(header::AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(body) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };
        self.send(request.unwrap()).await
    }

    pub async fn webhook(&self, fields: &[(&str, &str)], sign: bool) -> TestResponse {
        let mut fields: Vec<(String, String)> = fields.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        if sign {
            let signature = self.state.payfast.sign(&fields);
            fields.push(("signature".into(), signature));
        }
        let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(&fields).finish();
        let request = Request::builder()
            .method("POST")
            .uri("/api/payfast/webhook")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Waits for the notification worker to deliver at least `count` emails.
    pub async fn emails(&self, count: usize) -> Vec<Email> {
        for _ in 0..100 {
            let sent = self.mailer.sent.lock().unwrap().clone();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.mailer.sent.lock().unwrap().clone()
    }

    pub fn stored_screenshots(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).map(|d| d.count()).unwrap_or(0)
    }
}

pub fn shipping_address() -> Value {
    json!({
        "fullName": "Hamza Tariq",
        "email": "hamza@example.com",
        "phone": "03001234567",
        "address": "45 Canal View",
        "city": "Lahore",
        "postalCode": "54000",
    })
}
