#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::anyhow;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{
        Method, Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
};
use futures_util::future::BoxFuture;
use lovebirds::{
    AppState, app,
    config::Config,
    db,
    images::store::LocalStore,
    notify::{CodeSender, Notice, Notifier},
};
use serde_json::{Value, json};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Abcdef1!";

#[derive(Debug, Clone)]
pub struct Sent {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub type Outbox = Arc<Mutex<Vec<Sent>>>;

pub struct RecordingSender(pub Outbox);

impl CodeSender for RecordingSender {
    fn send<'a>(&'a self, to: &'a str, notice: Notice<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            self.0.lock().unwrap().push(Sent {
                to: to.to_owned(),
                subject: notice.subject.to_owned(),
                body: notice.body.to_owned(),
            });
            Ok(())
        })
    }
}

pub struct FailingSender;

impl CodeSender for FailingSender {
    fn send<'a>(&'a self, _to: &'a str, _notice: Notice<'a>) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { Err(anyhow!("provider said no")) })
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub bytes: Bytes,
    pub cookie: Option<String>,
    pub content_type: Option<String>,
}

pub struct TestApp {
    pub router: Router,
    pub db_pool: SqlitePool,
    pub emails: Outbox,
    pub texts: Outbox,
    pub media_dir: TempDir,
}

async fn memory_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // one connection that never idles out, or the in-memory database vanishes
    let db_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    db::migrate(&db_pool).await.unwrap();
    db_pool
}

impl TestApp {
    pub async fn new() -> Self {
        let emails = Outbox::default();
        let texts = Outbox::default();
        Self::build(
            Arc::new(RecordingSender(emails.clone())),
            Arc::new(RecordingSender(texts.clone())),
            emails,
            texts,
            4,
        )
        .await
    }

    /// Like `new`, hashing passwords at `bcrypt_cost`.
    pub async fn with_bcrypt_cost(bcrypt_cost: u32) -> Self {
        let emails = Outbox::default();
        let texts = Outbox::default();
        Self::build(
            Arc::new(RecordingSender(emails.clone())),
            Arc::new(RecordingSender(texts.clone())),
            emails,
            texts,
            bcrypt_cost,
        )
        .await
    }

    pub async fn with_failing_delivery() -> Self {
        Self::build(
            Arc::new(FailingSender),
            Arc::new(FailingSender),
            Outbox::default(),
            Outbox::default(),
            4,
        )
        .await
    }

    async fn build(
        email: Arc<dyn CodeSender>,
        sms: Arc<dyn CodeSender>,
        emails: Outbox,
        texts: Outbox,
        bcrypt_cost: u32,
    ) -> Self {
        let db_pool = memory_pool().await;
        let media_dir = tempfile::tempdir().unwrap();

        let config = Config {
            bcrypt_cost,
            media_dir: media_dir.path().to_path_buf(),
            ..Config::default()
        };
        let notifier = Notifier::new(email, sms, Duration::from_secs(2));
        let media = Arc::new(LocalStore::new(media_dir.path(), &config.media_base_url));

        let router = app(AppState::new(db_pool.clone(), notifier, media, config));

        TestApp {
            router,
            db_pool,
            emails,
            texts,
            media_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_owned);
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            body,
            bytes,
            cookie,
            content_type,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>, cookie: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        };

        self.send(request.unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: Value, cookie: Option<&str>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), cookie).await
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, None, cookie).await
    }

    /// `files` are `(content_type, bytes)` pairs sent under `field`.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        field: &str,
        files: &[(&str, &[u8])],
        cookie: Option<&str>,
    ) -> TestResponse {
        const BOUNDARY: &str = "lovebirdsboundary";

        let mut body = Vec::new();
        for (index, (content_type, bytes)) in files.iter().enumerate() {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{field}\"; filename=\"file{index}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }

        self.send(builder.body(Body::from(body)).unwrap()).await
    }

    pub async fn signup(&self, identifier: &str, gender: &str, preferred: &[&str]) -> TestResponse {
        self.post(
            "/signup",
            json!({
                "name": "Test User",
                "phoneOrEmail": identifier,
                "password": PASSWORD,
                "dateOfBirth": "1995-04-12",
                "gender": gender,
                "preferredGenders": preferred,
            }),
            None,
        )
        .await
    }

    /// The code in the newest message sent to `to` over either channel.
    pub fn last_code(&self, to: &str) -> String {
        let emails = self.emails.lock().unwrap();
        let texts = self.texts.lock().unwrap();
        let sent = emails
            .iter()
            .chain(texts.iter())
            .filter(|sent| sent.to == to)
            .last()
            .expect("no code was sent");

        sent.body.chars().filter(char::is_ascii_digit).collect()
    }

    pub async fn user_count(&self) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db_pool)
            .await
            .unwrap();
        count
    }

    pub async fn is_verified(&self, identifier: &str) -> bool {
        let (verified,): (bool,) = sqlx::query_as("SELECT verified FROM users WHERE phone_or_email=?")
            .bind(identifier)
            .fetch_one(&self.db_pool)
            .await
            .unwrap();
        verified
    }

    pub async fn sign_in(&self, identifier: &str) -> TestResponse {
        self.post(
            "/signin",
            json!({ "phoneOrEmail": identifier, "password": PASSWORD }),
            None,
        )
        .await
    }

    /// Signs up, verifies and signs in; returns the user id and session cookie.
    pub async fn member(&self, identifier: &str, gender: &str, preferred: &[&str]) -> (Uuid, String) {
        let signup = self.signup(identifier, gender, preferred).await;
        assert_eq!(signup.status, StatusCode::CREATED, "{}", signup.body);

        let code = self.last_code(identifier);
        let verify = self
            .post("/verify", json!({ "phoneOrEmail": identifier, "code": code }), None)
            .await;
        assert_eq!(verify.status, StatusCode::OK, "{}", verify.body);

        let signin = self.sign_in(identifier).await;
        assert_eq!(signin.status, StatusCode::OK, "{}", signin.body);

        let user_id = Uuid::parse_str(signin.body["userId"].as_str().unwrap()).unwrap();
        (user_id, signin.cookie.expect("signin sets a session cookie"))
    }
}
