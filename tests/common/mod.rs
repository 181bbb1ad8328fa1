#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::NaiveDate;
use sales_order_api::{
    build_router,
    config::AppConfig,
    db::{self, DbPool},
    services::OrderService,
    AppState,
};
use sea_orm::{ConnectionTrait, DatabaseBackend as DbBackend, Statement};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE products (
        prod_id INTEGER PRIMARY KEY,
        prod_name TEXT NOT NULL,
        prod_desc TEXT,
        prod_subcategory TEXT,
        prod_list_price REAL
    );",
    "CREATE TABLE times (time_id TEXT PRIMARY KEY);",
    "CREATE TABLE orders (
        order_id INTEGER PRIMARY KEY,
        order_date TEXT NOT NULL,
        order_mode TEXT NOT NULL,
        customer_id INTEGER NOT NULL,
        order_status INTEGER NOT NULL,
        order_total REAL NOT NULL,
        sales_rep_id INTEGER,
        promotion_id INTEGER
    );",
    "CREATE TABLE sales (
        prod_id INTEGER NOT NULL,
        cust_id INTEGER NOT NULL,
        time_id TEXT NOT NULL,
        channel_id INTEGER NOT NULL,
        promo_id INTEGER NOT NULL,
        quantity_sold INTEGER NOT NULL,
        amount_sold REAL NOT NULL
    );",
];

/// Helper harness for spinning up the application against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub config: AppConfig,
    _dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with an empty schema.
    pub async fn new() -> Self {
        Self::with_pool_size(4).await
    }

    /// Same as [`TestApp::new`] with the pool capped at `max_connections`.
    pub async fn with_pool_size(max_connections: u32) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let db_path = dir.path().join("sales.db");

        let mut cfg = AppConfig::with_database_url(format!(
            "sqlite://{}?mode=rwc",
            db_path.display()
        ));
        cfg.db_max_connections = max_connections;
        cfg.db_min_connections = 1;
        cfg.db_acquire_timeout_secs = 30;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");

        for ddl in SCHEMA {
            pool.execute(Statement::from_string(DbBackend::Sqlite, ddl.to_string()))
                .await
                .expect("create schema");
        }

        let state = AppState::new(Arc::new(pool), &cfg);
        let router = build_router(state.clone(), &cfg);

        Self {
            router,
            state,
            config: cfg,
            _dir: dir,
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.state.db
    }

    pub fn orders(&self) -> &OrderService {
        &self.state.orders
    }

    /// Connections currently open in the pool
    pub fn pool_size(&self) -> u32 {
        self.db().get_sqlite_connection_pool().size()
    }

    /// Handle on the underlying pool, for sampling from another task
    pub fn sqlite_pool(&self) -> sea_orm::sqlx::SqlitePool {
        self.db().get_sqlite_connection_pool().clone()
    }

    pub async fn exec(&self, sql: impl Into<String>) {
        self.db()
            .execute(Statement::from_string(DbBackend::Sqlite, sql.into()))
            .await
            .expect("execute seed statement");
    }

    pub async fn seed_product(&self, id: i32, name: &str, price: Option<f64>) {
        let price = price.map_or_else(|| "NULL".to_string(), |p| p.to_string());
        self.exec(format!(
            "INSERT INTO products (prod_id, prod_name, prod_desc, prod_subcategory, prod_list_price) \
             VALUES ({id}, '{name}', '{name} description', 'Accessories', {price})"
        ))
        .await;
    }

    pub async fn seed_time(&self, date: NaiveDate) {
        self.exec(format!(
            "INSERT INTO times (time_id) VALUES ('{}')",
            date.format("%Y-%m-%d")
        ))
        .await;
    }

    pub async fn seed_sale(&self, prod_id: i32, cust_id: i32, date: NaiveDate, quantity: i32) {
        self.exec(format!(
            "INSERT INTO sales (prod_id, cust_id, time_id, channel_id, promo_id, quantity_sold, amount_sold) \
             VALUES ({prod_id}, {cust_id}, '{}', 3, 999, {quantity}, {}.0)",
            date.format("%Y-%m-%d"),
            quantity * 10
        ))
        .await;
    }

    pub async fn count(&self, table: &str) -> i64 {
        let row = self
            .db()
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                format!("SELECT COUNT(*) AS n FROM {table}"),
            ))
            .await
            .expect("count query")
            .expect("count row");
        row.try_get("", "n").expect("count column")
    }

    /// Send a request against the router with an optional JSON body.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let body = body.map(|json| serde_json::to_vec(&json).expect("serialize json request body"));
        self.request_raw(method, uri, body).await
    }

    /// Send raw bytes as a JSON request body.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: Option<Vec<u8>>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(bytes) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(bytes)
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Send a request and decode the JSON response.
    pub async fn request_json(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        (status, response_json(response).await)
    }
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("parse response body")
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}
