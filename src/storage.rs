//! SQLite storage backend for bizpulse.
//!
//! Mirrors the handful of dashboard tables the monitors need, and the
//! `notifications` table they write to. Timestamps are stored as Unix
//! milliseconds.
//!
//! This backend is used for local runs and tests. Production deployments
//! normally point at the managed platform through
//! [`crate::data_sources::RestClient`].

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};

use crate::data_sources::{EntityReader, NotificationSink};
use crate::error::{ReadError, SinkError};
use crate::model::{
    NotificationRequest, PRODUCT_STATUS_ACTIVE, Product, Role, TargetUser,
    USER_STATUS_ACTIVE, VISIT_STATUS_COMPLETED, VisitWithClient,
};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

/// A notification row as persisted by [`Storage::create_notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNotification {
    pub id: i64,
    pub target_user_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:bizpulse.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS products (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                stock INTEGER NOT NULL CHECK (stock >= 0),
                low_stock_threshold INTEGER NOT NULL CHECK (low_stock_threshold >= 0),
                status TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS clients (
                id TEXT PRIMARY KEY,
                contact_name TEXT NOT NULL,
                seller_id TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS visits (
                id TEXT PRIMARY KEY,
                client_id TEXT NOT NULL REFERENCES clients(id),
                seller_id TEXT NOT NULL,
                scheduled_at INTEGER NOT NULL,
                status TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS users (
                auth_user_id TEXT PRIMARY KEY,
                role TEXT NOT NULL,
                status TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id TEXT NOT NULL,
                type TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                read INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )
            "#,
            // Completed-visit scans are ordered by time
            r#"
            CREATE INDEX IF NOT EXISTS idx_visits_status_scheduled_at
            ON visits(status, scheduled_at)
            "#,
            r#"
            CREATE INDEX IF NOT EXISTS idx_users_role_status
            ON users(role, status)
            "#,
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Insert or replace a product.
    pub async fn upsert_product(&self, product: &Product, status: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO products (id, name, stock, low_stock_threshold, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.stock)
        .bind(product.low_stock_threshold)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a client owned by `seller_id`.
    pub async fn upsert_client(
        &self,
        id: &str,
        contact_name: &str,
        seller_id: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO clients (id, contact_name, seller_id)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(contact_name)
        .bind(seller_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a visit.
    pub async fn upsert_visit(
        &self,
        id: &str,
        client_id: &str,
        seller_id: &str,
        scheduled_at: DateTime<Utc>,
        status: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO visits (id, client_id, seller_id, scheduled_at, status)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(client_id)
        .bind(seller_id)
        .bind(scheduled_at.timestamp_millis())
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace a user.
    pub async fn upsert_user(
        &self,
        auth_user_id: &str,
        role: Role,
        status: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO users (auth_user_id, role, status)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(auth_user_id)
        .bind(role.as_str())
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Notifications addressed to a user, oldest first.
    pub async fn notifications_for(
        &self,
        user_id: &str,
    ) -> anyhow::Result<Vec<StoredNotification>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, type, title, message, read, created_at
            FROM notifications
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let notifications = rows
            .iter()
            .map(|row| -> Result<StoredNotification, ReadError> {
                Ok(StoredNotification {
                    id: row.try_get("id")?,
                    target_user_id: row.try_get("user_id")?,
                    kind: row.try_get("type")?,
                    title: row.try_get("title")?,
                    message: row.try_get("message")?,
                    read: row.try_get("read")?,
                    created_at: from_millis(row.try_get("created_at")?)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notifications)
    }

    /// Total number of notification rows.
    pub async fn notification_count(&self) -> anyhow::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM notifications")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.try_get("total")?)
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, ReadError> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| ReadError::Decode(format!("timestamp out of range: {ms}")))
}

fn product_from_row(row: &SqliteRow) -> Result<Product, ReadError> {
    Ok(Product {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        stock: row.try_get("stock")?,
        low_stock_threshold: row.try_get("low_stock_threshold")?,
    })
}

fn visit_from_row(row: &SqliteRow) -> Result<VisitWithClient, ReadError> {
    Ok(VisitWithClient {
        id: row.try_get("id")?,
        client_id: row.try_get("client_id")?,
        seller_id: row.try_get("seller_id")?,
        scheduled_at: from_millis(row.try_get("scheduled_at")?)?,
        client_name: row.try_get("contact_name")?,
    })
}

#[async_trait]
impl EntityReader for Storage {
    async fn list_active_products(&self) -> Result<Vec<Product>, ReadError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, stock, low_stock_threshold
            FROM products
            WHERE status = ?
            ORDER BY name
            "#,
        )
        .bind(PRODUCT_STATUS_ACTIVE)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(product_from_row).collect()
    }

    async fn list_active_users_by_role(&self, role: Role) -> Result<Vec<TargetUser>, ReadError> {
        let rows = sqlx::query(
            r#"
            SELECT auth_user_id
            FROM users
            WHERE role = ? AND status = ?
            ORDER BY auth_user_id
            "#,
        )
        .bind(role.as_str())
        .bind(USER_STATUS_ACTIVE)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<TargetUser, ReadError> {
                Ok(TargetUser {
                    auth_user_id: row.try_get("auth_user_id")?,
                })
            })
            .collect()
    }

    async fn list_completed_visits_with_client(&self) -> Result<Vec<VisitWithClient>, ReadError> {
        let rows = sqlx::query(
            r#"
            SELECT v.id, v.client_id, v.seller_id, v.scheduled_at, c.contact_name
            FROM visits v
            JOIN clients c ON c.id = v.client_id
            WHERE v.status = ?
            ORDER BY v.scheduled_at DESC
            "#,
        )
        .bind(VISIT_STATUS_COMPLETED)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(visit_from_row).collect()
    }
}

#[async_trait]
impl NotificationSink for Storage {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<(), SinkError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, type, title, message, read, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&request.target_user_id)
        .bind(request.kind.as_str())
        .bind(&request.title)
        .bind(&request.message)
        .bind(Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
