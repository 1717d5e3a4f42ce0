//! Read and write seams between the monitors and the dashboard's backend.
//!
//! The monitors never talk to a database or an HTTP API directly. They read
//! snapshots through [`EntityReader`] and emit notifications through
//! [`NotificationSink`]. Two backends implement both traits:
//!
//! - [`crate::storage::Storage`]: a local SQLite database
//! - [`rest::RestClient`]: the managed platform's PostgREST endpoint

pub mod rest;

pub use rest::RestClient;

use async_trait::async_trait;

use crate::error::{ReadError, SinkError};
use crate::model::{NotificationRequest, Product, Role, TargetUser, VisitWithClient};

/// Read-only access to the entities the monitors evaluate.
#[async_trait]
pub trait EntityReader: Send + Sync {
    /// All products with `status == active`.
    async fn list_active_products(&self) -> Result<Vec<Product>, ReadError>;

    /// All users of `role` with `status == active`.
    async fn list_active_users_by_role(&self, role: Role) -> Result<Vec<TargetUser>, ReadError>;

    /// All completed visits joined with their client, newest first.
    async fn list_completed_visits_with_client(&self) -> Result<Vec<VisitWithClient>, ReadError>;
}

/// Creates notifications. Each successful call is one new notification row.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<(), SinkError>;
}
