//! Data models for bizpulse.
//!
//! The monitors only ever see read-only snapshots of the dashboard's
//! operational entities. Everything here is plain data: the backends in
//! [`crate::storage`] and [`crate::data_sources`] produce it, the monitors in
//! [`crate::monitor`] consume it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status value of a product that takes part in stock checks.
pub const PRODUCT_STATUS_ACTIVE: &str = "active";

/// Status value of a user allowed to receive notifications.
pub const USER_STATUS_ACTIVE: &str = "active";

/// Status value of a visit that counts towards recency.
pub const VISIT_STATUS_COMPLETED: &str = "completed";

/// An active product as seen by the stock monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,

    /// Units currently in stock. Never negative.
    pub stock: i64,

    /// At or below this many units (and above zero) the product is low on stock.
    pub low_stock_threshold: i64,
}

/// Stock classification of a single product.
///
/// Every product is in exactly one level. `OutOfStock` wins over `Low`
/// when the threshold is zero or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    OutOfStock,
    Low,
    Healthy,
}

impl Product {
    pub fn stock_level(&self) -> StockLevel {
        if self.stock == 0 {
            StockLevel::OutOfStock
        } else if self.stock > 0 && self.stock <= self.low_stock_threshold {
            StockLevel::Low
        } else {
            StockLevel::Healthy
        }
    }
}

/// Dashboard user role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Seller,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Seller => "seller",
            Role::Technician => "technician",
        }
    }
}

/// A user that can be the target of a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetUser {
    /// Identifier of the user in the platform's auth system.
    pub auth_user_id: String,
}

/// A completed visit joined with the client it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitWithClient {
    pub id: String,
    pub client_id: String,

    /// Auth id of the seller owning the client.
    pub seller_id: String,

    pub scheduled_at: DateTime<Utc>,

    /// Contact name of the client, used in messages.
    pub client_name: String,
}

/// Kind of a notification, as understood by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Alert,
    Warning,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Alert => "alert",
            NotificationKind::Warning => "warning",
        }
    }
}

/// A request to create one notification for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationRequest {
    pub target_user_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

/// Outcome of a stock check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StockReport {
    pub products_checked: usize,
    pub out_of_stock_count: usize,
    pub low_stock_count: usize,
    pub notifications_created: usize,
}

/// Outcome of a visit recency run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisitReport {
    /// Clients with at least one completed visit.
    pub clients_checked: usize,
    pub notifications_created: usize,
}

/// Response body for `POST /check-stock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckResponse {
    pub success: bool,
    pub products_checked: usize,
    pub out_of_stock: usize,
    pub low_stock: usize,
    pub notifications_created: usize,
}

impl From<StockReport> for StockCheckResponse {
    fn from(report: StockReport) -> Self {
        Self {
            success: true,
            products_checked: report.products_checked,
            out_of_stock: report.out_of_stock_count,
            low_stock: report.low_stock_count,
            notifications_created: report.notifications_created,
        }
    }
}

/// Response body for `POST /check-visits`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitCheckResponse {
    pub success: bool,
    pub clients_checked: usize,
    pub notifications_created: usize,
}

impl From<VisitReport> for VisitCheckResponse {
    fn from(report: VisitReport) -> Self {
        Self {
            success: true,
            clients_checked: report.clients_checked,
            notifications_created: report.notifications_created,
        }
    }
}

/// Body of a failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
