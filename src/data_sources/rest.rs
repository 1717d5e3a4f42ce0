//! PostgREST client for the managed backend platform.
//!
//! The dashboard's tables live behind the platform's auto-generated REST
//! API. The monitors run with the service key, which bypasses row-level
//! security, so every active product, user and visit is visible.
//!
//! The platform caps how many rows one response may carry and truncates
//! silently. Reads therefore page with `Range` headers and ask for an exact
//! count, so a table larger than the cap is read in full or not at all.
//!
//! # API Reference
//!
//! See: <https://postgrest.org/en/stable/references/api/tables_views.html>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use reqwest::header::CONTENT_RANGE;
use tracing::debug;

use crate::data_sources::{EntityReader, NotificationSink};
use crate::error::{ReadError, SinkError};
use crate::model::{
    NotificationRequest, PRODUCT_STATUS_ACTIVE, Product, Role, TargetUser, USER_STATUS_ACTIVE,
    VISIT_STATUS_COMPLETED, VisitWithClient,
};

/// Path prefix of the REST API on the platform host.
const REST_PATH: &str = "rest/v1";

/// Rows requested per page. Matches the platform's default response cap.
const DEFAULT_PAGE_SIZE: usize = 1000;

/// Client for the platform's table API, authenticated with the service key.
#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
    page_size: usize,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    auth_user_id: String,
}

#[derive(Debug, Deserialize)]
struct VisitRow {
    id: String,
    client_id: String,
    seller_auth_id: String,
    scheduled_at: DateTime<Utc>,
    client: Option<ClientRow>,
}

#[derive(Debug, Deserialize)]
struct ClientRow {
    contact_name: String,
}

impl RestClient {
    /// Create a client for the platform at `base_url` (e.g. "https://abc.example.co").
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Request `page_size` rows per page instead of the default.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn table_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/{}/{}", self.base_url, REST_PATH, table)
        } else {
            format!("{}/{}/{}?{}", self.base_url, REST_PATH, table, query)
        }
    }

    fn products_url(&self) -> String {
        self.table_url(
            "products",
            &format!(
                "select=id,name,stock,low_stock_threshold&status=eq.{}&order=id",
                urlencoding::encode(PRODUCT_STATUS_ACTIVE)
            ),
        )
    }

    fn users_url(&self, role: Role) -> String {
        self.table_url(
            "users",
            &format!(
                "select=auth_user_id&role=eq.{}&status=eq.{}&order=auth_user_id",
                urlencoding::encode(role.as_str()),
                urlencoding::encode(USER_STATUS_ACTIVE)
            ),
        )
    }

    fn visits_url(&self) -> String {
        self.table_url(
            "visits",
            &format!(
                "select=id,client_id,seller_auth_id,scheduled_at,client:clients(id,contact_name)\
                 &status=eq.{}&order=scheduled_at.desc,id.desc",
                urlencoding::encode(VISIT_STATUS_COMPLETED)
            ),
        )
    }

    /// Read every row behind `url`, one page at a time.
    ///
    /// Paging stops once the reported total is reached. Without a total it
    /// stops at the first page shorter than requested. A page that comes back
    /// empty before the reported total fails the read.
    async fn get_rows<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>, ReadError> {
        let mut rows: Vec<T> = Vec::new();

        loop {
            let offset = rows.len();
            let response = self
                .client
                .get(url)
                .header("apikey", &self.service_key)
                .bearer_auth(&self.service_key)
                .header("Prefer", "count=exact")
                .header("Range-Unit", "items")
                .header("Range", format!("{}-{}", offset, offset + self.page_size - 1))
                .send()
                .await?;

            // 206 Partial Content is the normal answer to a ranged read
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ReadError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            let total = response
                .headers()
                .get(CONTENT_RANGE)
                .and_then(|value| value.to_str().ok())
                .and_then(content_range_total);

            let page = response.json::<Vec<T>>().await?;
            let fetched = page.len();
            rows.extend(page);

            debug!(url, offset, fetched, ?total, "Read page");

            match total {
                Some(total) if rows.len() >= total => break,
                Some(total) if fetched == 0 => {
                    return Err(ReadError::Incomplete {
                        expected: total,
                        received: rows.len(),
                    });
                }
                Some(_) => {}
                None if fetched < self.page_size => break,
                None => {}
            }
        }

        Ok(rows)
    }
}

/// Total row count from a `Content-Range` value such as `0-999/1500` or `*/0`.
///
/// Returns `None` when the total is unknown (`0-999/*`) or the value is malformed.
fn content_range_total(value: &str) -> Option<usize> {
    let (_, total) = value.rsplit_once('/')?;
    total.trim().parse().ok()
}

#[async_trait]
impl EntityReader for RestClient {
    async fn list_active_products(&self) -> Result<Vec<Product>, ReadError> {
        self.get_rows(&self.products_url()).await
    }

    async fn list_active_users_by_role(&self, role: Role) -> Result<Vec<TargetUser>, ReadError> {
        let rows: Vec<UserRow> = self.get_rows(&self.users_url(role)).await?;

        Ok(rows
            .into_iter()
            .map(|row| TargetUser {
                auth_user_id: row.auth_user_id,
            })
            .collect())
    }

    async fn list_completed_visits_with_client(&self) -> Result<Vec<VisitWithClient>, ReadError> {
        let rows: Vec<VisitRow> = self.get_rows(&self.visits_url()).await?;

        // A visit whose client row is gone has nobody to report on
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let Some(client) = row.client else {
                    debug!(visit_id = %row.id, "Skipping visit without client");
                    return None;
                };
                Some(VisitWithClient {
                    id: row.id,
                    client_id: row.client_id,
                    seller_id: row.seller_auth_id,
                    scheduled_at: row.scheduled_at,
                    client_name: client.contact_name,
                })
            })
            .collect())
    }
}

#[async_trait]
impl NotificationSink for RestClient {
    async fn create_notification(&self, request: &NotificationRequest) -> Result<(), SinkError> {
        let body = json!({
            "user_id": request.target_user_id,
            "type": request.kind,
            "title": request.title,
            "message": request.message,
        });

        let response = self
            .client
            .post(self.table_url("notifications", ""))
            .header("apikey", &self.service_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(&self.service_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
