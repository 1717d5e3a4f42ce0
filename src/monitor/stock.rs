//! Stock monitor.
//!
//! Classifies active products into out-of-stock and low-stock, builds one
//! aggregate message per class, and sends each message to every active admin.

use tracing::{info, instrument};

use crate::data_sources::{EntityReader, NotificationSink};
use crate::error::MonitorError;
use crate::model::{
    NotificationKind, NotificationRequest, Product, Role, StockLevel, StockReport, TargetUser,
};
use crate::monitor::dispatch::{broadcast_requests, dispatch_all};
use crate::monitor::run::{Run, RunPhase};

/// How many product names an aggregate message lists before eliding the rest.
const NAMED_PRODUCTS_LIMIT: usize = 3;

/// Appended to a product list when more products were left out.
const MORE_MARKER: &str = "...";

/// Active products split by stock level. Read order is preserved.
#[derive(Debug, Default)]
pub struct StockClassification<'a> {
    pub out_of_stock: Vec<&'a Product>,
    pub low_stock: Vec<&'a Product>,
}

/// Partition products into out-of-stock and low-stock. Healthy products are dropped.
pub fn classify(products: &[Product]) -> StockClassification<'_> {
    let mut classification = StockClassification::default();
    for product in products {
        match product.stock_level() {
            StockLevel::OutOfStock => classification.out_of_stock.push(product),
            StockLevel::Low => classification.low_stock.push(product),
            StockLevel::Healthy => {}
        }
    }
    classification
}

/// A title and message pair ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockMessage {
    pub title: String,
    pub message: String,
}

fn product_names(products: &[&Product]) -> String {
    let names: Vec<&str> = products
        .iter()
        .take(NAMED_PRODUCTS_LIMIT)
        .map(|p| p.name.as_str())
        .collect();

    let mut list = names.join(", ");
    if products.len() > NAMED_PRODUCTS_LIMIT {
        list.push_str(MORE_MARKER);
    }
    list
}

/// Message for the out-of-stock class, or `None` when it is empty.
pub fn out_of_stock_message(products: &[&Product]) -> Option<StockMessage> {
    match products {
        [] => None,
        [product] => Some(StockMessage {
            title: "Produto sem estoque".to_string(),
            message: format!("Produto {} está SEM ESTOQUE!", product.name),
        }),
        _ => Some(StockMessage {
            title: "Produtos sem estoque".to_string(),
            message: format!(
                "{} produtos estão SEM ESTOQUE: {}",
                products.len(),
                product_names(products)
            ),
        }),
    }
}

/// Message for the low-stock class, or `None` when it is empty.
pub fn low_stock_message(products: &[&Product]) -> Option<StockMessage> {
    match products {
        [] => None,
        [product] => Some(StockMessage {
            title: "Estoque baixo".to_string(),
            message: format!(
                "Produto {} está com estoque baixo ({} unidades restantes).",
                product.name, product.stock
            ),
        }),
        _ => Some(StockMessage {
            title: "Estoque baixo".to_string(),
            message: format!(
                "{} produtos estão com estoque baixo: {}",
                products.len(),
                product_names(products)
            ),
        }),
    }
}

/// Every notification a stock check should send, given its snapshot.
pub fn evaluate_stock(
    classification: &StockClassification<'_>,
    admins: &[TargetUser],
) -> Vec<NotificationRequest> {
    let mut requests = Vec::new();

    if let Some(msg) = out_of_stock_message(&classification.out_of_stock) {
        requests.extend(broadcast_requests(
            admins,
            NotificationKind::Alert,
            &msg.title,
            &msg.message,
        ));
    }

    if let Some(msg) = low_stock_message(&classification.low_stock) {
        requests.extend(broadcast_requests(
            admins,
            NotificationKind::Warning,
            &msg.title,
            &msg.message,
        ));
    }

    requests
}

/// Run one stock check: read, classify, notify admins.
///
/// Fails only when products or admins cannot be read. Having no admins is a
/// successful run that creates nothing.
#[instrument(skip_all)]
pub async fn check_stock(
    reader: &dyn EntityReader,
    sink: &dyn NotificationSink,
    run: &mut Run,
) -> Result<StockReport, MonitorError> {
    let result = run_stock_check(reader, sink, run).await;
    run.finish(result)
}

async fn run_stock_check(
    reader: &dyn EntityReader,
    sink: &dyn NotificationSink,
    run: &mut Run,
) -> Result<StockReport, MonitorError> {
    run.advance(RunPhase::Reading);
    let products = reader
        .list_active_products()
        .await
        .map_err(MonitorError::read("products"))?;
    let admins = reader
        .list_active_users_by_role(Role::Admin)
        .await
        .map_err(MonitorError::read("admin users"))?;

    run.advance(RunPhase::Evaluating);
    let classification = classify(&products);
    let mut report = StockReport {
        products_checked: products.len(),
        out_of_stock_count: classification.out_of_stock.len(),
        low_stock_count: classification.low_stock.len(),
        notifications_created: 0,
    };

    if admins.is_empty() {
        info!(
            products_checked = report.products_checked,
            "No active admins to notify"
        );
        return Ok(report);
    }

    let requests = evaluate_stock(&classification, &admins);

    run.advance(RunPhase::Dispatching);
    report.notifications_created = dispatch_all(sink, &requests).await;

    info!(
        products_checked = report.products_checked,
        out_of_stock = report.out_of_stock_count,
        low_stock = report.low_stock_count,
        notifications_created = report.notifications_created,
        notifications_attempted = requests.len(),
        "Stock check completed"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::run::RunOutcome;
    use crate::monitor::testing::{FakeBackend, admins, product};
    use chrono::Utc;

    #[test]
    fn test_classification_is_disjoint() {
        let products = vec![
            product("p1", "Bolt", 0, 5),
            product("p2", "Nut", 3, 5),
            product("p3", "Gear", 5, 5),
            product("p4", "Shaft", 6, 5),
            product("p5", "Pin", 0, 0),
        ];

        let classification = classify(&products);
        let out: Vec<&str> = classification
            .out_of_stock
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        let low: Vec<&str> = classification
            .low_stock
            .iter()
            .map(|p| p.id.as_str())
            .collect();

        assert_eq!(out, vec!["p1", "p5"]);
        assert_eq!(low, vec!["p2", "p3"]);
        assert!(out.iter().all(|id| !low.contains(id)));
    }

    #[test]
    fn test_single_out_of_stock_message_names_product() {
        let bolt = product("p1", "Bolt", 0, 5);

        let msg = out_of_stock_message(&[&bolt]).unwrap();

        assert_eq!(msg.message, "Produto Bolt está SEM ESTOQUE!");
    }

    #[test]
    fn test_two_out_of_stock_names_both_without_marker() {
        let bolt = product("p1", "Bolt", 0, 5);
        let nut = product("p2", "Nut", 0, 5);

        let msg = out_of_stock_message(&[&bolt, &nut]).unwrap();

        assert_eq!(msg.message, "2 produtos estão SEM ESTOQUE: Bolt, Nut");
        assert!(!msg.message.ends_with(MORE_MARKER));
    }

    #[test]
    fn test_many_out_of_stock_names_first_three() {
        let products: Vec<Product> = ["Bolt", "Nut", "Gear", "Shaft", "Pin"]
            .iter()
            .enumerate()
            .map(|(i, name)| product(&format!("p{i}"), name, 0, 5))
            .collect();
        let refs: Vec<&Product> = products.iter().collect();

        let msg = out_of_stock_message(&refs).unwrap();

        assert_eq!(msg.message, "5 produtos estão SEM ESTOQUE: Bolt, Nut, Gear...");
        assert!(!msg.message.contains("Shaft"));
    }

    #[test]
    fn test_exactly_three_has_no_marker() {
        let products: Vec<Product> = ["Bolt", "Nut", "Gear"]
            .iter()
            .map(|name| product(name, name, 0, 5))
            .collect();
        let refs: Vec<&Product> = products.iter().collect();

        let msg = out_of_stock_message(&refs).unwrap();

        assert!(msg.message.ends_with("Bolt, Nut, Gear"));
    }

    #[test]
    fn test_low_stock_single_message_has_units() {
        let nut = product("p2", "Nut", 2, 5);

        let msg = low_stock_message(&[&nut]).unwrap();

        assert!(msg.message.contains("Nut"));
        assert!(msg.message.contains("2 unidades"));
        assert!(low_stock_message(&[]).is_none());
    }

    #[tokio::test]
    async fn test_one_out_of_stock_two_admins() {
        let backend = FakeBackend::default()
            .with_products(vec![product("p1", "Bolt", 0, 5), product("p2", "Gear", 50, 5)])
            .with_admins(admins(&["a1", "a2"]));
        let mut run = Run::start("check-stock", Utc::now());

        let report = check_stock(&backend, &backend, &mut run).await.unwrap();

        assert_eq!(
            report,
            StockReport {
                products_checked: 2,
                out_of_stock_count: 1,
                low_stock_count: 0,
                notifications_created: 2,
            }
        );
        let sent = backend.sent_to("a1");
        assert_eq!(sent[0].kind, NotificationKind::Alert);
        assert_eq!(run.phase(), RunPhase::Responding(RunOutcome::Success));
    }

    #[tokio::test]
    async fn test_admin_receiving_both_messages_counts_twice() {
        let backend = FakeBackend::default()
            .with_products(vec![product("p1", "Bolt", 0, 5), product("p2", "Nut", 1, 5)])
            .with_admins(admins(&["a1"]));
        let mut run = Run::start("check-stock", Utc::now());

        let report = check_stock(&backend, &backend, &mut run).await.unwrap();

        assert_eq!(report.notifications_created, 2);
        let kinds: Vec<NotificationKind> = backend.sent_to("a1").iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Alert, NotificationKind::Warning]);
    }

    #[tokio::test]
    async fn test_no_admins_is_a_successful_no_op() {
        let backend = FakeBackend::default().with_products(vec![product("p1", "Bolt", 0, 5)]);
        let mut run = Run::start("check-stock", Utc::now());

        let report = check_stock(&backend, &backend, &mut run).await.unwrap();

        assert_eq!(report.out_of_stock_count, 1);
        assert_eq!(report.notifications_created, 0);
        assert_eq!(backend.sent_count(), 0);
        assert_eq!(run.phase(), RunPhase::Responding(RunOutcome::Success));
    }

    #[tokio::test]
    async fn test_dispatch_failures_only_reduce_the_count() {
        let backend = FakeBackend::default()
            .with_products(vec![product("p1", "Bolt", 0, 5)])
            .with_admins(admins(&["a1", "a2", "a3"]))
            .failing_for("a2");
        let mut run = Run::start("check-stock", Utc::now());

        let report = check_stock(&backend, &backend, &mut run).await.unwrap();

        assert_eq!(report.notifications_created, 2);
        assert_eq!(backend.sent_to("a3").len(), 1);
    }

    #[tokio::test]
    async fn test_product_read_failure_aborts() {
        let backend = FakeBackend::default()
            .with_admins(admins(&["a1"]))
            .failing_products();
        let mut run = Run::start("check-stock", Utc::now());

        let err = check_stock(&backend, &backend, &mut run).await.unwrap_err();

        assert!(err.to_string().contains("products"));
        assert_eq!(backend.sent_count(), 0);
        assert_eq!(run.phase(), RunPhase::Responding(RunOutcome::Failure));
    }

    #[tokio::test]
    async fn test_admin_read_failure_aborts() {
        let backend = FakeBackend::default()
            .with_products(vec![product("p1", "Bolt", 0, 5)])
            .failing_users();
        let mut run = Run::start("check-stock", Utc::now());

        let err = check_stock(&backend, &backend, &mut run).await.unwrap_err();

        assert!(err.to_string().contains("admin users"));
        assert_eq!(backend.sent_count(), 0);
        assert_eq!(run.phase(), RunPhase::Responding(RunOutcome::Failure));
    }

    #[tokio::test]
    async fn test_healthy_stock_sends_nothing() {
        let backend = FakeBackend::default()
            .with_products(vec![product("p1", "Bolt", 40, 5)])
            .with_admins(admins(&["a1"]));
        let mut run = Run::start("check-stock", Utc::now());

        let report = check_stock(&backend, &backend, &mut run).await.unwrap();

        assert_eq!(report.products_checked, 1);
        assert_eq!(report.notifications_created, 0);
    }
}
