//! Notification dispatch with per-target failure isolation.
//!
//! A dispatch failure is never a run failure: it is logged, left out of the
//! success count, and the remaining targets are still attempted.

use tracing::{debug, warn};

use crate::data_sources::NotificationSink;
use crate::model::{NotificationKind, NotificationRequest, TargetUser};

/// Create one notification. Returns whether the sink accepted it.
pub async fn dispatch(sink: &dyn NotificationSink, request: &NotificationRequest) -> bool {
    match sink.create_notification(request).await {
        Ok(()) => {
            debug!(
                target_user = %request.target_user_id,
                kind = request.kind.as_str(),
                title = %request.title,
                "Notification created"
            );
            true
        }
        Err(e) => {
            warn!(
                target_user = %request.target_user_id,
                kind = request.kind.as_str(),
                title = %request.title,
                message = %request.message,
                error = %e,
                "Failed to create notification"
            );
            false
        }
    }
}

/// Dispatch every request in order, returning how many succeeded.
pub async fn dispatch_all(sink: &dyn NotificationSink, requests: &[NotificationRequest]) -> usize {
    let mut created = 0;
    for request in requests {
        if dispatch(sink, request).await {
            created += 1;
        }
    }
    created
}

/// One request per target, all carrying the same message.
pub fn broadcast_requests(
    targets: &[TargetUser],
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> Vec<NotificationRequest> {
    targets
        .iter()
        .map(|target| NotificationRequest {
            target_user_id: target.auth_user_id.clone(),
            kind,
            title: title.to_string(),
            message: message.to_string(),
        })
        .collect()
}

/// Send the same message to every target independently.
pub async fn broadcast(
    sink: &dyn NotificationSink,
    targets: &[TargetUser],
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> usize {
    dispatch_all(sink, &broadcast_requests(targets, kind, title, message)).await
}
