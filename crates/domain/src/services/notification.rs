//! Meeting notifications.
//!
//! Delivery (push, email, SMS) belongs to an external dispatcher; the
//! lifecycle manager only hands it a fixed payload and never waits for the
//! outcome.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::MeetingRecord;

/// Notification type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    MeetingRequested,
    MeetingConfirmed,
    MeetingCancelled,
    MeetingRejected,
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::MeetingRequested => write!(f, "meeting_requested"),
            NotificationType::MeetingConfirmed => write!(f, "meeting_confirmed"),
            NotificationType::MeetingCancelled => write!(f, "meeting_cancelled"),
            NotificationType::MeetingRejected => write!(f, "meeting_rejected"),
        }
    }
}

/// Payload handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingNotification {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub ice_id: String,
    pub meeting_code: String,
    pub recipient_id: String,
    pub requestor_id: String,
    pub invitee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meeting_slot: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    pub triggered_by: String,
    pub timestamp: DateTime<Utc>,
}

impl MeetingNotification {
    pub fn for_meeting(
        notification_type: NotificationType,
        meeting: &MeetingRecord,
        recipient_id: &str,
        triggered_by: &str,
    ) -> Self {
        Self {
            notification_type,
            ice_id: meeting.ice_id.clone(),
            meeting_code: meeting.meeting_code.clone(),
            recipient_id: recipient_id.to_string(),
            requestor_id: meeting.requestor_id.clone(),
            invitee_id: meeting.invitee_id.clone(),
            meeting_slot: meeting.request_meeting_slot,
            remarks: meeting.remarks.clone(),
            triggered_by: triggered_by.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Result of a notification send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// Notification was handed to the dispatcher.
    Sent,
    /// Dispatch failed; the meeting operation is unaffected.
    Failed(String),
    /// Notifications are disabled.
    Skipped,
}

/// Notification dispatcher seam.
#[async_trait::async_trait]
pub trait MeetingNotifier: Send + Sync {
    async fn notify(&self, payload: MeetingNotification) -> NotificationResult;
}

/// Dispatcher that only logs notifications.
///
/// Used when no external dispatcher is configured, and in tests.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    pub disabled: bool,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier that reports every send as failed.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            disabled: false,
        }
    }

    pub fn disabled() -> Self {
        Self {
            simulate_failure: false,
            disabled: true,
        }
    }
}

#[async_trait::async_trait]
impl MeetingNotifier for LogNotifier {
    async fn notify(&self, payload: MeetingNotification) -> NotificationResult {
        if self.disabled {
            return NotificationResult::Skipped;
        }

        if self.simulate_failure {
            tracing::warn!(
                recipient_id = %payload.recipient_id,
                meeting_code = %payload.meeting_code,
                "Log notifier simulating failure"
            );
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            notification_type = %payload.notification_type,
            recipient_id = %payload.recipient_id,
            meeting_code = %payload.meeting_code,
            ice_id = %payload.ice_id,
            triggered_by = %payload.triggered_by,
            "Would dispatch meeting notification"
        );

        NotificationResult::Sent
    }
}

/// Spawns delivery of `payload` without waiting for it.
pub fn dispatch(notifier: &Arc<dyn MeetingNotifier>, payload: MeetingNotification) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        let meeting_code = payload.meeting_code.clone();
        let notification_type = payload.notification_type;
        match notifier.notify(payload).await {
            NotificationResult::Failed(reason) => tracing::warn!(
                meeting_code = %meeting_code,
                notification_type = %notification_type,
                reason = %reason,
                "Meeting notification failed"
            ),
            result => tracing::debug!(
                meeting_code = %meeting_code,
                notification_type = %notification_type,
                result = ?result,
                "Meeting notification dispatched"
            ),
        }
    });
}

/// Notifier that keeps every payload, for asserting on fire-and-forget sends.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingNotifier {
    pub sent: tokio::sync::Mutex<Vec<MeetingNotification>>,
}

#[cfg(test)]
impl RecordingNotifier {
    /// Waits briefly for spawned sends to land, then returns what was recorded.
    pub async fn settled(&self, expected: usize) -> Vec<MeetingNotification> {
        for _ in 0..50 {
            if self.sent.lock().await.len() >= expected {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        self.sent.lock().await.clone()
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl MeetingNotifier for RecordingNotifier {
    async fn notify(&self, payload: MeetingNotification) -> NotificationResult {
        self.sent.lock().await.push(payload);
        NotificationResult::Sent
    }
}
