//! FallMonitor - Detection-to-Alert Decision
//!
//! ## Responsibilities
//!
//! - Gate alerts on the fall class and the confidence threshold
//! - Enforce the cooldown window between alerts
//! - Send the guardian SMS and record every attempt
//!
//! State is a single last-alert timestamp. The timestamp is refreshed even
//! when SMS delivery fails, so a flapping provider is retried once per
//! cooldown window rather than once per frame. A missing guardian number
//! consumes no cooldown: the first alert after the number is set goes out
//! immediately.

use crate::alert_log::{AlertEvent, AlertLog};
use crate::detector::Detection;
use crate::error::Result;
use crate::guardian_store::GuardianStore;
use crate::sms_client::SmsClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Alert policy
#[derive(Debug, Clone)]
pub struct FallPolicy {
    /// Class label that triggers an alert
    pub fall_class: String,
    /// Minimum confidence for an alert
    pub confidence: f32,
    /// Cooldown between alerts
    pub cooldown: Duration,
    /// SMS body
    pub alert_message: String,
}

/// FallMonitor instance
pub struct FallMonitor {
    guardian: Arc<GuardianStore>,
    sms: Arc<SmsClient>,
    alerts: Arc<AlertLog>,
    policy: FallPolicy,
    last_alert_at: RwLock<Option<Instant>>,
}

impl FallMonitor {
    /// Create new FallMonitor
    pub fn new(
        guardian: Arc<GuardianStore>,
        sms: Arc<SmsClient>,
        alerts: Arc<AlertLog>,
        policy: FallPolicy,
    ) -> Self {
        Self {
            guardian,
            sms,
            alerts,
            policy,
            last_alert_at: RwLock::new(None),
        }
    }

    /// Feed one frame's detections through the alert decision.
    ///
    /// Returns the alert id when an alert was attempted for this frame.
    pub async fn observe(&self, detections: &[Detection]) -> Result<Option<u64>> {
        let Some(fall) = self.best_fall_candidate(detections) else {
            return Ok(None);
        };

        tracing::info!(
            conf = fall.conf,
            label = %fall.label,
            "Fall detected"
        );

        if let Some(remaining) = self.cooldown_remaining().await {
            tracing::debug!(
                remaining_sec = remaining.as_secs(),
                "Alert suppressed, still in cooldown"
            );
            return Ok(None);
        }

        let Some(guardian) = self.guardian.get().await else {
            tracing::warn!("Fall detected but no guardian number set, alert skipped");
            return Ok(None);
        };

        // Cooldown starts with the attempt, delivered or not
        {
            let mut last = self.last_alert_at.write().await;
            *last = Some(Instant::now());
        }

        let (message_sid, delivered) = match self
            .sms
            .send(&guardian.number, &self.policy.alert_message)
            .await
        {
            Ok(message) => (Some(message.sid), true),
            Err(e) => {
                tracing::error!(
                    number = %guardian.number,
                    error = %e,
                    "Failed to send fall alert SMS"
                );
                (None, false)
            }
        };

        let alert_id = self
            .alerts
            .record(AlertEvent {
                alert_id: 0,
                number: guardian.number.clone(),
                label: fall.label.clone(),
                conf: fall.conf,
                message_sid,
                delivered,
                created_at: chrono::Utc::now(),
            })
            .await?;

        tracing::info!(
            alert_id = alert_id,
            number = %guardian.number,
            delivered = delivered,
            "Fall alert recorded"
        );

        Ok(Some(alert_id))
    }

    /// Highest-confidence detection matching the fall class and threshold
    fn best_fall_candidate<'a>(&self, detections: &'a [Detection]) -> Option<&'a Detection> {
        detections
            .iter()
            .filter(|d| d.label == self.policy.fall_class && d.conf >= self.policy.confidence)
            .max_by(|a, b| a.conf.total_cmp(&b.conf))
    }

    /// Time left in the cooldown window, None when expired
    pub async fn cooldown_remaining(&self) -> Option<Duration> {
        let last = (*self.last_alert_at.read().await)?;
        let elapsed = last.elapsed();
        if elapsed < self.policy.cooldown {
            Some(self.policy.cooldown - elapsed)
        } else {
            None
        }
    }

    /// Alert policy in effect
    pub fn policy(&self) -> &FallPolicy {
        &self.policy
    }
}
