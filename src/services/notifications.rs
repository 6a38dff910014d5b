//! Booking notifications
//!
//! A notifier is told about every committed booking. Delivery runs on its own
//! task after the booking is persisted and never affects the booking result.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::{email::EmailNotifier, slots::BusinessHours};
use crate::{
    config::{AppConfig, NotificationChannel, NotificationsConfig},
    error::{AppError, AppResult},
    models::{Booking, Doctor, Service},
};

/// Payload handed to notifiers
#[derive(Debug, Clone, Serialize)]
pub struct BookingNotification {
    pub booking: Booking,
    pub service: Service,
    pub doctor: Doctor,
}

/// Delivery channel for booking notifications
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &BookingNotification) -> AppResult<()>;
}

/// Records notifications in the log only
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &BookingNotification) -> AppResult<()> {
        tracing::info!(
            booking_reference = %notification.booking.booking_reference,
            patient = %notification.booking.patient_email,
            doctor = %notification.doctor.email,
            service = %notification.service.name,
            "Booking notification prepared"
        );
        Ok(())
    }
}

/// Posts `{booking, service, doctor}` as JSON to an HTTP endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl WebhookNotifier {
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build webhook client: {}", e)))?;
        Ok(Self { client, url, token })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, notification: &BookingNotification) -> AppResult<()> {
        let mut request = self.client.post(&self.url).json(notification);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token);
        }

        request
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| AppError::Notification(format!("Webhook delivery failed: {}", e)))?;
        Ok(())
    }
}

/// Build the notifier selected by `notifications.channel`
pub fn build_notifier(config: &AppConfig, hours: &BusinessHours) -> AppResult<Arc<dyn Notifier>> {
    let notifier: Arc<dyn Notifier> = match config.notifications.channel {
        NotificationChannel::Log => Arc::new(LogNotifier),
        NotificationChannel::Email => Arc::new(EmailNotifier::new(
            config.email.clone(),
            config.clinic.clone(),
            hours.offset(),
        )),
        NotificationChannel::Webhook => {
            let url = config.notifications.webhook_url.clone().ok_or_else(|| {
                AppError::Internal("notifications.webhook_url is required for the webhook channel".to_string())
            })?;
            Arc::new(WebhookNotifier::new(
                url,
                config.notifications.webhook_token.clone(),
                Duration::from_secs(config.notifications.webhook_timeout_secs),
            )?)
        }
    };
    Ok(notifier)
}

/// Runs notifier calls off the request path with a bounded retry policy
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    max_attempts: u32,
    backoff: Duration,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: &NotificationsConfig) -> Self {
        Self {
            notifier,
            max_attempts: config.max_attempts.max(1),
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// Deliver on a detached task. The handle resolves to whether delivery succeeded.
    pub fn dispatch(&self, notification: BookingNotification) -> JoinHandle<bool> {
        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.deliver(&notification).await })
    }

    /// Try the notifier up to `max_attempts` times, doubling the pause between attempts.
    /// Failures are logged, never returned.
    pub async fn deliver(&self, notification: &BookingNotification) -> bool {
        let reference = &notification.booking.booking_reference;
        let mut pause = self.backoff;

        for attempt in 1..=self.max_attempts {
            match self.notifier.notify(notification).await {
                Ok(()) => {
                    tracing::debug!(booking_reference = %reference, attempt, "Booking notification delivered");
                    return true;
                }
                Err(e) if attempt < self.max_attempts => {
                    tracing::warn!(booking_reference = %reference, attempt, error = %e, "Notification failed, retrying");
                    tokio::time::sleep(pause).await;
                    pause *= 2;
                }
                Err(e) => {
                    tracing::error!(booking_reference = %reference, attempt, error = %e, "Notification failed");
                }
            }
        }
        false
    }
}
