//! NotificationSender processor.
//!
//! The NotificationSender is responsible for:
//! - Receiving `DrawNotification` from the engine's channel
//! - Turning each one into a `NotificationPayload`
//! - Signing the JSON body with the gateway secret and POSTing it to the
//!   gateway webhook
//! - Retrying failed deliveries with exponential backoff (2^0 to 2^6
//!   seconds) until `max_attempts` is used up
//!
//! Without a webhook URL notifications are logged and dropped. Deliveries run
//! as separate tasks so one slow gateway response never delays the next
//! notification.

use crate::config::{ConfigStore, ConfigWatcher, NotifierConfig};
use crate::entities::WinnerAssignment;
use crate::events::{DrawNotification, DrawNotificationReceiver};
use luckydraw_sdk::objects::{NotificationPayload, WinnerResponse};
use luckydraw_sdk::signature::{SignedObject, SIGNATURE_HEADER};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

/// Cap for the backoff exponent (2^6 = 64 seconds).
const MAX_BACKOFF_EXPONENT: u32 = 6;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook delivery failed with status {status}: {body}")]
    DeliveryFailed { status: u16, body: String },

    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts")]
    GaveUp { attempts: u32 },
}

pub struct NotificationSender {
    notification_rx: DrawNotificationReceiver,
    shutdown_rx: watch::Receiver<bool>,
    config: ConfigWatcher<NotifierConfig>,
    http_client: reqwest::Client,
}

impl NotificationSender {
    pub fn new(
        notification_rx: DrawNotificationReceiver,
        shutdown_rx: watch::Receiver<bool>,
        config: ConfigStore<NotifierConfig>,
    ) -> Self {
        Self {
            notification_rx,
            shutdown_rx,
            config: config.subscribe(),
            http_client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Run until shutdown is signaled or every engine handle is gone.
    ///
    /// Deliveries still retrying at shutdown are aborted.
    pub async fn run(mut self) {
        info!("NotificationSender started");
        let mut deliveries = JoinSet::new();
        let mut watching_config = true;

        loop {
            tokio::select! {
                biased;

                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("NotificationSender received shutdown signal");
                        break;
                    }
                }

                received = self.notification_rx.recv() => {
                    let Some(notification) = received else {
                        info!("Notification channel closed");
                        break;
                    };
                    self.dispatch(notification, &mut deliveries);
                }

                changed = self.config.changed(), if watching_config => match changed {
                    Ok(config) => info!(
                        webhook = config.webhook_url.is_some(),
                        max_attempts = config.max_attempts,
                        "Notifier configuration reloaded"
                    ),
                    Err(_) => watching_config = false,
                },

                Some(_) = deliveries.join_next(), if !deliveries.is_empty() => {}
            }
        }

        deliveries.shutdown().await;
        info!("NotificationSender shutdown complete");
    }

    fn dispatch(&self, notification: DrawNotification, deliveries: &mut JoinSet<()>) {
        let config = self.config.current();
        let event_id = notification.event_id();
        let kind = notification.kind();
        let Some(url) = config.webhook_url.clone() else {
            info!(event_id = %event_id, kind, "No webhook configured, notification dropped");
            return;
        };

        let payload = to_payload(notification, now_unix());
        let client = self.http_client.clone();
        let key = config.signing_key.clone();
        let max_attempts = config.max_attempts;
        deliveries.spawn(async move {
            match deliver(&client, &url, &key, max_attempts, payload).await {
                Ok(()) => debug!(event_id = %event_id, kind, "Notification delivered"),
                Err(e) => error!(event_id = %event_id, kind, error = %e, "Notification dropped"),
            }
        });
    }
}

fn now_unix() -> i64 {
    time::OffsetDateTime::now_utc().unix_timestamp()
}

fn winner_response(winner: WinnerAssignment) -> WinnerResponse {
    WinnerResponse {
        user_id: winner.user_id,
        display_name: winner.display_name,
        prize: winner.prize,
    }
}

/// Wire form of a notification.
pub fn to_payload(notification: DrawNotification, timestamp: i64) -> NotificationPayload {
    match notification {
        DrawNotification::Resolved { event, winners } => NotificationPayload::DrawResolved {
            event_id: event.id,
            title: event.title,
            winners: winners.into_iter().map(winner_response).collect(),
            timestamp,
        },
        DrawNotification::WinnerNotice {
            event_id,
            title,
            winner,
        } => NotificationPayload::WinnerNotice {
            event_id,
            title,
            user_id: winner.user_id,
            display_name: winner.display_name,
            prize: winner.prize,
            timestamp,
        },
        DrawNotification::AutoCancelled {
            event,
            participant_count,
        } => NotificationPayload::DrawCancelled {
            event_id: event.id,
            title: event.title,
            prize_count: event.prize_count,
            participant_count,
            timestamp,
        },
    }
}

/// POST `payload` until the gateway accepts it or `max_attempts` is reached.
///
/// The body is re-signed for every attempt so the signature timestamp stays
/// fresh across long backoffs.
async fn deliver(
    client: &reqwest::Client,
    url: &Url,
    key: &[u8],
    max_attempts: u32,
    payload: NotificationPayload,
) -> Result<(), DispatchError> {
    let event_id = payload.event_id();
    let max_attempts = max_attempts.max(1);
    for attempt in 0..max_attempts {
        let signed = SignedObject::new(payload.clone(), key)?;
        match send_signed(client, url, &signed).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                warn!(
                    event_id = %event_id,
                    attempt = attempt + 1,
                    max_attempts,
                    error = %e,
                    "Notification delivery failed"
                );
            }
        }
        if attempt + 1 < max_attempts {
            tokio::time::sleep(calculate_retry_delay(attempt)).await;
        }
    }
    Err(DispatchError::GaveUp {
        attempts: max_attempts,
    })
}

async fn send_signed(
    client: &reqwest::Client,
    url: &Url,
    signed: &SignedObject<NotificationPayload>,
) -> Result<(), DispatchError> {
    let response = client
        .post(url.clone())
        .header("Content-Type", "application/json")
        .header(SIGNATURE_HEADER, signed.to_header())
        .body(signed.json.clone())
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::DeliveryFailed {
            status: status.as_u16(),
            body,
        })
    }
}

/// Delay before the next attempt: 2^retry_count seconds, capped.
pub fn calculate_retry_delay(retry_count: u32) -> std::time::Duration {
    let seconds = 2u64.pow(retry_count.min(MAX_BACKOFF_EXPONENT));
    std::time::Duration::from_secs(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DrawEvent, Participation, ResolutionTrigger};
    use crate::events::notification_channel;
    use uuid::Uuid;

    fn event() -> DrawEvent {
        DrawEvent {
            id: Uuid::from_u128(5),
            title: "Giveaway".to_string(),
            prize_pool: vec!["A".to_string(), "B".to_string()],
            prize_count: 2,
            trigger: ResolutionTrigger::ByCount { required: 2 },
            participation: Participation::Direct,
            resolved: true,
            cancelled: false,
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_retry_delay_calculation() {
        assert_eq!(calculate_retry_delay(0), std::time::Duration::from_secs(1));
        assert_eq!(calculate_retry_delay(1), std::time::Duration::from_secs(2));
        assert_eq!(calculate_retry_delay(5), std::time::Duration::from_secs(32));
        assert_eq!(calculate_retry_delay(6), std::time::Duration::from_secs(64));
        // Capped
        assert_eq!(
            calculate_retry_delay(100),
            std::time::Duration::from_secs(64)
        );
    }

    #[test]
    fn test_payload_mapping() {
        let winner = WinnerAssignment {
            event_id: Uuid::from_u128(5),
            user_id: 3,
            display_name: "three".to_string(),
            prize: "A".to_string(),
        };
        let resolved = to_payload(
            DrawNotification::Resolved {
                event: event(),
                winners: vec![winner.clone()],
            },
            100,
        );
        assert_eq!(
            resolved,
            NotificationPayload::DrawResolved {
                event_id: Uuid::from_u128(5),
                title: "Giveaway".to_string(),
                winners: vec![WinnerResponse {
                    user_id: 3,
                    display_name: "three".to_string(),
                    prize: "A".to_string(),
                }],
                timestamp: 100,
            }
        );

        let cancelled = to_payload(
            DrawNotification::AutoCancelled {
                event: event(),
                participant_count: 1,
            },
            100,
        );
        assert!(matches!(
            cancelled,
            NotificationPayload::DrawCancelled {
                prize_count: 2,
                participant_count: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_run_without_webhook_drains_and_stops() {
        let (tx, rx) = notification_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = ConfigStore::new(NotifierConfig::default());
        let sender = NotificationSender::new(rx, shutdown_rx, config);
        let handle = tokio::spawn(sender.run());

        tx.send(DrawNotification::AutoCancelled {
            event: event(),
            participant_count: 0,
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
        drop(shutdown_tx);
    }
}
