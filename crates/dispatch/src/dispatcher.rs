//! Concurrent fan-out of canonical events to every configured channel.
//!
//! Each (event, channel) pair becomes one task in a [`JoinSet`]. A send is
//! bounded by the configured channel timeout and runs in its own task, so a
//! panicking sink turns into a failed settlement instead of tearing down the
//! dispatch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use events::{
    format, Channel, ChannelError, DispatchReport, DispatchResult, EmailAddress,
    FormattedMessage, HttpSink, Mailer, MessengerConfig, NotifyConfig, OutcomeRecorder,
    PipelineEventDetail, PipelineStatus, RequestId, WebhookUrl,
};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Sends formatted notifications through the sink ports.
#[derive(Clone)]
pub struct NotificationDispatcher {
    sink: Arc<dyn HttpSink>,
    mailer: Option<Arc<dyn Mailer>>,
    messenger: Arc<MessengerConfig>,
    title: Arc<str>,
    channel_timeout: Duration,
    recorder: Arc<dyn OutcomeRecorder>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher for the channels in `config`.
    ///
    /// `mailer` may be `None` when no email recipient is configured; if one is
    /// configured anyway, every email send settles as a failure.
    pub fn new(
        config: &NotifyConfig,
        sink: Arc<dyn HttpSink>,
        mailer: Option<Arc<dyn Mailer>>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Self {
        Self {
            sink,
            mailer,
            messenger: Arc::new(config.messenger.clone()),
            title: Arc::from(config.title.as_str()),
            channel_timeout: config.channel_timeout,
            recorder,
        }
    }

    /// Sends every detail to every configured channel.
    ///
    /// All sends start before any is awaited. With `wait_for_completion` the
    /// call returns one [`DispatchResult`] per attempted send; otherwise it
    /// returns [`DispatchReport::Accepted`] at once and a background task hands
    /// each settlement to the [`OutcomeRecorder`].
    pub async fn dispatch(
        &self,
        request_id: RequestId,
        details: &[PipelineEventDetail],
        wait_for_completion: bool,
    ) -> DispatchReport {
        let channels = self.messenger.channels();
        let mut sends = JoinSet::new();

        for detail in details {
            let message = Arc::new(format(detail, &self.title));
            for &channel in &channels {
                let send = self.channel_send(channel, Arc::clone(&message));
                sends.spawn(settle(channel, detail.status, self.channel_timeout, send));
            }
        }

        info!(
            %request_id,
            events = details.len(),
            channels = channels.len(),
            sends = sends.len(),
            wait_for_completion,
            "Dispatching notifications"
        );

        if !wait_for_completion {
            let recorder = Arc::clone(&self.recorder);
            tokio::spawn(async move {
                while let Some(joined) = sends.join_next().await {
                    match joined {
                        Ok(result) => recorder.record(request_id, &result),
                        Err(e) => error!(%request_id, error = %e, "Settlement task failed"),
                    }
                }
                debug!(%request_id, "Background dispatch finished");
            });
            return DispatchReport::Accepted;
        }

        let mut results = Vec::with_capacity(sends.len());
        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok(result) => {
                    match result.error() {
                        None => {
                            debug!(%request_id, channel = %result.channel, "Notification delivered")
                        }
                        Some(e) => warn!(
                            %request_id,
                            channel = %e.channel,
                            reason = %e.reason,
                            "Notification failed"
                        ),
                    }
                    results.push(result);
                }
                Err(e) => error!(%request_id, error = %e, "Settlement task failed"),
            }
        }
        DispatchReport::Settled(results)
    }

    /// Builds the owned future that performs one channel send.
    fn channel_send(
        &self,
        channel: Channel,
        message: Arc<FormattedMessage>,
    ) -> impl Future<Output = Result<u16, ChannelError>> + Send + 'static {
        let sink = Arc::clone(&self.sink);
        let mailer = self.mailer.clone();
        let messenger = Arc::clone(&self.messenger);
        async move {
            match channel {
                Channel::Chat => {
                    post_webhook(
                        sink.as_ref(),
                        channel,
                        messenger.chat_webhook.as_ref(),
                        &message.chat_card,
                    )
                    .await
                }
                Channel::Card => {
                    post_webhook(
                        sink.as_ref(),
                        channel,
                        messenger.card_webhook.as_ref(),
                        &message.card_payload,
                    )
                    .await
                }
                Channel::Email => {
                    send_email(
                        mailer.as_deref(),
                        messenger.email_recipient.as_ref(),
                        &message,
                    )
                    .await
                }
            }
        }
    }
}

/// Runs one send under the timeout in its own task and folds every way it can
/// end into a [`DispatchResult`].
async fn settle<F>(
    channel: Channel,
    status: PipelineStatus,
    timeout: Duration,
    send: F,
) -> DispatchResult
where
    F: Future<Output = Result<u16, ChannelError>> + Send + 'static,
{
    let guarded = tokio::spawn(async move {
        match tokio::time::timeout(timeout, send).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ChannelError {
                channel,
                reason: format!("timed out after {}ms", timeout.as_millis()),
            }),
        }
    });

    let outcome = match guarded.await {
        Ok(outcome) => outcome,
        Err(e) => Err(ChannelError {
            channel,
            reason: if e.is_panic() {
                "send task panicked".to_string()
            } else {
                "send task was cancelled".to_string()
            },
        }),
    };

    match outcome {
        Ok(status_code) => DispatchResult::delivered(channel, status, status_code),
        Err(e) => DispatchResult::failed(status, e),
    }
}

async fn post_webhook(
    sink: &dyn HttpSink,
    channel: Channel,
    url: Option<&WebhookUrl>,
    payload: &Value,
) -> Result<u16, ChannelError> {
    let url = url.ok_or_else(|| ChannelError {
        channel,
        reason: "no webhook URL configured".to_string(),
    })?;
    match sink.post(url.as_str(), payload).await {
        Ok(response) if response.status_code == 200 => Ok(response.status_code),
        Ok(response) => Err(ChannelError {
            channel,
            reason: if response.status_text.is_empty() {
                response.status_code.to_string()
            } else {
                response.status_text
            },
        }),
        Err(e) => Err(ChannelError {
            channel,
            reason: e.to_string(),
        }),
    }
}

async fn send_email(
    mailer: Option<&dyn Mailer>,
    recipient: Option<&EmailAddress>,
    message: &FormattedMessage,
) -> Result<u16, ChannelError> {
    let failure = |reason: String| ChannelError {
        channel: Channel::Email,
        reason,
    };
    let mailer = mailer.ok_or_else(|| failure("no mailer configured".to_string()))?;
    let recipient = recipient.ok_or_else(|| failure("no email recipient configured".to_string()))?;
    mailer
        .send(recipient.as_str(), &message.title, &message.email_html)
        .await
        .map_err(|e| failure(e.to_string()))
}
