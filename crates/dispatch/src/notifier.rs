//! The request orchestrator.
//!
//! [`Notifier::post`] runs one inbound delivery through verify, decode,
//! validate, and dispatch. The first fatal error ends processing; nothing is
//! sent for a request that fails any step.

use std::sync::Arc;

use events::{
    DispatchReport, EventNormalizer, HttpSink, IncomingRequest, Mailer, NotifyConfig, NotifyError,
    OutcomeRecorder, PipelineCatalog, RequestId, SignatureVerifier,
};
use serde_json::Value;
use tracing::{info, info_span, warn, Instrument};

use crate::body::decode_body;
use crate::NotificationDispatcher;

/// Per-call options for [`Notifier::post`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostOptions {
    /// Check the request signature before doing anything else.
    pub verify: bool,
    /// Wait for every send to settle and return the results.
    pub wait_for_completion: bool,
}

/// Composes verification, normalization, and dispatch.
#[derive(Clone)]
pub struct Notifier {
    verifier: SignatureVerifier,
    normalizer: EventNormalizer,
    dispatcher: NotificationDispatcher,
    has_channels: bool,
}

impl Notifier {
    /// Builds every component from one configuration value.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Configuration`] if `config` does not validate.
    pub fn new(
        config: &NotifyConfig,
        catalog: Arc<PipelineCatalog>,
        sink: Arc<dyn HttpSink>,
        mailer: Option<Arc<dyn Mailer>>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Result<Self, NotifyError> {
        config.validate()?;
        Ok(Self {
            verifier: SignatureVerifier::from_config(config),
            normalizer: EventNormalizer::from_config(config, catalog),
            dispatcher: NotificationDispatcher::new(config, sink, mailer, recorder),
            has_channels: !config.messenger.is_empty(),
        })
    }

    /// Handles one inbound delivery.
    ///
    /// # Errors
    ///
    /// - [`NotifyError::Authentication`] if `options.verify` is set and the
    ///   signature does not verify.
    /// - [`NotifyError::Parse`] if a raw body is not (base64-encoded) JSON.
    /// - [`NotifyError::Configuration`] if no channel is configured.
    /// - [`NotifyError::Validation`] if the batch yields no canonical events.
    pub async fn post(
        &self,
        request: IncomingRequest,
        options: PostOptions,
    ) -> Result<DispatchReport, NotifyError> {
        let request_id = RequestId::new_random();
        let span = info_span!(
            "notify_request",
            %request_id,
            verify = options.verify,
            wait_for_completion = options.wait_for_completion
        );
        self.handle(request_id, request, options)
            .instrument(span)
            .await
    }

    async fn handle(
        &self,
        request_id: RequestId,
        request: IncomingRequest,
        options: PostOptions,
    ) -> Result<DispatchReport, NotifyError> {
        if options.verify && !self.verifier.verify(&request) {
            warn!("Request signature rejected");
            return Err(NotifyError::Authentication);
        }

        let body = request
            .body
            .as_ref()
            .map(decode_body)
            .transpose()
            .inspect_err(|e| warn!(error = %e, "Request body rejected"))?
            .unwrap_or(Value::Null);

        if !self.has_channels {
            warn!("No notification method configured");
            return Err(NotifyError::configuration(
                "No notification method configured",
            ));
        }

        let details = self
            .normalizer
            .validate_batch(&body)
            .inspect_err(|e| warn!(error = %e, "Batch rejected"))?;
        info!(events = details.len(), "Batch validated");

        Ok(self
            .dispatcher
            .dispatch(request_id, &details, options.wait_for_completion)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingMailer, RecordingSink};
    use crate::TracingRecorder;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine as _;
    use events::{
        ClientId, EmailAddress, Headers, MessengerConfig, OrganizationName, PipelineId,
        PipelineRecord, ValidationFailure, WebhookUrl,
    };
    use hmac::{Hmac, Mac};
    use serde_json::json;
    use sha2::Sha256;

    const SECRET: &str = "s3cret";

    fn body() -> String {
        json!({
            "events": [{
                "event": {
                    "@type": "https://ns.adobe.com/experience/cloudmanager/event/ended",
                    "xdmEventEnvelope:objectType": "https://ns.adobe.com/experience/cloudmanager/pipeline-execution",
                    "activitystreams:published": "2026-10-18T12:00:00Z",
                    "activitystreams:object": {
                        "@id": "https://cloudmanager.adobe.io/api/program/1/pipeline/456/execution/9"
                    }
                }
            }]
        })
        .to_string()
    }

    fn sign(body: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn config() -> NotifyConfig {
        let messenger = MessengerConfig {
            chat_webhook: WebhookUrl::new("https://chat.example.test/hook"),
            card_webhook: None,
            email_recipient: EmailAddress::new("team@example.test"),
        };
        let mut config = NotifyConfig::new(OrganizationName::new("acme").unwrap(), messenger);
        config.from_email = EmailAddress::new("bot@example.test");
        config.key_material = Some(SECRET.to_string());
        config
    }

    fn notifier(config: &NotifyConfig, sink: Arc<RecordingSink>) -> Notifier {
        let catalog = PipelineCatalog::new(vec![PipelineRecord {
            id: PipelineId::new("456").unwrap(),
            name: Some("Deploy".to_string()),
            build_target: None,
            pipeline_type: None,
        }]);
        Notifier::new(
            config,
            Arc::new(catalog),
            sink,
            Some(Arc::new(RecordingMailer::default())),
            Arc::new(TracingRecorder),
        )
        .unwrap()
    }

    fn signed_request(body: &str, signature: &str) -> IncomingRequest {
        let headers: Headers = [("X-Adobe-Signature", signature)].into_iter().collect();
        IncomingRequest::raw(headers, body)
    }

    const WAIT_VERIFIED: PostOptions = PostOptions {
        verify: true,
        wait_for_completion: true,
    };

    #[tokio::test]
    async fn verified_request_is_dispatched() {
        let sink = Arc::new(RecordingSink::ok());
        let body = body();

        let report = notifier(&config(), sink.clone())
            .post(signed_request(&body, &sign(&body)), WAIT_VERIFIED)
            .await
            .unwrap();

        match report {
            DispatchReport::Settled(results) => {
                assert_eq!(results.len(), 2);
                assert!(results.iter().all(|r| r.is_success()));
            }
            DispatchReport::Accepted => panic!("expected settled results"),
        }
        let (_, payload) = sink.calls().remove(0);
        let text = payload["attachments"][0]["blocks"][0]["text"]["text"]
            .as_str()
            .unwrap();
        assert!(text.contains("*NAME*: Deploy"));
    }

    #[tokio::test]
    async fn bad_signature_sends_nothing() {
        let sink = Arc::new(RecordingSink::ok());
        let body = body();
        let mut signature = sign(&body);
        let flipped = if signature.ends_with('0') { '1' } else { '0' };
        signature.pop();
        signature.push(flipped);

        let err = notifier(&config(), sink.clone())
            .post(signed_request(&body, &signature), WAIT_VERIFIED)
            .await
            .unwrap_err();

        assert_eq!(err, NotifyError::Authentication);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn verification_is_skipped_when_not_requested() {
        let sink = Arc::new(RecordingSink::ok());
        let options = PostOptions {
            verify: false,
            wait_for_completion: true,
        };

        let report = notifier(&config(), sink.clone())
            .post(signed_request(&body(), "bogus"), options)
            .await;

        assert!(report.is_ok());
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test]
    async fn base64_body_is_accepted() {
        let sink = Arc::new(RecordingSink::ok());
        let encoded = BASE64.encode(body());
        let options = PostOptions {
            verify: false,
            wait_for_completion: true,
        };

        notifier(&config(), sink.clone())
            .post(IncomingRequest::raw(Headers::new(), encoded), options)
            .await
            .unwrap();

        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test]
    async fn malformed_body_is_a_parse_error() {
        let body = "{not json";
        let err = notifier(&config(), Arc::new(RecordingSink::ok()))
            .post(signed_request(body, &sign(body)), WAIT_VERIFIED)
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::Parse { .. }));
    }

    #[tokio::test]
    async fn no_channels_is_a_configuration_error() {
        let mut config = config();
        config.messenger = MessengerConfig::default();
        let body = body();

        let err = notifier(&config, Arc::new(RecordingSink::ok()))
            .post(signed_request(&body, &sign(&body)), WAIT_VERIFIED)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Configuration error: No notification method configured");
    }

    #[tokio::test]
    async fn client_id_mismatch_processes_nothing() {
        let mut config = config();
        config.client_id = ClientId::new("expected-client");
        let sink = Arc::new(RecordingSink::ok());
        let mut value: Value = serde_json::from_str(&body()).unwrap();
        value["recipient_client_id"] = json!("other-client");
        let options = PostOptions {
            verify: false,
            wait_for_completion: true,
        };

        let err = notifier(&config, sink.clone())
            .post(IncomingRequest::parsed(Headers::new(), value), options)
            .await
            .unwrap_err();

        assert_eq!(err, NotifyError::Validation(ValidationFailure::InvalidClientId));
        assert_eq!(err.to_string(), "Invalid client ID");
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn missing_body_has_no_events() {
        let request = IncomingRequest {
            headers: Headers::new(),
            body: None,
            embedded_key: None,
        };
        let err = notifier(&config(), Arc::new(RecordingSink::ok()))
            .post(request, PostOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err, NotifyError::Validation(ValidationFailure::NoEvents));
    }

    #[tokio::test]
    async fn fire_and_forget_returns_accepted() {
        let body = body();
        let report = notifier(&config(), Arc::new(RecordingSink::ok()))
            .post(
                signed_request(&body, &sign(&body)),
                PostOptions {
                    verify: true,
                    wait_for_completion: false,
                },
            )
            .await
            .unwrap();
        assert_eq!(report, DispatchReport::Accepted);
    }
}
