//! Classification, enrichment, and batch validation of vendor events.
//!
//! A [`RawEvent`] becomes canonical only if its `(@type, objectType)` pair
//! matches one entry of a fixed registry. Enrichment from the
//! [`PipelineCatalog`] is best effort: a pipeline missing from the dataset
//! leaves the optional fields of the [`PipelineEventDetail`] empty and is never
//! an error.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    ClientId, DisplayZone, NotifyConfig, OrganizationName, PipelineCatalog, PipelineEventDetail,
    PipelineId, PipelineStatus, RawEvent, ValidationFailure,
};

/// Prefix every execution object id starts with.
pub const API_PREFIX: &str = "https://cloudmanager.adobe.io/api/";

const PIPELINE_EXECUTION: &str = "https://ns.adobe.com/experience/cloudmanager/pipeline-execution";
const EXECUTION_STEP_STATE: &str =
    "https://ns.adobe.com/experience/cloudmanager/execution-step-state";

/// One registered event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventKind {
    /// Status assigned to events of this kind.
    pub status: PipelineStatus,
    /// Required `@type` URI.
    pub event_type: &'static str,
    /// Required `xdmEventEnvelope:objectType` URI.
    pub object_type: &'static str,
}

/// The registered kinds. Each `(event_type, object_type)` pair is unique.
pub const REGISTRY: [EventKind; 3] = [
    EventKind {
        status: PipelineStatus::Started,
        event_type: "https://ns.adobe.com/experience/cloudmanager/event/started",
        object_type: PIPELINE_EXECUTION,
    },
    EventKind {
        status: PipelineStatus::Ended,
        event_type: "https://ns.adobe.com/experience/cloudmanager/event/ended",
        object_type: PIPELINE_EXECUTION,
    },
    EventKind {
        status: PipelineStatus::Waiting,
        event_type: "https://ns.adobe.com/experience/cloudmanager/event/waiting",
        object_type: EXECUTION_STEP_STATE,
    },
];

/// Returns the registered kind matching both URIs exactly.
pub fn lookup_kind(event_type: &str, object_type: &str) -> Option<&'static EventKind> {
    REGISTRY
        .iter()
        .find(|kind| kind.event_type == event_type && kind.object_type == object_type)
}

/// The execution path carried by an event's object id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPath {
    /// Everything after [`API_PREFIX`], e.g. `program/1/pipeline/2/execution/3`.
    pub url_text: String,
    /// Segment 3 of `url_text`, if present.
    pub pipeline_id: Option<PipelineId>,
}

impl ExecutionPath {
    /// Splits an object id URL. Returns `None` if it does not start with
    /// [`API_PREFIX`] or nothing follows the prefix.
    pub fn parse(object_id: &str) -> Option<Self> {
        let (_, rest) = object_id.split_once(API_PREFIX)?;
        if rest.is_empty() {
            return None;
        }
        let pipeline_id = rest.split('/').nth(3).and_then(PipelineId::new);
        Some(Self {
            url_text: rest.to_string(),
            pipeline_id,
        })
    }
}

/// Turns vendor events into canonical [`PipelineEventDetail`]s.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    org_name: OrganizationName,
    client_id: Option<ClientId>,
    catalog: Arc<PipelineCatalog>,
    timezone: DisplayZone,
}

impl EventNormalizer {
    /// Creates a normalizer.
    pub fn new(
        org_name: OrganizationName,
        client_id: Option<ClientId>,
        catalog: Arc<PipelineCatalog>,
        timezone: DisplayZone,
    ) -> Self {
        Self {
            org_name,
            client_id,
            catalog,
            timezone,
        }
    }

    /// Creates a normalizer from the process configuration and dataset.
    pub fn from_config(config: &NotifyConfig, catalog: Arc<PipelineCatalog>) -> Self {
        Self::new(
            config.org_name.clone(),
            config.client_id.clone(),
            catalog,
            config.timezone,
        )
    }

    /// Public console URL for an execution path.
    pub fn console_url(&self, url_text: &str) -> String {
        format!(
            "https://experience.adobe.com/#/@{}/cloud-manager/pipelineexecution.html/{}",
            self.org_name, url_text
        )
    }

    /// Classifies and enriches one event.
    ///
    /// Returns `None` if the event matches no registered kind or its object id
    /// is not an execution URL.
    pub fn classify(&self, event: &RawEvent) -> Option<PipelineEventDetail> {
        let Some(kind) = lookup_kind(&event.event_type, &event.object_type) else {
            info!(
                event_type = %event.event_type,
                object_type = %event.object_type,
                "Event not recognized; discarding"
            );
            return None;
        };

        let Some(path) = ExecutionPath::parse(&event.object.id) else {
            warn!(
                object_id = %event.object.id,
                "Event object id is not an execution URL; discarding"
            );
            return None;
        };

        let record = path
            .pipeline_id
            .as_ref()
            .and_then(|id| self.catalog.find(id));
        if record.is_none() {
            warn!(
                pipeline_id = ?path.pipeline_id.as_ref().map(PipelineId::as_str),
                url_text = %path.url_text,
                "Pipeline not found in dataset; sending without enrichment"
            );
        }

        debug!(status = %kind.status, url_text = %path.url_text, "Event classified");
        Some(PipelineEventDetail {
            status: kind.status,
            date: self.timezone.format(event.published),
            url: self.console_url(&path.url_text),
            url_text: path.url_text,
            name: record.and_then(|r| r.name.clone()),
            target: record.and_then(|r| r.build_target.clone()),
            pipeline_type: record.and_then(|r| r.pipeline_type.clone()),
        })
    }

    /// Validates a decoded request body and returns its canonical events in
    /// their original order.
    ///
    /// The body carries either `events: [{ "event": ... }, ...]` or a single
    /// `event` (the raw event itself, or a wrapper holding one).
    ///
    /// # Errors
    ///
    /// - [`ValidationFailure::InvalidClientId`] if a client id is configured
    ///   and `recipient_client_id` differs; no events are looked at.
    /// - [`ValidationFailure::NoEvents`] if there is nothing to classify.
    /// - [`ValidationFailure::NoValidEvents`] if every event was discarded.
    pub fn validate_batch(
        &self,
        body: &Value,
    ) -> Result<Vec<PipelineEventDetail>, ValidationFailure> {
        if let Some(expected) = &self.client_id {
            let received = body.get("recipient_client_id").and_then(Value::as_str);
            if received != Some(expected.as_str()) {
                warn!(
                    expected_len = expected.as_str().len(),
                    received = ?received,
                    "Unexpected recipient client id"
                );
                return Err(ValidationFailure::InvalidClientId);
            }
        }

        let events = raw_events(body);
        info!(count = events.len(), "Events received");
        if events.is_empty() {
            warn!("No events found");
            return Err(ValidationFailure::NoEvents);
        }

        let details: Vec<PipelineEventDetail> = events
            .into_iter()
            .filter_map(|raw| match raw.and_then(decode_event) {
                Some(event) => self.classify(&event),
                None => {
                    debug!("Event wrapper has no decodable event; discarding");
                    None
                }
            })
            .collect();

        if details.is_empty() {
            warn!("No valid events found");
            return Err(ValidationFailure::NoValidEvents);
        }
        Ok(details)
    }
}

/// One entry per event wrapper in the body; `None` where a wrapper holds no
/// event.
fn decode_event(value: &Value) -> Option<RawEvent> {
    serde_json::from_value(value.clone()).ok()
}

fn raw_events(body: &Value) -> Vec<Option<&Value>> {
    match body.get("events") {
        Some(Value::Array(wrappers)) => wrappers.iter().map(|w| w.get("event")).collect(),
        Some(Value::Null) | None => match body.get("event") {
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![Some(single.get("event").unwrap_or(single))],
        },
        Some(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineRecord;
    use serde_json::json;

    const STARTED: &str = "https://ns.adobe.com/experience/cloudmanager/event/started";
    const ENDED: &str = "https://ns.adobe.com/experience/cloudmanager/event/ended";
    const WAITING: &str = "https://ns.adobe.com/experience/cloudmanager/event/waiting";

    fn catalog() -> Arc<PipelineCatalog> {
        Arc::new(PipelineCatalog::new(vec![PipelineRecord {
            id: PipelineId::new("456").unwrap(),
            name: Some("Deploy".to_string()),
            build_target: Some("DEV".to_string()),
            pipeline_type: Some("CI_CD".to_string()),
        }]))
    }

    fn normalizer(client_id: Option<&str>) -> EventNormalizer {
        EventNormalizer::new(
            OrganizationName::new("acme").unwrap(),
            client_id.and_then(ClientId::new),
            catalog(),
            DisplayZone::Cet,
        )
    }

    fn raw_event(event_type: &str, object_type: &str, pipeline: &str) -> Value {
        json!({
            "@type": event_type,
            "xdmEventEnvelope:objectType": object_type,
            "activitystreams:published": "2026-10-18T12:00:00.000Z",
            "activitystreams:object": {
                "@id": format!("https://cloudmanager.adobe.io/api/program/1/pipeline/{pipeline}/execution/9")
            }
        })
    }

    fn event(event_type: &str, object_type: &str, pipeline: &str) -> RawEvent {
        serde_json::from_value(raw_event(event_type, object_type, pipeline)).unwrap()
    }

    #[test]
    fn started_event_with_known_pipeline_is_enriched() {
        let detail = normalizer(None)
            .classify(&event(STARTED, PIPELINE_EXECUTION, "456"))
            .unwrap();
        assert_eq!(detail.status, PipelineStatus::Started);
        assert_eq!(detail.date, "18.10.2026, 14:00:00 CET");
        assert_eq!(detail.url_text, "program/1/pipeline/456/execution/9");
        assert_eq!(
            detail.url,
            "https://experience.adobe.com/#/@acme/cloud-manager/pipelineexecution.html/program/1/pipeline/456/execution/9"
        );
        assert_eq!(detail.name.as_deref(), Some("Deploy"));
        assert_eq!(detail.target.as_deref(), Some("DEV"));
        assert_eq!(detail.pipeline_type.as_deref(), Some("CI_CD"));
    }

    #[test]
    fn unknown_pipeline_omits_enrichment_fields() {
        let detail = normalizer(None)
            .classify(&event(STARTED, PIPELINE_EXECUTION, "exec123"))
            .unwrap();
        assert_eq!(detail.status, PipelineStatus::Started);
        assert!(!detail.date.is_empty());
        assert!(detail.url.ends_with("pipeline/exec123/execution/9"));
        assert_eq!(detail.url_text, "program/1/pipeline/exec123/execution/9");
        assert!(detail.name.is_none());
        assert!(detail.target.is_none());
        assert!(detail.pipeline_type.is_none());
    }

    #[test]
    fn waiting_requires_the_step_state_object_type() {
        let normalizer = normalizer(None);
        let waiting = normalizer
            .classify(&event(WAITING, EXECUTION_STEP_STATE, "456"))
            .unwrap();
        assert_eq!(waiting.status, PipelineStatus::Waiting);
        assert!(normalizer
            .classify(&event(WAITING, PIPELINE_EXECUTION, "456"))
            .is_none());
        assert!(normalizer
            .classify(&event(STARTED, EXECUTION_STEP_STATE, "456"))
            .is_none());
    }

    #[test]
    fn registry_pairs_are_unique() {
        for (i, a) in REGISTRY.iter().enumerate() {
            for b in REGISTRY.iter().skip(i + 1) {
                assert!((a.event_type, a.object_type) != (b.event_type, b.object_type));
            }
        }
    }

    #[test]
    fn object_id_outside_the_api_is_discarded() {
        let mut raw = event(ENDED, PIPELINE_EXECUTION, "456");
        raw.object.id = "https://elsewhere.test/program/1".to_string();
        assert!(normalizer(None).classify(&raw).is_none());
    }

    #[test]
    fn batch_drops_events_outside_the_api() {
        let mut foreign = raw_event(STARTED, PIPELINE_EXECUTION, "789");
        foreign["activitystreams:object"]["@id"] = json!("https://elsewhere.test/program/1");
        let body = json!({
            "events": [
                { "event": foreign },
                { "event": raw_event(ENDED, PIPELINE_EXECUTION, "456") }
            ]
        });
        let details = normalizer(None).validate_batch(&body).unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].status, PipelineStatus::Ended);
    }

    #[test]
    fn short_path_still_classifies_without_pipeline_id() {
        let path = ExecutionPath::parse("https://cloudmanager.adobe.io/api/program/1").unwrap();
        assert_eq!(path.url_text, "program/1");
        assert!(path.pipeline_id.is_none());
    }

    #[test]
    fn client_id_mismatch_rejects_batch() {
        let body = json!({
            "recipient_client_id": "someone-else",
            "events": [{ "event": raw_event(STARTED, PIPELINE_EXECUTION, "456") }]
        });
        assert_eq!(
            normalizer(Some("expected")).validate_batch(&body),
            Err(ValidationFailure::InvalidClientId)
        );
    }

    #[test]
    fn matching_client_id_is_accepted() {
        let body = json!({
            "recipient_client_id": "expected",
            "events": [{ "event": raw_event(STARTED, PIPELINE_EXECUTION, "456") }]
        });
        assert_eq!(normalizer(Some("expected")).validate_batch(&body).unwrap().len(), 1);
    }

    #[test]
    fn empty_or_missing_events_is_no_events() {
        let normalizer = normalizer(None);
        assert_eq!(
            normalizer.validate_batch(&json!({ "events": [] })),
            Err(ValidationFailure::NoEvents)
        );
        assert_eq!(
            normalizer.validate_batch(&json!({})),
            Err(ValidationFailure::NoEvents)
        );
    }

    #[test]
    fn batch_of_unrecognized_events_is_no_valid_events() {
        let body = json!({
            "events": [
                { "event": raw_event("https://example.test/other", PIPELINE_EXECUTION, "456") },
                { "event": { "@type": STARTED } },
                { "not_an_event": true }
            ]
        });
        assert_eq!(
            normalizer(None).validate_batch(&body),
            Err(ValidationFailure::NoValidEvents)
        );
    }

    #[test]
    fn mixed_batch_keeps_valid_events_in_order() {
        let body = json!({
            "events": [
                { "event": raw_event(ENDED, PIPELINE_EXECUTION, "456") },
                { "event": raw_event("https://example.test/other", PIPELINE_EXECUTION, "456") },
                { "event": raw_event(STARTED, PIPELINE_EXECUTION, "789") }
            ]
        });
        let details = normalizer(None).validate_batch(&body).unwrap();
        let statuses: Vec<_> = details.iter().map(|d| d.status).collect();
        assert_eq!(statuses, vec![PipelineStatus::Ended, PipelineStatus::Started]);
        assert!(details.len() <= 3);
    }

    #[test]
    fn single_event_body_is_accepted() {
        let normalizer = normalizer(None);
        let direct = json!({ "event": raw_event(STARTED, PIPELINE_EXECUTION, "456") });
        assert_eq!(normalizer.validate_batch(&direct).unwrap().len(), 1);

        let wrapped = json!({ "event": { "event": raw_event(ENDED, PIPELINE_EXECUTION, "456") } });
        let details = normalizer.validate_batch(&wrapped).unwrap();
        assert_eq!(details[0].status, PipelineStatus::Ended);
    }
}
