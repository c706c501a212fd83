//! Rendering of a [`PipelineEventDetail`] for each channel.
//!
//! [`format`] is pure: the same detail and title always produce byte-identical
//! output. Every populated field except the URL is rendered as a labelled
//! line, in the order status, date, name, target, type; the URL line comes
//! last.

use serde_json::{json, Value};

use crate::{PipelineEventDetail, PipelineStatus};

/// The three renderings of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct FormattedMessage {
    /// Title, also used as the email subject.
    pub title: String,
    /// Slack-style attachment payload.
    pub chat_card: Value,
    /// HTML body for email.
    pub email_html: String,
    /// Teams-style MessageCard payload.
    pub card_payload: Value,
}

/// Hex color (no leading `#`) for a status.
pub fn status_color(status: PipelineStatus) -> &'static str {
    match status {
        PipelineStatus::Started => "00c63f",
        PipelineStatus::Ended => "0072C6",
        PipelineStatus::Waiting => "FFA500",
        PipelineStatus::Unknown => "808080",
    }
}

/// Labelled `(LABEL, value)` pairs for every populated field, in render order.
fn labelled_fields(detail: &PipelineEventDetail) -> Vec<(&'static str, &str)> {
    [
        ("STATUS", Some(detail.status.as_str())),
        ("DATE", Some(detail.date.as_str())),
        ("NAME", detail.name.as_deref()),
        ("TARGET", detail.target.as_deref()),
        ("TYPE", detail.pipeline_type.as_deref()),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.filter(|v| !v.is_empty()).map(|v| (label, v)))
    .collect()
}

/// Renders `detail` for chat, card, and email.
pub fn format(detail: &PipelineEventDetail, title: &str) -> FormattedMessage {
    let fields = labelled_fields(detail);
    let color = status_color(detail.status);

    let mut markdown: Vec<String> = fields
        .iter()
        .map(|(label, value)| format!("*{label}*: {value}"))
        .collect();
    let mut chat_lines = markdown.clone();
    chat_lines.push(format!("*URL*: <{}|{}>", detail.url, detail.url_text));
    markdown.push(format!("*URL*: [{}]({})", detail.url_text, detail.url));

    let mut html: Vec<String> = fields
        .iter()
        .map(|(label, value)| format!("<b>{label}</b>: {value}"))
        .collect();
    html.push(format!(
        "<b>URL</b>: <a href=\"{}\">{}</a>",
        detail.url, detail.url_text
    ));

    let chat_card = json!({
        "text": "",
        "attachments": [{
            "color": format!("#{color}"),
            "blocks": [{
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("{title}:\n{}", chat_lines.join("\n")),
                },
            }],
        }],
    });

    let card_payload = json!({
        "@context": "https://schema.org/extensions",
        "@type": "MessageCard",
        "themeColor": color,
        "title": title,
        "text": format!("{title}:\n{}", markdown.join("\n")),
    });

    FormattedMessage {
        title: title.to_string(),
        chat_card,
        email_html: html.join("<br/>"),
        card_payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail() -> PipelineEventDetail {
        PipelineEventDetail {
            status: PipelineStatus::Ended,
            date: "18.10.2026, 14:00:00 CET".to_string(),
            url: "https://experience.adobe.com/#/@acme/cloud-manager/pipelineexecution.html/program/1/pipeline/456/execution/9".to_string(),
            url_text: "program/1/pipeline/456/execution/9".to_string(),
            name: Some("Deploy".to_string()),
            target: None,
            pipeline_type: Some("CI_CD".to_string()),
        }
    }

    #[test]
    fn chat_payload_has_colored_attachment() {
        let message = format(&detail(), "Pipeline");
        let attachment = &message.chat_card["attachments"][0];
        assert_eq!(message.chat_card["text"], "");
        assert_eq!(attachment["color"], "#0072C6");
        assert_eq!(attachment["blocks"][0]["type"], "section");
        assert_eq!(attachment["blocks"][0]["text"]["type"], "mrkdwn");
        assert_eq!(
            attachment["blocks"][0]["text"]["text"],
            "Pipeline:\n*STATUS*: ended\n*DATE*: 18.10.2026, 14:00:00 CET\n*NAME*: Deploy\n*TYPE*: CI_CD\n\
             *URL*: <https://experience.adobe.com/#/@acme/cloud-manager/pipelineexecution.html/program/1/pipeline/456/execution/9|program/1/pipeline/456/execution/9>"
        );
    }

    #[test]
    fn card_payload_is_a_message_card() {
        let message = format(&detail(), "Pipeline");
        let card = &message.card_payload;
        assert_eq!(card["@context"], "https://schema.org/extensions");
        assert_eq!(card["@type"], "MessageCard");
        assert_eq!(card["themeColor"], "0072C6");
        assert_eq!(card["title"], "Pipeline");
        let text = card["text"].as_str().unwrap();
        assert!(text.starts_with("Pipeline:\n*STATUS*: ended\n"));
        assert!(text.ends_with(
            "*URL*: [program/1/pipeline/456/execution/9](https://experience.adobe.com/#/@acme/cloud-manager/pipelineexecution.html/program/1/pipeline/456/execution/9)"
        ));
    }

    #[test]
    fn email_lines_are_joined_with_breaks() {
        let message = format(&detail(), "Pipeline");
        assert_eq!(message.title, "Pipeline");
        let lines: Vec<&str> = message.email_html.split("<br/>").collect();
        assert_eq!(lines[0], "<b>STATUS</b>: ended");
        assert_eq!(lines[2], "<b>NAME</b>: Deploy");
        assert_eq!(lines.len(), 5);
        assert!(lines[4].starts_with("<b>URL</b>: <a href=\"https://experience.adobe.com/"));
        assert!(lines[4].ends_with(">program/1/pipeline/456/execution/9</a>"));
    }

    #[test]
    fn missing_fields_produce_no_lines() {
        let mut detail = detail();
        detail.name = None;
        detail.pipeline_type = None;
        let message = format(&detail, "T");
        assert!(!message.email_html.contains("NAME"));
        assert!(!message.email_html.contains("TARGET"));
        assert!(!message.email_html.contains("TYPE"));
    }

    #[test]
    fn formatting_is_deterministic() {
        assert_eq!(format(&detail(), "Pipeline"), format(&detail(), "Pipeline"));
    }

    #[test]
    fn each_status_maps_to_its_color() {
        assert_eq!(status_color(PipelineStatus::Started), "00c63f");
        assert_eq!(status_color(PipelineStatus::Ended), "0072C6");
        assert_eq!(status_color(PipelineStatus::Waiting), "FFA500");
    }

    #[test]
    fn unrecognized_status_renders_with_neutral_color() {
        let mut value = serde_json::to_value(detail()).unwrap();
        value["status"] = Value::from("paused");
        let detail: PipelineEventDetail = serde_json::from_value(value).unwrap();
        assert_eq!(detail.status, PipelineStatus::Unknown);

        let message = format(&detail, "Pipeline");
        assert_eq!(message.card_payload["themeColor"], "808080");
        assert_eq!(message.chat_card["attachments"][0]["color"], "#808080");
    }
}
