//! The runtime configuration value.
//!
//! Built once by the composition root and handed by reference to every
//! component constructor. Nothing in the domain reads environment variables or
//! files; the composition root resolves those before building a
//! [`NotifyConfig`].

use std::time::Duration;

use crate::{ClientId, DisplayZone, EmailAddress, MessengerConfig, NotifyError, OrganizationName};

/// Default notification title.
pub const DEFAULT_TITLE: &str = "Cloud Manager Pipeline Notification";

/// Default name of the inbound signature header.
pub const DEFAULT_SIGNATURE_HEADER: &str = "x-adobe-signature";

/// Default upper bound on a single channel send.
pub const DEFAULT_CHANNEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the domain components need to serve requests.
#[derive(Clone)]
pub struct NotifyConfig {
    /// Channel destinations.
    pub messenger: MessengerConfig,
    /// Organization name used in console URLs.
    pub org_name: OrganizationName,
    /// When set, batches must be addressed to this client id.
    pub client_id: Option<ClientId>,
    /// Title rendered in every notification and used as email subject.
    pub title: String,
    /// Sender address for email notifications.
    pub from_email: Option<EmailAddress>,
    /// Shared secret or public-key PEM content used to verify requests.
    ///
    /// Takes precedence over a key embedded in the request.
    pub key_material: Option<String>,
    /// Name of the inbound signature header (matched case-insensitively).
    pub signature_header: String,
    /// Zone used to render event dates.
    pub timezone: DisplayZone,
    /// Upper bound on a single channel send.
    pub channel_timeout: Duration,
}

impl NotifyConfig {
    /// Creates a configuration with default title, header, zone and timeout.
    pub fn new(org_name: OrganizationName, messenger: MessengerConfig) -> Self {
        Self {
            messenger,
            org_name,
            client_id: None,
            title: DEFAULT_TITLE.to_string(),
            from_email: None,
            key_material: None,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            timezone: DisplayZone::default(),
            channel_timeout: DEFAULT_CHANNEL_TIMEOUT,
        }
    }

    /// Checks the values that cannot be enforced by their types.
    ///
    /// # Errors
    ///
    /// [`NotifyError::Configuration`] if the title or signature header is
    /// blank, the channel timeout is zero, or email is configured without a
    /// sender address.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.title.trim().is_empty() {
            return Err(NotifyError::configuration("title must not be empty"));
        }
        if self.signature_header.trim().is_empty() {
            return Err(NotifyError::configuration(
                "signature header name must not be empty",
            ));
        }
        if self.channel_timeout.is_zero() {
            return Err(NotifyError::configuration(
                "channel timeout must be greater than zero",
            ));
        }
        if self.messenger.email_recipient.is_some() && self.from_email.is_none() {
            return Err(NotifyError::configuration(
                "an email recipient is configured but no sender address is set",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for NotifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyConfig")
            .field("messenger", &self.messenger)
            .field("org_name", &self.org_name)
            .field("client_id", &self.client_id)
            .field("title", &self.title)
            .field("from_email", &self.from_email)
            .field(
                "key_material",
                &self.key_material.as_ref().map(|_| "<redacted>"),
            )
            .field("signature_header", &self.signature_header)
            .field("timezone", &self.timezone)
            .field("channel_timeout", &self.channel_timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> NotifyConfig {
        NotifyConfig::new(
            OrganizationName::new("acme").unwrap(),
            MessengerConfig::default(),
        )
    }

    #[test]
    fn defaults_validate() {
        let config = config();
        assert_eq!(config.title, DEFAULT_TITLE);
        assert_eq!(config.signature_header, "x-adobe-signature");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn email_without_sender_is_rejected() {
        let mut config = config();
        config.messenger.email_recipient = EmailAddress::new("team@example.test");
        assert!(config.validate().is_err());
        config.from_email = EmailAddress::new("bot@example.test");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = config();
        config.channel_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_key_material() {
        let mut config = config();
        config.key_material = Some("s3cret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
