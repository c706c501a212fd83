//! Turns [`Settings`] into the runtime configuration and the wired-up
//! components.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use dispatch::{Notifier, TracingRecorder};
use events::{
    ClientId, DisplayZone, EmailAddress, Mailer, MessengerConfig, NotifyConfig, OrganizationName,
    PipelineCatalog, WebhookUrl,
};
use mail::{CredentialManager, GmailMailer};
use tracing::{info, warn};
use webhook::ReqwestSink;

use crate::args::Settings;

/// Pipeline dataset file inside the data directory.
pub const PIPELINE_DATA_FILENAME: &str = "pipelines-data.json";

/// Builds and validates the configuration value.
pub fn notify_config(settings: &Settings) -> anyhow::Result<NotifyConfig> {
    let org_name = settings
        .org_name
        .clone()
        .and_then(OrganizationName::new)
        .context("an organization name is required (--org-name or ORGANIZATION_NAME)")?;
    let messenger = MessengerConfig {
        chat_webhook: settings.slack_webhook.clone().and_then(WebhookUrl::new),
        card_webhook: settings.teams_webhook.clone().and_then(WebhookUrl::new),
        email_recipient: settings.teams_email.clone().and_then(EmailAddress::new),
    };

    let mut config = NotifyConfig::new(org_name, messenger);
    config.client_id = settings.client_id.clone().and_then(ClientId::new);
    config.title = settings.title.clone();
    config.from_email = settings.from_email.clone().and_then(EmailAddress::new);
    config.key_material = resolve_key_material(settings.secret.as_deref(), &settings.data_path)?;
    config.signature_header = settings.signature_header.clone();
    config.timezone = settings.timezone.parse::<DisplayZone>()?;
    config.channel_timeout = Duration::from_secs(settings.channel_timeout_secs);
    config.validate()?;
    Ok(config)
}

/// Resolves `--secret`: PEM text is used as-is, a path to an existing file
/// (as given, or inside the data directory) is read, anything else is a
/// shared secret.
pub fn resolve_key_material(
    secret: Option<&str>,
    data_path: &Path,
) -> anyhow::Result<Option<String>> {
    let Some(secret) = secret.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if secret.contains("-----BEGIN") {
        return Ok(Some(secret.to_string()));
    }
    let candidates = [PathBuf::from(secret), data_path.join(secret)];
    match candidates.iter().find(|path| path.is_file()) {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read key file {}", path.display()))?;
            info!(path = %path.display(), "Loaded verification key from file");
            Ok(Some(content))
        }
        None => Ok(Some(secret.to_string())),
    }
}

/// Loads the pipeline dataset. A missing file yields an empty catalog.
pub fn load_catalog(data_path: &Path) -> anyhow::Result<PipelineCatalog> {
    let path = data_path.join(PIPELINE_DATA_FILENAME);
    match std::fs::read(&path) {
        Ok(bytes) => {
            let catalog = PipelineCatalog::from_json(&bytes)
                .with_context(|| format!("invalid pipeline dataset {}", path.display()))?;
            info!(path = %path.display(), pipelines = catalog.len(), "Pipeline dataset loaded");
            Ok(catalog)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                path = %path.display(),
                "Pipeline dataset not found; events will not be enriched"
            );
            Ok(PipelineCatalog::default())
        }
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}

/// Loads the Google credential store for `settings.from_email`.
pub async fn credential_manager(
    settings: &Settings,
    http: reqwest::Client,
) -> anyhow::Result<CredentialManager> {
    let Some(from) = settings.from_email.clone().and_then(EmailAddress::new) else {
        bail!("a sender address is required (--from-email or EMAIL_FROM)");
    };
    CredentialManager::load(&settings.data_path, from, http)
        .await
        .context("failed to load Google credentials")
}

/// Wires every component for request handling.
pub async fn build_notifier(
    settings: &Settings,
    config: &NotifyConfig,
) -> anyhow::Result<Notifier> {
    let catalog = load_catalog(&settings.data_path)?;
    let sink = ReqwestSink::new(config.channel_timeout).context("failed to build webhook client")?;

    let email = (&config.messenger.email_recipient, &config.from_email);
    let mailer: Option<Arc<dyn Mailer>> = match email {
        (Some(_), Some(from)) => {
            let http = reqwest::Client::builder()
                .timeout(config.channel_timeout)
                .build()
                .context("failed to build mail client")?;
            match credential_manager(settings, http.clone()).await {
                Ok(credentials) => {
                    let mailer = GmailMailer::new(http, Arc::new(credentials), from.clone());
                    Some(Arc::new(mailer) as Arc<dyn Mailer>)
                }
                Err(e) => {
                    warn!(
                        error = %format!("{e:#}"),
                        "Email channel unavailable; email sends will fail"
                    );
                    None
                }
            }
        }
        _ => None,
    };

    Notifier::new(
        config,
        Arc::new(catalog),
        Arc::new(sink),
        mailer,
        Arc::new(TracingRecorder),
    )
    .context("invalid notifier configuration")
}
