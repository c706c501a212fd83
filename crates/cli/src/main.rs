//! cmnotify CLI entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Load configuration**: read `.env` if present, then parse flags with
//!    environment fallbacks into an [`events::NotifyConfig`].
//! 2. **Wire observability**: install `tracing-subscriber` (JSON or pretty)
//!    and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an OTLP exporter.
//! 3. **Construct infrastructure**: the `reqwest` webhook sink, the Gmail
//!    mailer, and the pipeline dataset, injected into [`dispatch::Notifier`].
//! 4. **Run the selected command**: the HTTP listener, a one-shot dispatch of
//!    a body file, or the Google authorization steps.

mod args;
mod setup;
mod telemetry;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dispatch::PostOptions;
use events::{DispatchReport, Headers, IncomingRequest};
use tokio::io::AsyncReadExt;
use tracing::info;

use crate::args::{Cli, Command, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let telemetry = telemetry::init(cli.settings.log_format)?;

    let result = run(cli).await;

    telemetry.shutdown();
    result
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.settings;
    match cli.command {
        Command::Serve { bind, verify, wait } => serve(&settings, bind, verify, wait).await,
        Command::Dispatch {
            file,
            verify,
            signature,
        } => dispatch_file(&settings, file.as_deref(), verify, signature).await,
        Command::AuthUrl { state } => {
            let credentials = setup::credential_manager(&settings, reqwest::Client::new()).await?;
            println!("{}", credentials.authorize_url(&state)?);
            Ok(())
        }
        Command::AuthCode { code } => {
            let credentials = setup::credential_manager(&settings, reqwest::Client::new()).await?;
            credentials
                .exchange_code(&code)
                .await
                .context("failed to exchange authorization code")?;
            println!(
                "Token stored in {}",
                settings.data_path.join(mail::credentials::TOKEN_FILENAME).display()
            );
            Ok(())
        }
    }
}

async fn serve(
    settings: &Settings,
    bind: std::net::SocketAddr,
    verify: bool,
    wait: bool,
) -> anyhow::Result<()> {
    let config = setup::notify_config(settings)?;
    info!(?config, "Configuration loaded");
    let notifier = setup::build_notifier(settings, &config).await?;
    let options = PostOptions {
        verify,
        wait_for_completion: wait,
    };

    let router = listener::router(Arc::new(notifier), options);
    listener::serve(bind, router, async {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutdown requested");
    })
    .await?;
    Ok(())
}

async fn dispatch_file(
    settings: &Settings,
    file: Option<&Path>,
    verify: bool,
    signature: Option<String>,
) -> anyhow::Result<()> {
    let config = setup::notify_config(settings)?;
    let body = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("failed to read stdin")?;
            body
        }
    };

    let mut headers = Headers::new();
    if let Some(signature) = signature {
        headers.insert(&config.signature_header, signature);
    }
    let notifier = setup::build_notifier(settings, &config).await?;
    let report = notifier
        .post(
            IncomingRequest::raw(headers, body),
            PostOptions {
                verify,
                wait_for_completion: true,
            },
        )
        .await?;

    if let DispatchReport::Settled(results) = report {
        println!("{}", serde_json::to_string_pretty(&results)?);
    }
    Ok(())
}
