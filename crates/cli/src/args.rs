//! Command-line and environment options.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use events::{DEFAULT_SIGNATURE_HEADER, DEFAULT_TITLE};

#[derive(Parser, Debug)]
#[command(
    name = "cmnotify",
    version,
    about = "Forward Cloud Manager pipeline events to Slack, Teams, and email"
)]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand. Each falls back to an environment
/// variable; a `.env` file is loaded before parsing.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Slack incoming-webhook URL
    #[arg(long, env = "SLACK_WEBHOOK", global = true)]
    pub slack_webhook: Option<String>,

    /// Teams incoming-webhook URL
    #[arg(long, env = "TEAMS_WEBHOOK", global = true)]
    pub teams_webhook: Option<String>,

    /// Teams channel email address
    #[arg(long, env = "TEAMS_EMAIL", global = true)]
    pub teams_email: Option<String>,

    /// Organization name used in console links
    #[arg(long, env = "ORGANIZATION_NAME", global = true)]
    pub org_name: Option<String>,

    /// Only accept batches addressed to this client id
    #[arg(long, env = "CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// Notification title and email subject
    #[arg(long, env = "TITLE", default_value = DEFAULT_TITLE, global = true)]
    pub title: String,

    /// Sender address for email notifications
    #[arg(long, env = "EMAIL_FROM", global = true)]
    pub from_email: Option<String>,

    /// Directory holding the pipeline dataset and Google credentials
    #[arg(long, env = "DATA_PATH", default_value = ".data", global = true)]
    pub data_path: PathBuf,

    /// Shared secret, public-key PEM, or path to a PEM file
    #[arg(long, env = "SECRET", hide_env_values = true, global = true)]
    pub secret: Option<String>,

    /// Header carrying the request signature
    #[arg(long, env = "SIGNATURE_HEADER", default_value = DEFAULT_SIGNATURE_HEADER, global = true)]
    pub signature_header: String,

    /// Display timezone for event dates (cet, ist, est)
    #[arg(long, env = "TIMEZONE", default_value = "cet", global = true)]
    pub timezone: String,

    /// Upper bound on a single channel send, in seconds
    #[arg(long, env = "CHANNEL_TIMEOUT_SECS", default_value_t = 10, global = true)]
    pub channel_timeout_secs: u64,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Json, global = true)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook listener
    Serve {
        /// Address to listen on
        #[arg(long, env = "BIND", default_value = "0.0.0.0:8080")]
        bind: SocketAddr,

        /// Reject deliveries whose signature does not verify
        #[arg(long)]
        verify: bool,

        /// Wait for every send and return the settlements
        #[arg(long)]
        wait: bool,
    },

    /// Process one delivery body from a file (or stdin) and print the results
    Dispatch {
        /// Body file; reads stdin when omitted
        file: Option<PathBuf>,

        /// Check the signature before dispatching
        #[arg(long)]
        verify: bool,

        /// Signature to check the body against
        #[arg(long)]
        signature: Option<String>,
    },

    /// Print the Google authorization URL for the sender account
    AuthUrl {
        /// Opaque state echoed back by the consent screen
        #[arg(long, default_value = "secure_random_state")]
        state: String,
    },

    /// Exchange an authorization code and store the token
    AuthCode {
        /// Code returned by the consent screen
        code: String,
    },
}
