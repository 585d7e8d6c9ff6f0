//! `sshcx` — command-line front end for the ssh.cx API.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use sshcx_core::{short_code_from_url, ApiClient, ClientConfig, Reference, Reply, Resource};

#[derive(Parser)]
#[command(name = "sshcx")]
#[command(about = "Shorten links and host files on ssh.cx")]
#[command(version)]
struct Cli {
    /// API token
    #[arg(long, env = "SSHCX_TOKEN", default_value = "", hide_env_values = true)]
    token: String,

    /// API base URL
    #[arg(long, env = "SSHCX_BASE_URL")]
    base_url: Option<String>,

    /// Skip TLS certificate verification (self-signed test servers only)
    #[arg(long)]
    insecure: bool,

    /// Request timeout in seconds, 0 for none
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a short link for URL
    Shorten { url: String },
    /// List your short links
    Urls,
    /// Show one short link by id, short code or link
    Url { reference: String },
    /// Delete a short link, or all of them with --all
    DeleteUrl {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        reference: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Upload a file
    Upload { path: PathBuf },
    /// List your uploaded files
    Files,
    /// Show one file by id, short code or link
    File { reference: String },
    /// Delete a file, or all of them with --all
    DeleteFile {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        reference: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// Request a demo token (valid for 7 days) together with a short link
    DemoNew { url: String },
    /// Move everything created with a demo token to a production token
    DemoReassign { demo_token: String, prod_token: String },
    /// Print the short code of a short link
    ShortCode { link: String },
}

/// A numeric argument is an id; anything else is a short code, with full
/// links reduced to their code.
fn parse_reference(raw: &str) -> Reference {
    if let Ok(id) = raw.parse::<u64>() {
        return Reference::Id(id);
    }
    if raw.contains("://") {
        return Reference::Short(short_code_from_url(raw));
    }
    Reference::Short(raw.to_string())
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("reading SSHCX_* environment")?;
    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout((secs > 0).then(|| Duration::from_secs(secs)));
    }
    if cli.insecure {
        config = config.danger_skip_tls_verify();
    }
    Ok(config)
}

/// What a command prints. An empty response body is kept apart from a body
/// that held JSON `null`.
#[derive(Debug, PartialEq)]
enum Output {
    NoContent,
    Json(Value),
}

impl<T: Serialize> From<Reply<T>> for Output {
    fn from(reply: Reply<T>) -> Self {
        match reply {
            Reply::NoContent => Output::NoContent,
            reply => Output::Json(reply.to_json()),
        }
    }
}

fn run(cli: Cli) -> Result<Output> {
    let config = build_config(&cli)?;
    let mut api = ApiClient::with_config(&cli.token, &config);

    let output: Output = match cli.command {
        Command::Shorten { url } => api.create_short_url(&url)?.into(),
        Command::Urls => api.list_urls()?.into(),
        Command::Url { reference } => api
            .get::<Value>(Resource::Url, &parse_reference(&reference))?
            .into(),
        Command::DeleteUrl { all: true, .. } => api.delete_all_urls()?.into(),
        Command::DeleteUrl { reference, .. } => {
            let reference = reference.context("a reference or --all is required")?;
            api.delete::<Value>(Resource::Url, &parse_reference(&reference))?
                .into()
        }
        Command::Upload { path } => api
            .upload_file(&path)
            .with_context(|| format!("uploading {}", path.display()))?
            .into(),
        Command::Files => api.list_files()?.into(),
        Command::File { reference } => api
            .get::<Value>(Resource::File, &parse_reference(&reference))?
            .into(),
        Command::DeleteFile { all: true, .. } => api.delete_all_files()?.into(),
        Command::DeleteFile { reference, .. } => {
            let reference = reference.context("a reference or --all is required")?;
            api.delete::<Value>(Resource::File, &parse_reference(&reference))?
                .into()
        }
        Command::DemoNew { url } => api.issue_demo_token(&url)?.into(),
        Command::DemoReassign {
            demo_token,
            prod_token,
        } => api.exchange_demo_token(&demo_token, &prod_token)?.into(),
        Command::ShortCode { link } => Output::Json(Value::String(short_code_from_url(&link))),
    };
    Ok(output)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(Output::NoContent) => {
            println!("(no content)");
            ExitCode::SUCCESS
        }
        Ok(Output::Json(output)) => {
            match serde_json::to_string_pretty(&output) {
                Ok(text) => println!("{text}"),
                Err(_) => println!("{output}"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
