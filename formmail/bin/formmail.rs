//! Command-line front end for formmail
//!
//! - `check` validates a mail configuration
//! - `submit` runs a recorded form submission through validation and drops
//!   the resulting message into a pickup directory

#![deny(clippy::pedantic, clippy::all, clippy::nursery)]

use std::{
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use formmail::{
    Attachment, FieldValue, FormMail, MailConfig, PickupTransport, StaticPage, Submission,
};
use indexmap::IndexMap;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "formmail")]
#[command(about = "Validate and dispatch form mail", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check that a mail configuration names its recipients and sender
    Check {
        /// Path to the RON mail configuration
        config: PathBuf,
    },
    /// Validate a form submission and queue it in a pickup directory
    Submit {
        /// Path to the RON mail configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Path to the RON map of submitted fields
        #[arg(short, long)]
        form: PathBuf,

        /// Pickup directory the message is written to
        #[arg(short, long)]
        pickup: PathBuf,

        /// Host name used in the default subject
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Page part as NAME=PATH, e.g. email=./email.txt
        #[arg(long = "part", value_parser = parse_pair)]
        parts: Vec<(String, PathBuf)>,

        /// Uploaded file as FIELD=PATH
        #[arg(long = "attach", value_parser = parse_pair)]
        attachments: Vec<(String, PathBuf)>,
    },
}

/// A recorded form field: text, or a group such as `required`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FormInput {
    Text(String),
    Group(IndexMap<String, String>),
}

fn parse_pair(value: &str) -> Result<(String, PathBuf), String> {
    value
        .split_once('=')
        .map(|(name, path)| (name.to_string(), PathBuf::from(path)))
        .ok_or_else(|| format!("expected NAME=PATH, got {value}"))
}

/// Guesses the MIME content type based on file extension.
fn guess_content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match extension.to_lowercase().as_str() {
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "zip" => "application/zip",
        "json" => "application/json",
        "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

fn check(config: &Path) -> anyhow::Result<ExitCode> {
    let config = MailConfig::load(config)?;

    if config.is_valid() {
        println!("Configuration is valid");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{}", config.config_error_messages());
        Ok(ExitCode::FAILURE)
    }
}

fn load_submission(
    form: &Path,
    attachments: Vec<(String, PathBuf)>,
) -> anyhow::Result<Submission> {
    let source = std::fs::read_to_string(form)
        .with_context(|| format!("Failed to read form from {}", form.display()))?;
    let fields: IndexMap<String, FormInput> = ron::from_str(&source)?;

    let mut submission = fields
        .into_iter()
        .map(|(name, input)| {
            let value = match input {
                FormInput::Text(text) => FieldValue::Text(text),
                FormInput::Group(group) => FieldValue::Group(group),
            };
            (name, value)
        })
        .collect::<Submission>();

    for (field, path) in attachments {
        let data = std::fs::read(&path)
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .context("Invalid attachment filename")?
            .to_string();

        submission.insert(
            field,
            Attachment::new(filename, guess_content_type(&path), data),
        );
    }

    Ok(submission)
}

fn load_page(host: String, parts: Vec<(String, PathBuf)>) -> anyhow::Result<StaticPage> {
    parts
        .into_iter()
        .try_fold(StaticPage::new(host), |page, (name, path)| {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read part {name} from {}", path.display()))?;
            Ok(page.with_part(name, content))
        })
}

fn main() -> anyhow::Result<ExitCode> {
    formmail_common::logging::init();

    match Cli::parse().command {
        Commands::Check { config } => check(&config),
        Commands::Submit {
            config,
            form,
            pickup,
            host,
            parts,
            attachments,
        } => {
            let config = MailConfig::load(&config)?;
            if !config.is_valid() {
                anyhow::bail!("Invalid configuration: {}", config.config_error_messages());
            }

            let submission = load_submission(&form, attachments)?;
            let page = load_page(host, parts)?;
            let transport = PickupTransport::new(pickup)?;

            let mut mail = FormMail::new(config, submission, page)?;
            if mail.send(&transport) {
                println!("Queued form mail in {}", transport.path().display());
                return Ok(ExitCode::SUCCESS);
            }

            for (key, message) in mail.errors().iter() {
                eprintln!("{key}: {message}");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
