mod backend;
mod credentials;
mod directory;
mod schedule;
mod settings;
mod submit;
mod ui;
mod wizard;

use std::cell::RefCell;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};

use crate::backend::{Backend, BackendError, BackendStatus, HttpBackend};
use crate::directory::User;
use crate::settings::{SetupSettings, load_settings};
use crate::submit::ConfigurationRequest;
use crate::ui::app::{SecretEntry, WizardOptions, WizardOutcome, run_wizard};
use crate::ui::render::render_user_list;

#[derive(Parser, Debug)]
#[command(
    name = "heimdall-setup",
    version,
    about = "First-run setup for the Heimdall lockdown service"
)]
struct Cli {
    /// JSON settings file; built-in defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, env = "HEIMDALL_BACKEND_URL")]
    backend_url: Option<String>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show the backend hostname and whether it is already configured.
    Status,
    /// List the accounts the backend can lock down.
    Users,
    /// Walk through account, passwords and schedule, then enable lockdown.
    Setup {
        /// Print the request that would be sent instead of posting it.
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => load_settings(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SetupSettings::default(),
    }
    .with_overrides(cli.backend_url.clone(), cli.timeout_ms)?;

    let backend = HttpBackend::new(&settings.backend_url, settings.request_timeout())?;
    info!(
        "using backend {} (timeout {} ms)",
        backend.base_url(),
        settings.request_timeout_ms
    );

    match cli.command {
        Command::Status => {
            let status = backend.status().context("failed to query backend status")?;
            println!("hostname: {}", status.hostname);
            println!(
                "configured: {}",
                if status.is_configured { "yes" } else { "no" }
            );
        }
        Command::Users => {
            let users = backend.users().context("failed to load user accounts")?;
            print!("{}", render_user_list(&users));
        }
        Command::Setup { dry_run } => {
            announce_status(&backend);
            let options = WizardOptions {
                secret_entry: if io::stdin().is_terminal() {
                    SecretEntry::Hidden
                } else {
                    SecretEntry::Echo
                },
                dry_run,
            };
            if dry_run {
                let capture = DryRunBackend::new(&backend);
                let outcome = run_wizard(
                    &capture,
                    io::stdin().lock(),
                    io::stdout().lock(),
                    options,
                )?;
                if let WizardOutcome::Configured { .. } = outcome
                    && let Some(request) = capture.captured.into_inner()
                {
                    let printable = serde_json::to_string_pretty(&request.redacted())
                        .context("failed to render request")?;
                    println!("Dry run; this request was not sent:\n{printable}");
                }
            } else {
                run_wizard(&backend, io::stdin().lock(), io::stdout().lock(), options)?;
            }
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn announce_status(backend: &dyn Backend) {
    match backend.status() {
        Ok(status) if status.is_configured => println!(
            "{} already has a lockdown configuration; finishing setup replaces it.",
            status.hostname
        ),
        Ok(status) => println!("Setting up {}.", status.hostname),
        Err(err) => warn!("backend status unavailable: {err}"),
    }
}

/// Reads from the real backend but keeps the final request instead of posting it.
struct DryRunBackend<'a> {
    inner: &'a dyn Backend,
    captured: RefCell<Option<ConfigurationRequest>>,
}

impl<'a> DryRunBackend<'a> {
    fn new(inner: &'a dyn Backend) -> Self {
        Self {
            inner,
            captured: RefCell::new(None),
        }
    }
}

impl Backend for DryRunBackend<'_> {
    fn status(&self) -> Result<BackendStatus, BackendError> {
        self.inner.status()
    }

    fn users(&self) -> Result<Vec<User>, BackendError> {
        self.inner.users()
    }

    fn submit_config(&self, request: &ConfigurationRequest) -> Result<(), BackendError> {
        info!("dry run: skipping POST for {}", request.username);
        self.captured.replace(Some(request.clone()));
        Ok(())
    }
}
