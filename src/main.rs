mod access;
mod api;
mod config;
mod contact;
mod dashboard;
mod fetch;
mod inbox;
mod keymap;
mod message;
mod session;
mod summary;
mod tui;

use std::fs::OpenOptions;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::access::{Access, Gate, Router};
use crate::api::{AdminApi, HttpAdminApi};
use crate::config::Config;
use crate::contact::ContactForm;
use crate::fetch::Outcome;
use crate::session::Session;
use crate::summary::SummaryPanel;

#[derive(Parser)]
#[command(name = "safedesk", version, about = "Operator console for contact-form submissions")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the interactive console (the default)
    Console,
    /// Print the dashboard counters using the stored session
    Summary,
    /// Sign in and remember the credential
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SAFEDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored credential
    Logout,
    /// Submit a public contact form
    Contact {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        subject: String,
        #[arg(long)]
        message: String,
        #[arg(long)]
        phone: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config = Config::load()?;
    init_logging(&config)?;

    let session = match config.session.effective_token_file() {
        Some(path) => Session::persistent(path),
        None => Session::in_memory(),
    };
    let gate = Gate::new(session.clone(), Router::default());
    let api: Arc<dyn AdminApi> = Arc::new(HttpAdminApi::new(&config.api, session)?);

    match cli.command.unwrap_or(Command::Console) {
        Command::Console => {
            let app = tui::App::new(config, api, gate);
            tui::run(app).await
        }
        Command::Summary => print_summary(api.as_ref(), &gate).await,
        Command::Login { email, password } => {
            if !config.session.remember {
                bail!("nowhere to keep the credential; set `remember = true` under [session]");
            }
            let credential = api.login(email.trim(), &password).await?;
            gate.session().set(credential);
            info!(email = %email.trim(), "credential stored");
            println!("Logged in as {}", email.trim());
            Ok(())
        }
        Command::Logout => {
            gate.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Contact {
            name,
            email,
            subject,
            message,
            phone,
        } => {
            let form = ContactForm {
                name,
                email,
                subject,
                message,
                phone,
            };
            let reply = form.submit(&config.api).await?;
            println!("{}", reply);
            Ok(())
        }
    }
}

async fn print_summary(api: &dyn AdminApi, gate: &Gate) -> Result<()> {
    if gate.enter() == Access::Redirected {
        bail!("not logged in; run `safedesk login` first");
    }
    let mut panel = SummaryPanel::default();
    match panel.load(api, gate).await {
        Outcome::Applied => {
            let summary = panel.summary();
            println!("Total messages:  {}", summary.total_messages);
            println!("Unread messages: {}", summary.unread_messages);
            match &summary.latest_message {
                Some(latest) => println!(
                    "Latest message:  {} from {} <{}>",
                    latest.timestamp_display(),
                    latest.name,
                    latest.email
                ),
                None => println!("Latest message:  {}", summary.latest_display()),
            }
            Ok(())
        }
        Outcome::Unauthorized => bail!("session expired; run `safedesk login` again"),
        _ => bail!(
            "{}",
            panel.error().unwrap_or("Failed to load dashboard data")
        ),
    }
}

/// Send tracing output to the configured log file. The console owns the
/// terminal, so without a file nothing is logged.
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = config.effective_log_file() else {
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
