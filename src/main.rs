mod api;
mod app;
mod commands;
mod config;
mod controller;
mod derived;
mod event;
mod export;
mod form;
mod logging;
mod mutation;
mod notify;
mod query;
mod resources;
mod session;
mod ui;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::api::Gateway;
use crate::config::{Config, Screen};
use crate::session::{FileTokenStore, Session, StoredSession};

#[derive(Parser, Debug)]
#[command(name = "bursar")]
#[command(about = "A terminal client for school finance: income, expenses, budgets and payroll")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bursar/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Screen to open on start
  #[arg(short, long, value_enum)]
  screen: Option<Screen>,

  #[command(subcommand)]
  command: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
  /// Sign in and store the session token (password from BURSAR_PASSWORD)
  Login {
    #[arg(short, long)]
    email: String,
  },
  /// Forget the stored session token
  Logout,
  /// Download the CSV audit report for a date range
  Export {
    /// First day, YYYY-MM-DD
    #[arg(long)]
    from: NaiveDate,
    /// Last day, YYYY-MM-DD
    #[arg(long)]
    to: NaiveDate,
    /// Output file (default: audit_<from>_<to>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init()?;

  // An env token takes precedence over the stored session
  let session = match Config::get_token() {
    Some(token) => Session::from_token(token)?,
    None => Session::init(Arc::new(FileTokenStore::default_location()?))?,
  };
  let gateway = Gateway::http(&config.api.url, config.api.timeout(), session.clone())?;

  match args.command {
    Some(Cmd::Login { email }) => {
      let password = Config::get_password()?;
      let response = gateway
        .login(&email, &password)
        .await
        .map_err(|e| eyre!("{}", e.user_message("Login failed")))?;
      session.establish(StoredSession::from(response))?;
      info!(%email, "logged in");
      println!("Signed in as {}", email);
    }
    Some(Cmd::Logout) => {
      session.logout()?;
      println!("Signed out");
    }
    Some(Cmd::Export { from, to, output }) => {
      let output = output.unwrap_or_else(|| export::default_file_name(from, to));
      let path = export::export_audit(&gateway, from, to, &output).await?;
      println!("Audit report saved to {}", path.display());
    }
    None => {
      if !session.is_authenticated() {
        return Err(eyre!(
          "Not signed in. Run `bursar login --email <email>` or set BURSAR_TOKEN."
        ));
      }
      let screen = args.screen.unwrap_or(config.default_screen);
      let mut app = app::App::new(config, gateway, session, screen);
      app.run().await?;
    }
  }

  Ok(())
}
