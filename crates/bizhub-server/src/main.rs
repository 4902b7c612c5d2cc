//! bizhub server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store and serves the JSON API over HTTP.
//!
//! There is no login endpoint: API tokens are minted here.
//!
//! ```
//! cargo run -p bizhub-server -- create-user alice@example.com Alice --role Sales
//! cargo run -p bizhub-server -- issue-token alice@example.com
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use bizhub_api::auth;
use bizhub_core::{record::NewUser, store::RecordStore as _};
use bizhub_server::ServerConfig;
use bizhub_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Bizhub API server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Create a profile and print a fresh API token for it.
  CreateUser {
    email: String,
    name:  String,
    /// Role to grant; may be repeated.
    #[arg(long)]
    role:  Vec<String>,
    #[arg(long)]
    staff: bool,
  },
  /// Print a fresh API token for an existing profile.
  IssueToken { email: String },
  /// Grant a role to an existing profile.
  GrantRole { email: String, role: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg: ServerConfig = bizhub_server::load_config(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(store, &server_cfg).await,
    Command::CreateUser { email, name, role, staff } => {
      let user = store
        .create_user(NewUser { email, name, is_staff: staff })
        .await
        .context("failed to create user")?;
      for role in role {
        store.grant_role(user.id, role).await.context("failed to grant role")?;
      }
      tracing::info!(id = user.id, email = %user.email, "created user");
      let token = auth::issue_token(&store, user.id).await.context("failed to issue token")?;
      println!("{token}");
      Ok(())
    }
    Command::IssueToken { email } => {
      let user = find_user(&store, email).await?;
      let token = auth::issue_token(&store, user).await.context("failed to issue token")?;
      println!("{token}");
      Ok(())
    }
    Command::GrantRole { email, role } => {
      let user = find_user(&store, email).await?;
      store.grant_role(user, role.clone()).await.context("failed to grant role")?;
      tracing::info!(id = user, %role, "granted role");
      Ok(())
    }
  }
}

async fn serve(store: SqliteStore, cfg: &ServerConfig) -> anyhow::Result<()> {
  let app = bizhub_server::app(bizhub_server::state(store, cfg));
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn find_user(store: &SqliteStore, email: String) -> anyhow::Result<bizhub_core::Id> {
  let user = store
    .find_user_by_email(email.clone())
    .await
    .context("failed to look up user")?
    .with_context(|| format!("no user with email {email:?}"))?;
  Ok(user.id)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
