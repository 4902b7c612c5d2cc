//! Bizhub server assembly: configuration types and the top-level router.
//!
//! The binary in `main.rs` loads a [`ServerConfig`], opens the store and hands
//! both to [`app`].

use std::path::{Path, PathBuf};

use axum::Router;
use bizhub_api::AppState;
use bizhub_core::{policy::RoleGate, store::RecordStore, verb::Verb};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Runtime server configuration, deserialised from `config.toml` and
/// `BIZHUB_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  /// Role required on the business endpoints. Absent means no gate.
  #[serde(default)]
  pub role_gate:  Option<RoleGateConfig>,
}

/// Prefix of environment variables overriding the file. Nested keys use a
/// double underscore: `BIZHUB_PORT`, `BIZHUB_ROLE_GATE__REQUIRED_ROLE`.
pub const ENV_PREFIX: &str = "BIZHUB";

/// Load configuration from the TOML file at `path` (optional) layered with
/// `BIZHUB_*` environment variables.
pub fn load_config(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  load_config_from(path, environment())
}

fn environment() -> config::Environment {
  config::Environment::with_prefix(ENV_PREFIX)
    .prefix_separator("_")
    .separator("__")
}

fn load_config_from(
  path: &Path,
  env: config::Environment,
) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(env)
    .build()?
    .try_deserialize()
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8000 }

#[derive(Debug, Deserialize, Clone)]
pub struct RoleGateConfig {
  pub required_role: String,
  /// Verbs the role may use. Defaults to `GET` and `POST`.
  #[serde(default)]
  pub allowed_verbs: Option<Vec<Verb>>,
}

impl RoleGateConfig {
  pub fn build(&self) -> RoleGate {
    let gate = RoleGate::new(self.required_role.clone());
    match &self.allowed_verbs {
      Some(verbs) => gate.with_verbs(verbs.iter().copied()),
      None => gate,
    }
  }
}

/// Application state for `store` under `config`.
pub fn state<S: RecordStore>(store: S, config: &ServerConfig) -> AppState<S> {
  let state = AppState::new(store);
  match &config.role_gate {
    Some(gate) => {
      let gate = gate.build();
      tracing::info!(
        role = gate.required_role(),
        verbs = ?gate.allowed_verbs(),
        "business endpoints gated by role"
      );
      state.with_role_gate(gate)
    }
    None => state,
  }
}

/// The full HTTP application: the API under `/api` with request tracing.
pub fn app<S>(state: AppState<S>) -> Router
where
  S: RecordStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", bizhub_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use bizhub_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  fn parse(toml: &str) -> ServerConfig {
    config::Config::builder()
      .add_source(config::File::from_str(toml, config::FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn config_defaults() {
    let cfg = parse(r#"store_path = "bizhub.db""#);
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 8000);
    assert!(cfg.role_gate.is_none());
  }

  #[test]
  fn role_gate_defaults_to_read_and_create() {
    let cfg = parse(
      r#"
      store_path = "bizhub.db"
      [role_gate]
      required_role = "Sales"
      "#,
    );
    let gate = cfg.role_gate.unwrap().build();
    assert_eq!(gate.required_role(), "Sales");
    assert_eq!(gate.allowed_verbs().iter().copied().collect::<Vec<_>>(), vec![
      Verb::Get,
      Verb::Post
    ]);
  }

  #[test]
  fn role_gate_verbs_are_configurable() {
    let cfg = parse(
      r#"
      store_path = "bizhub.db"
      [role_gate]
      required_role = "Sales"
      allowed_verbs = ["GET", "DELETE"]
      "#,
    );
    let gate = cfg.role_gate.unwrap().build();
    assert!(gate.allowed_verbs().contains(&Verb::Delete));
    assert!(!gate.allowed_verbs().contains(&Verb::Post));
  }

  /// A config file unique to one test, removed on drop.
  struct TempConfig(PathBuf);

  impl TempConfig {
    fn new(name: &str, toml: &str) -> Self {
      let path = std::env::temp_dir()
        .join(format!("bizhub-{name}-{}.toml", std::process::id()));
      std::fs::write(&path, toml).unwrap();
      Self(path)
    }
  }

  impl Drop for TempConfig {
    fn drop(&mut self) { let _ = std::fs::remove_file(&self.0); }
  }

  fn env(vars: &[(&str, &str)]) -> config::Environment {
    let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    environment().source(Some(vars))
  }

  #[test]
  fn environment_overrides_file() {
    let file = TempConfig::new("env-override", "port = 8000\nstore_path = \"file.db\"\n");
    let cfg = load_config_from(&file.0, env(&[("BIZHUB_PORT", "9001")])).unwrap();
    assert_eq!(cfg.port, 9001);
    assert_eq!(cfg.store_path, PathBuf::from("file.db"));
  }

  #[test]
  fn environment_alone_is_enough() {
    let missing = std::env::temp_dir().join("bizhub-no-such-config.toml");
    let cfg = load_config_from(
      &missing,
      env(&[
        ("BIZHUB_STORE_PATH", "/tmp/x.db"),
        ("BIZHUB_ROLE_GATE__REQUIRED_ROLE", "Sales"),
      ]),
    )
    .unwrap();
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/x.db"));
    assert_eq!(cfg.role_gate.unwrap().required_role, "Sales");
  }

  #[test]
  fn double_underscore_prefix_is_not_read() {
    let missing = std::env::temp_dir().join("bizhub-no-such-config.toml");
    let err = load_config_from(&missing, env(&[("BIZHUB__STORE_PATH", "/tmp/y.db")]));
    assert!(err.is_err());
  }

  #[tokio::test]
  async fn api_is_nested() {
    let cfg = parse(r#"store_path = ":memory:""#);
    let store = SqliteStore::open_in_memory().await.unwrap();
    let app = app(state(store, &cfg));

    let req = Request::builder().uri("/api/profiles").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, serde_json::json!([]));

    let req = Request::builder().uri("/profiles").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
