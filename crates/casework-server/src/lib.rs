//! HTTP server wiring for casework.
//!
//! Loads [`ServerConfig`] and assembles the top-level axum [`Router`]: the
//! JSON API under `/api`, wrapped in request tracing and permissive CORS.

use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  extract::Request,
  http::{Method, StatusCode, header},
  middleware::{self, Next},
  response::{IntoResponse, Response},
};
use casework_api::Store;
use casework_core::{Coordinator, LifecycleConfig, gateway::GenerationGateway};
use casework_gateway::GatewayConfig;
use config::{
  Config, ConfigBuilder, ConfigError, Environment, builder::DefaultState,
};
use serde::Deserialize;
use tower_http::{
  cors::{Any, CorsLayer},
  trace::TraceLayer,
};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CASEWORK_*` environment variables (`__` separates nested keys, e.g.
/// `CASEWORK_GATEWAY__API_KEY`).
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub gateway:    GatewayConfig,
  #[serde(default)]
  pub lifecycle:  LifecycleSettings,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/casework/casework.db") }

/// Retry and timeout policy, in config-file units.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleSettings {
  #[serde(default = "default_link_attempts")]
  pub link_attempts:           u32,
  #[serde(default = "default_link_backoff_ms")]
  pub link_backoff_ms:         u64,
  #[serde(default = "default_generation_timeout_secs")]
  pub generation_timeout_secs: u64,
}

fn default_link_attempts() -> u32 { 3 }
fn default_link_backoff_ms() -> u64 { 100 }
fn default_generation_timeout_secs() -> u64 { 60 }

impl Default for LifecycleSettings {
  fn default() -> Self {
    Self {
      link_attempts:           default_link_attempts(),
      link_backoff_ms:         default_link_backoff_ms(),
      generation_timeout_secs: default_generation_timeout_secs(),
    }
  }
}

impl ServerConfig {
  /// Read `path` (optional) layered under the environment.
  pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
    Self::from_builder(Config::builder().add_source(config::File::from(path).required(false)))
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
    builder
      .add_source(
        Environment::with_prefix("CASEWORK")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn lifecycle_config(&self) -> LifecycleConfig {
    LifecycleConfig {
      generation_timeout: Duration::from_secs(self.lifecycle.generation_timeout_secs),
      link_attempts:      self.lifecycle.link_attempts,
      link_backoff:       Duration::from_millis(self.lifecycle.link_backoff_ms),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

fn cors() -> CorsLayer {
  CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Answer every `OPTIONS` request with an empty 200, whatever the path.
async fn options_passthrough(req: Request, next: Next) -> Response {
  if req.method() == Method::OPTIONS {
    return StatusCode::OK.into_response();
  }
  next.run(req).await
}

/// Build the top-level router.
pub fn app<S, G>(store: Arc<S>, coordinator: Arc<Coordinator<S, S, G>>) -> Router
where
  S: Store,
  G: GenerationGateway + 'static,
{
  Router::new()
    .nest("/api", casework_api::api_router(store, coordinator))
    .layer(middleware::from_fn(options_passthrough))
    .layer(TraceLayer::new_for_http())
    .layer(cors())
}

// ─── Integration tests ────────────────────────────────────────────────────────
