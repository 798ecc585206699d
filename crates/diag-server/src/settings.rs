//! Runtime configuration: an optional TOML file overlaid by `DIAG_*`
//! environment variables.
//!
//! ```toml
//! host         = "0.0.0.0"
//! port         = 8501
//! store_path   = "~/.local/share/diag/diagnostics.db"
//! seed_samples = true
//!
//! [generator]
//! mode           = "delegated"
//! base_url       = "https://api.openai.com/v1"
//! api_key_env    = "OPENAI_API_KEY"
//! primary_model  = "gpt-4o-mini"
//! fallback_model = "gpt-4o"
//! timeout_secs   = 60
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `DIAG_GENERATOR__MODE=delegated`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use diag_core::generate::{DelegatedGenerator, DiagnosisGenerator, TemplateGenerator};
use diag_llm::{ChatBackend, DEFAULT_BASE_URL};
use serde::Deserialize;

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
  pub host:         String,
  pub port:         u16,
  pub store_path:   PathBuf,
  /// Fill an empty store with demo records on start.
  pub seed_samples: bool,
  pub generator:    GeneratorConfig,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      host:         "127.0.0.1".to_owned(),
      port:         8501,
      store_path:   PathBuf::from("diagnostics.db"),
      seed_samples: false,
      generator:    GeneratorConfig::default(),
    }
  }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorMode {
  #[default]
  Template,
  Delegated,
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct GeneratorConfig {
  pub mode:           GeneratorMode,
  pub base_url:       String,
  /// Takes precedence over `api_key_env`.
  pub api_key:        Option<String>,
  /// Environment variable holding the API key.
  pub api_key_env:    String,
  pub primary_model:  String,
  pub fallback_model: Option<String>,
  /// Per-request deadline. Unset means the HTTP client's default.
  pub timeout_secs:   Option<u64>,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self {
      mode:           GeneratorMode::Template,
      base_url:       DEFAULT_BASE_URL.to_owned(),
      api_key:        None,
      api_key_env:    "OPENAI_API_KEY".to_owned(),
      primary_model:  "gpt-4o-mini".to_owned(),
      fallback_model: Some("gpt-4o".to_owned()),
      timeout_secs:   Some(60),
    }
  }
}

impl AppConfig {
  /// Read `path` (if it exists) and overlay `DIAG_*` environment variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path.to_path_buf()).required(false))
      .add_source(
        config::Environment::with_prefix("DIAG")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut cfg: AppConfig = settings
      .try_deserialize()
      .context("failed to deserialise AppConfig")?;
    cfg.store_path = expand_tilde(&cfg.store_path);
    Ok(cfg)
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

impl GeneratorConfig {
  /// Build the configured generator variant.
  pub fn build(&self) -> anyhow::Result<DiagnosisGenerator<ChatBackend>> {
    match self.mode {
      GeneratorMode::Template => Ok(DiagnosisGenerator::Template(TemplateGenerator)),
      GeneratorMode::Delegated => {
        let api_key = self
          .api_key
          .clone()
          .or_else(|| std::env::var(&self.api_key_env).ok())
          .with_context(|| {
            format!(
              "delegated generator needs an API key: set generator.api_key or ${}",
              self.api_key_env
            )
          })?;

        let primary = ChatBackend::new(
          &self.base_url,
          api_key,
          &self.primary_model,
          self.timeout_secs.map(Duration::from_secs),
        )
        .context("failed to build text-generation backend")?;

        let mut generator = DelegatedGenerator::new(primary.clone());
        if let Some(model) = &self.fallback_model {
          generator = generator.with_fallback(primary.with_model(model));
        }
        Ok(DiagnosisGenerator::Delegated(generator))
      }
    }
  }
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
