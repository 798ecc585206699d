//! Diagnosis text generation.
//!
//! A [`Generator`] maps a (machine, problem) pair to diagnosis text and never
//! fails from the caller's point of view. Two variants exist:
//!
//! - [`TemplateGenerator`] formats a fixed narrative. Pure and total.
//! - [`DelegatedGenerator`] sends an instruction prompt to a [`TextBackend`],
//!   retrying once against a fallback backend. When both fail, the text is a
//!   readable error message, but the returned [`Outcome`] still says so.
//!
//! [`DiagnosisGenerator`] wraps both so the variant can be picked at runtime.

use std::future::Future;

use serde::Serialize;
use thiserror::Error;

/// Shown in place of an empty problem description.
pub const NO_OBSERVATIONS: &str = "Sem observações adicionais.";

/// Leading text of the diagnosis written when every backend failed.
pub const FAILURE_PREFIX: &str = "Erro ao gerar diagnóstico";

/// `generated_by` tag for template output.
pub const TEMPLATE_TAG: &str = "template";

/// `generated_by` tag for the error text written when every backend failed.
pub const FAILED_TAG: &str = "failed";

// ─── Generation result ───────────────────────────────────────────────────────

/// Which path produced the text of a [`Generation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
  Template,
  Primary { backend: String },
  Fallback { backend: String },
  /// Every backend failed; the text is an error message.
  Failed,
}

/// One call to a [`TextBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
  pub backend: String,
  /// `None` when the call succeeded.
  pub error:   Option<String>,
}

/// Diagnosis text plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Generation {
  pub text:     String,
  pub outcome:  Outcome,
  /// Backend calls in the order they were made. Empty for templates.
  pub attempts: Vec<Attempt>,
}

impl Generation {
  /// Value for [`crate::record::NewRecord::generated_by`].
  pub fn generated_by(&self) -> String {
    match &self.outcome {
      Outcome::Template => TEMPLATE_TAG.to_owned(),
      Outcome::Primary { backend } | Outcome::Fallback { backend } => {
        backend.clone()
      }
      Outcome::Failed => FAILED_TAG.to_owned(),
    }
  }

  pub fn is_failure(&self) -> bool { matches!(self.outcome, Outcome::Failed) }
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Produces diagnosis text for a machine and problem description.
pub trait Generator: Send + Sync {
  fn generate<'a>(
    &'a self,
    machine: &'a str,
    problem: &'a str,
  ) -> impl Future<Output = Generation> + Send + 'a;
}

/// Why a [`TextBackend`] call failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
  #[error("transport error: {0}")]
  Transport(String),

  #[error("quota exceeded: {0}")]
  Quota(String),

  #[error("request timed out")]
  Timeout,

  #[error("api error ({status}): {message}")]
  Api { status: u16, message: String },

  #[error("empty response")]
  EmptyResponse,
}

/// An external text-generation capability (a hosted model endpoint).
pub trait TextBackend: Send + Sync {
  /// Identity of the backing model, recorded on every attempt.
  fn name(&self) -> &str;

  fn generate_text<'a>(
    &'a self,
    prompt: &'a str,
  ) -> impl Future<Output = Result<String, BackendError>> + Send + 'a;
}

// ─── Template variant ────────────────────────────────────────────────────────

/// Deterministic canned diagnosis; no external dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
  pub fn render(machine: &str, problem: &str) -> String {
    format!(
      "Diagnóstico simulado para '{machine}': o conjunto de rolamentos do eixo \
       principal apresenta fadiga por vibração excessiva, possivelmente \
       causada por desalinhamento no acoplamento e falta de lubrificação \
       adequada. Recomenda-se parada programada para inspeção, substituição \
       preventiva dos rolamentos e recalibração do alinhamento. Observação \
       registrada: {}",
      observations(problem)
    )
  }
}

impl Generator for TemplateGenerator {
  async fn generate(&self, machine: &str, problem: &str) -> Generation {
    Generation {
      text:     Self::render(machine, problem),
      outcome:  Outcome::Template,
      attempts: Vec::new(),
    }
  }
}

fn observations(problem: &str) -> &str {
  match problem.trim() {
    "" => NO_OBSERVATIONS,
    p => p,
  }
}

// ─── Delegated variant ───────────────────────────────────────────────────────

/// The instruction sent to a text backend.
pub fn build_prompt(machine: &str, problem: &str) -> String {
  format!(
    "Você é um engenheiro de manutenção industrial experiente. Com base nas \
     informações abaixo, escreva um diagnóstico técnico conciso em português, \
     indicando as causas mais prováveis da falha e as ações de manutenção \
     recomendadas, em ordem de prioridade.\n\n\
     Máquina: {machine}\n\
     Problema relatado: {}\n",
    observations(problem)
  )
}

/// Delegates to a primary backend, then to an optional fallback.
#[derive(Debug, Clone)]
pub struct DelegatedGenerator<B> {
  pub(crate) primary:  B,
  pub(crate) fallback: Option<B>,
}

impl<B: TextBackend> DelegatedGenerator<B> {
  pub fn new(primary: B) -> Self {
    Self {
      primary,
      fallback: None,
    }
  }

  pub fn with_fallback(mut self, fallback: B) -> Self {
    self.fallback = Some(fallback);
    self
  }

  async fn attempt(
    backend: &B,
    prompt: &str,
    attempts: &mut Vec<Attempt>,
  ) -> Option<String> {
    match backend.generate_text(prompt).await {
      Ok(text) => {
        attempts.push(Attempt {
          backend: backend.name().to_owned(),
          error:   None,
        });
        Some(text)
      }
      Err(e) => {
        tracing::warn!(backend = backend.name(), error = %e, "generation attempt failed");
        attempts.push(Attempt {
          backend: backend.name().to_owned(),
          error:   Some(e.to_string()),
        });
        None
      }
    }
  }
}

impl<B: TextBackend> Generator for DelegatedGenerator<B> {
  async fn generate(&self, machine: &str, problem: &str) -> Generation {
    let prompt = build_prompt(machine, problem);
    let mut attempts = Vec::with_capacity(2);

    if let Some(text) = Self::attempt(&self.primary, &prompt, &mut attempts).await {
      return Generation {
        text,
        outcome: Outcome::Primary {
          backend: self.primary.name().to_owned(),
        },
        attempts,
      };
    }

    if let Some(fallback) = &self.fallback
      && let Some(text) = Self::attempt(fallback, &prompt, &mut attempts).await
    {
      tracing::info!(backend = fallback.name(), "fallback backend produced the diagnosis");
      return Generation {
        text,
        outcome: Outcome::Fallback {
          backend: fallback.name().to_owned(),
        },
        attempts,
      };
    }

    let reasons = attempts
      .iter()
      .filter_map(|a| a.error.as_ref().map(|e| format!("{}: {e}", a.backend)))
      .collect::<Vec<_>>()
      .join("; ");

    Generation {
      text: format!("{FAILURE_PREFIX}: {reasons}"),
      outcome: Outcome::Failed,
      attempts,
    }
  }
}

// ─── Runtime selection ───────────────────────────────────────────────────────

/// Either generator variant, chosen by configuration.
#[derive(Debug, Clone)]
pub enum DiagnosisGenerator<B> {
  Template(TemplateGenerator),
  Delegated(DelegatedGenerator<B>),
}

impl<B: TextBackend> Generator for DiagnosisGenerator<B> {
  async fn generate(&self, machine: &str, problem: &str) -> Generation {
    match self {
      Self::Template(g) => g.generate(machine, problem).await,
      Self::Delegated(g) => g.generate(machine, problem).await,
    }
  }
}
