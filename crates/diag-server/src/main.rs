//! `diag`: maintenance diagnosis service.
//!
//! Reads `diag.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the HTTP API or runs a one-shot command against
//! the same store.
//!
//! ```text
//! diag serve
//! diag submit --machine "Forno 1" --problem "aquecimento lento" --urgency Alta
//! diag history
//! diag export --output diagnosticos.csv
//! ```

mod settings;

use std::{fs::File, io, path::PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use diag_api::ApiState;
use diag_core::{
  export,
  record::{DiagnosisRecord, Submission, Urgency},
  seed::seed_if_empty,
  store::RecordStore,
  submit::submit,
  view::HistoryView,
};
use diag_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::AppConfig;

#[derive(Parser)]
#[command(author, version, about = "Maintenance diagnosis service")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "diag.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API.
  Serve,
  /// Generate and record one diagnosis.
  Submit {
    #[arg(short, long)]
    machine: String,
    #[arg(short, long, default_value = "")]
    problem: String,
    /// Baixa, Média or Alta.
    #[arg(short, long, default_value = "Média")]
    urgency: Urgency,
  },
  /// List every recorded diagnosis, most recent first.
  History {
    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
  },
  /// Print totals and per-machine / per-urgency counts.
  Dashboard,
  /// Write the history as CSV.
  Export {
    /// Destination file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
  /// Delete every recorded diagnosis.
  Clear {
    /// Confirm the deletion.
    #[arg(long)]
    yes: bool,
  },
  /// Insert demo records into an empty store.
  Seed,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so `export` and `history --json` stay pipeable.
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = AppConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  match cli.command {
    Command::Serve => serve(cfg, store).await,
    Command::Submit {
      machine,
      problem,
      urgency,
    } => {
      let generator = cfg.generator.build()?;
      let submitted = submit(&store, &generator, Submission::new(machine, problem, urgency))
        .await
        .context("submission failed")?;

      if submitted.generation.is_failure() {
        tracing::warn!("every generation backend failed; the error text was stored");
      }
      println!("#{} {}", submitted.record.id, submitted.record.machine);
      println!("{}", submitted.record.diagnosis);
      Ok(())
    }
    Command::History { json } => {
      let records = store.list_all().await?;
      if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
      } else if records.is_empty() {
        println!("Histórico vazio.");
      } else {
        for record in &records {
          print_record(record);
        }
      }
      Ok(())
    }
    Command::Dashboard => {
      let view = HistoryView::load(&store).await?;
      print_dashboard(&view);
      Ok(())
    }
    Command::Export { output } => {
      let records = store.list_all().await?;
      match output {
        Some(path) => {
          let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
          export::write_csv(&records, file)?;
          tracing::info!(rows = records.len(), path = %path.display(), "exported history");
        }
        None => export::write_csv(&records, io::stdout().lock())?,
      }
      Ok(())
    }
    Command::Clear { yes } => {
      if !yes {
        bail!("refusing to delete every diagnosis without --yes");
      }
      let removed = store.clear().await?;
      println!("{removed} diagnósticos removidos.");
      Ok(())
    }
    Command::Seed => {
      let inserted = seed_if_empty(&store).await?;
      println!("{inserted} diagnósticos de exemplo inseridos.");
      Ok(())
    }
  }
}

async fn serve(cfg: AppConfig, store: SqliteStore) -> anyhow::Result<()> {
  if cfg.seed_samples {
    seed_if_empty(&store).await?;
  }

  let generator = cfg.generator.build()?;
  let app = diag_api::api_router(ApiState::new(store, generator))
    .layer(TraceLayer::new_for_http());
  let address = cfg.address();

  tracing::info!(mode = ?cfg.generator.mode, "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      tokio::signal::ctrl_c().await.ok();
    })
    .await
    .context("server error")?;

  Ok(())
}

fn print_record(record: &DiagnosisRecord) {
  let problem = match record.problem.as_str() {
    "" => "—",
    p => p,
  };
  println!(
    "#{} {} [{}] {}",
    record.id,
    record.created_at.format("%d/%m/%Y %H:%M"),
    record.urgency,
    record.machine
  );
  println!("    Problema relatado: {problem}");
  println!("    Diagnóstico: {}", record.diagnosis);
}

fn print_dashboard(view: &HistoryView) {
  println!("Diagnósticos registrados: {}", view.total);
  match &view.latest {
    Some(latest) => println!(
      "Máquina mais recente: {} ({})",
      latest.machine,
      latest.created_at.format("%d/%m/%Y %H:%M")
    ),
    None => println!("Máquina mais recente: —"),
  }

  println!("\nPor máquina:");
  for entry in &view.by_machine {
    println!("  {:<24} {}", entry.machine, entry.count);
  }

  println!("\nPor urgência:");
  for entry in &view.by_urgency {
    println!("  {:<24} {}", entry.urgency.label(), entry.count);
  }
}
