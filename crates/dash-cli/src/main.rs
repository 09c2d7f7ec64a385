//! dashctl - replay dashboard commands offline
//!
//! Usage:
//!   dashctl replay --dashboard <file> --commands <file>   Run commands against a dashboard
//!   dashctl check <file>                                  Report invariant violations
//!   dashctl config init [path]                            Write the default engine config

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dash_core::{DashboardState, EngineConfig};
use dash_engine::{
    AuditLogHook, CatalogDateDataset, Command, Dispatcher, DisplayFormMetadata, InMemoryBackend,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "dashctl")]
#[command(author, version, about = "Dashboard command engine tooling")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command list against a dashboard and print the result
    Replay {
        /// Dashboard state (JSON)
        #[arg(long, value_name = "FILE")]
        dashboard: PathBuf,

        /// Commands to dispatch in order (JSON array)
        #[arg(long, value_name = "FILE")]
        commands: PathBuf,

        /// Engine config (TOML); defaults apply when absent
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Backend catalog (JSON) with display forms and date data sets
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,

        /// Write the final state here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write every emitted event here (JSON array)
        #[arg(long, value_name = "FILE")]
        events: Option<PathBuf>,

        /// Stop at the first command that does not complete
        #[arg(long)]
        strict: bool,
    },

    /// Check a dashboard state for structural violations
    Check {
        /// Dashboard state (JSON)
        dashboard: PathBuf,
    },

    /// Engine config management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default config
    Init {
        #[arg(default_value = "dash-engine.toml")]
        path: PathBuf,
    },
    /// Validate a config and print the effective values
    Show { path: PathBuf },
}

/// Catalog served by the in-memory backend
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    #[serde(default)]
    display_forms: Vec<DisplayFormMetadata>,
    #[serde(default)]
    date_datasets: Vec<CatalogDateDataset>,
}

impl Catalog {
    fn into_backend(self) -> InMemoryBackend {
        let backend = self.display_forms.into_iter().fold(InMemoryBackend::new(), |b, df| {
            b.with_display_form(df.obj_ref, df.attribute, &df.title)
        });
        self.date_datasets
            .into_iter()
            .fold(backend, |b, ds| b.with_date_dataset(ds.data_set, &ds.title))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Replay {
            dashboard,
            commands,
            config,
            catalog,
            output,
            events,
            strict,
        } => cmd_replay(dashboard, commands, config, catalog, output, events, strict).await,
        Commands::Check { dashboard } => cmd_check(dashboard).await,
        Commands::Config { action } => cmd_config(action),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {} from {:?}", what, path))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid {} in {:?}", what, path))
}

async fn cmd_replay(
    dashboard: PathBuf,
    commands: PathBuf,
    config: Option<PathBuf>,
    catalog: Option<PathBuf>,
    output: Option<PathBuf>,
    events: Option<PathBuf>,
    strict: bool,
) -> Result<()> {
    let state: DashboardState = read_json(&dashboard, "dashboard").await?;
    let commands: Vec<Command> = read_json(&commands, "commands").await?;
    let config = match config {
        Some(path) => EngineConfig::load_or_default(&path)?,
        None => EngineConfig::default(),
    };
    let catalog = match catalog {
        Some(path) => read_json::<Catalog>(&path, "catalog").await?,
        None => Catalog::default(),
    };

    let dispatcher = Dispatcher::builder(state, Arc::new(catalog.into_backend()))
        .config(config)
        .hook(Box::new(AuditLogHook))
        .build()
        .context("Dashboard rejected")?;

    info!("Replaying {} command(s)", commands.len());
    let mut failed = 0usize;
    for command in commands {
        let kind = command.payload.kind();
        let outcome = dispatcher.dispatch_and_wait(command).await;
        let event = outcome.event();
        if outcome.is_completed() {
            println!("  ok    {:<32} {} -> {}", kind, outcome.correlation_id, event.kind());
        } else {
            failed += 1;
            println!(
                "  FAIL  {:<32} {} -> {}",
                kind,
                outcome.correlation_id,
                serde_json::to_string(&event.payload)?
            );
            if strict {
                warn!("Stopping at first failure");
                break;
            }
        }
    }

    if let Some(path) = events {
        let emitted = dispatcher.emitted_events();
        tokio::fs::write(&path, serde_json::to_string_pretty(&emitted)?).await?;
        info!("Wrote {} event(s) to {:?}", emitted.len(), path);
    }

    let rendered = serde_json::to_string_pretty(dispatcher.state().as_ref())?;
    match output {
        Some(path) => {
            tokio::fs::write(&path, rendered).await?;
            info!("Wrote final state to {:?}", path);
        }
        None => println!("{}", rendered),
    }

    if strict && failed > 0 {
        bail!("{} command(s) did not complete", failed);
    }
    Ok(())
}

async fn cmd_check(dashboard: PathBuf) -> Result<()> {
    let state: DashboardState = read_json(&dashboard, "dashboard").await?;
    let violations = dash_store::invariants::violations(&state);
    if violations.is_empty() {
        println!("{}: ok", dashboard.display());
        return Ok(());
    }

    println!("{}: {} violation(s)", dashboard.display(), violations.len());
    for violation in &violations {
        println!("  - {}", violation);
    }
    bail!("dashboard state is invalid")
}

fn cmd_config(action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Init { path } => {
            if path.exists() {
                bail!("{:?} already exists", path);
            }
            EngineConfig::write_default(&path)?;
            println!("Wrote default config to {:?}", path);
        }
        ConfigCommands::Show { path } => {
            let config = EngineConfig::load(&path)?;
            println!(
                "Layout:  height {}..={}, width {}..={}",
                config.layout.min_height,
                config.layout.max_height,
                config.layout.min_width,
                config.layout.max_width
            );
            println!("Undo:    {} entries", config.undo.limit);
            println!(
                "Events:  capacity {}, history {}",
                config.events.capacity, config.events.history_limit
            );
            println!("Store:   verify invariants = {}", config.store.verify_invariants);
        }
    }
    Ok(())
}
