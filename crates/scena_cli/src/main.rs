//! Scena CLI
//!
//! Drives the scene-session callback bridge outside a device: simulate event
//! traffic, list callback names, write a starter config.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scena_core::{ManagerEvent, RootSceneEvent, SceneSessionEvent};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod simulate;

use config::{ScenaConfig, CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "scena")]
#[command(about = "Scene-session callback bridge tooling", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Raise platform events from worker threads and report delivery
    Simulate {
        /// Config file or directory containing scena.toml
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sessions to create and expose
        #[arg(long)]
        sessions: Option<usize>,

        /// Worker threads raising events
        #[arg(long)]
        threads: Option<usize>,

        /// Events raised per thread
        #[arg(long)]
        events: Option<usize>,

        /// Finalize every k-th session wrapper mid-run
        #[arg(long)]
        destroy_every: Option<usize>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the callback names scripting code can subscribe to
    Events {
        #[arg(long)]
        json: bool,
    },

    /// Write a default scena.toml
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            sessions,
            threads,
            events,
            destroy_every,
            json,
        } => {
            let mut config = ScenaConfig::load_or_default(config.as_deref())?;
            init_logging(&config.log.level);

            let options = &mut config.simulate;
            options.sessions = sessions.unwrap_or(options.sessions);
            options.threads = threads.unwrap_or(options.threads);
            options.events = events.unwrap_or(options.events);
            options.destroy_every = destroy_every.unwrap_or(options.destroy_every);

            let summary = simulate::run(&config.scheduler, &config.simulate)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{}", summary.to_text());
            }
        }

        Commands::Events { json } => {
            let registries = [
                ("SceneSession", names(SceneSessionEvent::ALL, SceneSessionEvent::name)),
                ("SceneSessionManager", names(ManagerEvent::ALL, ManagerEvent::name)),
                ("RootSceneSession", names(RootSceneEvent::ALL, RootSceneEvent::name)),
            ];
            if json {
                let map: serde_json::Map<_, _> = registries
                    .iter()
                    .map(|(owner, names)| (owner.to_string(), serde_json::json!(names)))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (owner, names) in &registries {
                    println!("{owner}:");
                    for name in names {
                        println!("  {name}");
                    }
                }
            }
        }

        Commands::Init { path } => {
            init_logging("info");
            write_default_config(&path)?;
        }
    }

    Ok(())
}

fn names<E: Copy>(all: &[E], name: fn(E) -> &'static str) -> Vec<&'static str> {
    all.iter().map(|e| name(*e)).collect()
}

fn write_default_config(dir: &Path) -> Result<()> {
    let target = dir.join(CONFIG_FILE);
    if target.exists() {
        anyhow::bail!("{} already exists", target.display());
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    fs::write(&target, ScenaConfig::default().to_toml()?)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    tracing::info!("Wrote {}", target.display());
    Ok(())
}
