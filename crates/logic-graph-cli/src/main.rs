//! logic-graph CLI - build, inspect and run boolean logic circuits.
//!
//! Circuits are JSON description files. Blocks are addressed by their
//! position in the file; wiring endpoints are written `<index>:<pin>` for a
//! driver and `<index>:<slot>` for a consumer.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use logic_graph_sim::{BlockKind, ConnectOutcome};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{config as config_cmd, edit, init::Template, parse_endpoint, run, snapshot};
use config::Config;

/// Exit status when a connection is refused because it would close a loop.
const EXIT_LOOP_REJECTED: i32 = 2;

/// logic-graph CLI - simulate boolean logic circuits.
#[derive(Parser, Debug)]
#[command(
    name = "lg",
    author,
    version,
    about = "logic-graph: build, inspect and run boolean logic circuits",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a starter circuit.
    Init {
        /// Circuit file to create.
        file: PathBuf,

        /// Which circuit to start from.
        #[arg(short, long, value_enum, default_value = "blinker")]
        template: Template,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print blocks, wiring and current outputs.
    Show {
        file: PathBuf,

        /// Print the raw JSON description instead.
        #[arg(long)]
        json: bool,
    },

    /// Run in real time, driven by a frame timer.
    Run {
        file: PathBuf,

        /// Ticks per second (defaults to the configured speed).
        #[arg(short, long)]
        speed: Option<f64>,

        /// How long to run.
        #[arg(long, default_value_t = 1.0)]
        seconds: f64,

        /// Host frames per second (defaults to the configured frame rate).
        #[arg(long)]
        frame_rate: Option<f64>,

        /// Print LED states on every frame that ticked.
        #[arg(long)]
        trace: bool,

        /// Write the final state back to the file.
        #[arg(long)]
        save: bool,
    },

    /// Take discrete ticks, ignoring real time.
    Step {
        file: PathBuf,

        /// Number of ticks.
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Write the final state back to the file.
        #[arg(long)]
        save: bool,
    },

    /// Append a block.
    Add {
        file: PathBuf,

        /// Block kind (AND, OR, XOR, NOT, TOGGLE, LED, DELAY, NODE).
        kind: BlockKind,

        #[arg(short, long)]
        label: Option<String>,
    },

    /// Wire a driver pin into an input slot. Exits with status 2 if the wire
    /// would close a combinational loop.
    Connect {
        file: PathBuf,

        /// Driver as `<index>:<pin>`.
        from: String,

        /// Consumer as `<index>:<slot>`.
        to: String,
    },

    /// Tie an input slot low.
    Disconnect {
        file: PathBuf,

        /// Consumer as `<index>:<slot>`.
        target: String,
    },

    /// Delete a block. Wires it drove are tied low.
    Delete { file: PathBuf, index: usize },

    /// Flip a TOGGLE block, or set it with --on/--off.
    Toggle {
        file: PathBuf,
        index: usize,

        #[arg(long, conflicts_with = "off")]
        on: bool,

        #[arg(long)]
        off: bool,
    },

    /// Save a timestamped copy of a circuit to the store.
    Snapshot {
        file: PathBuf,

        #[arg(short, long)]
        label: Option<String>,
    },

    /// List stored snapshots, newest first.
    Snapshots,

    /// Write the newest stored snapshot to a circuit file.
    Restore { file: PathBuf },

    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration.
    Show,

    /// Set a configuration value.
    Set {
        /// Configuration key.
        key: String,
        /// Configuration value.
        value: String,
    },

    /// Get a configuration value.
    Get {
        /// Configuration key.
        key: String,
    },

    /// Reset configuration to defaults.
    Reset,

    /// Show path to config file.
    Path,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing: explicit flags win, then RUST_LOG, then warnings only.
    let filter = if cli.quiet {
        EnvFilter::default().add_directive(Level::ERROR.into())
    } else if cli.verbose {
        EnvFilter::default().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::WARN.into()))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load()?;

    match cli.command {
        Commands::Init {
            file,
            template,
            force,
        } => {
            commands::init::execute(&file, template, force)?;
        }

        Commands::Show { file, json } => {
            commands::show::execute(&config, &file, json)?;
        }

        Commands::Run {
            file,
            speed,
            seconds,
            frame_rate,
            trace,
            save,
        } => {
            let options = run::RunOptions {
                speed: speed.unwrap_or(config.speed),
                seconds,
                frame_rate: frame_rate.unwrap_or(config.frame_rate),
                trace,
                save,
            };
            run::execute(&config, &file, options).await?;
        }

        Commands::Step { file, count, save } => {
            run::step(&config, &file, count, save)?;
        }

        Commands::Add { file, kind, label } => {
            edit::add(&config, &file, kind, label)?;
        }

        Commands::Connect { file, from, to } => {
            let from = parse_endpoint(&from)?;
            let to = parse_endpoint(&to)?;
            if edit::connect(&config, &file, from, to)? == ConnectOutcome::LoopRejected {
                std::process::exit(EXIT_LOOP_REJECTED);
            }
        }

        Commands::Disconnect { file, target } => {
            edit::disconnect(&config, &file, parse_endpoint(&target)?)?;
        }

        Commands::Delete { file, index } => {
            edit::delete(&config, &file, index)?;
        }

        Commands::Toggle {
            file,
            index,
            on,
            off,
        } => {
            let value = match (on, off) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            edit::toggle(&config, &file, index, value)?;
        }

        Commands::Snapshot { file, label } => {
            snapshot::create(&config, &file, label)?;
        }

        Commands::Snapshots => {
            snapshot::list(&config)?;
        }

        Commands::Restore { file } => {
            snapshot::restore(&config, &file)?;
        }

        Commands::Config(config_cmd_inner) => {
            let mut config = config;
            match config_cmd_inner {
                ConfigCommands::Show => {
                    config_cmd::show(&config)?;
                }
                ConfigCommands::Set { key, value } => {
                    config_cmd::set(&mut config, &key, &value)?;
                }
                ConfigCommands::Get { key } => {
                    config_cmd::get(&config, &key)?;
                }
                ConfigCommands::Reset => {
                    config_cmd::reset()?;
                }
                ConfigCommands::Path => {
                    if let Some(path) = Config::config_file_path() {
                        println!("{}", path.display());
                    } else {
                        println!("(no config file path available)");
                    }
                }
            }
        }
    }

    Ok(())
}
