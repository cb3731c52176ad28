// SPDX-License-Identifier: MIT OR Apache-2.0
//! `Playbook` headless driver.
//!
//! Loads a board configuration, runs a script of board commands against it and
//! reports the resulting tracks and poses. Useful for reproducing editing
//! sessions without a front end.

mod script;

use clap::{Parser, Subcommand};
use playbook_timeline::{Board, BoardConfig, ConfigError};
use script::{Script, ScriptError, ScriptRunner};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "playbook")]
#[command(about = "Record and edit entity motion on a timeline from command scripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command script against a fresh board
    Run {
        /// Script file (RON)
        script: PathBuf,

        /// Board configuration file (RON); defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default board configuration as RON
    DefaultConfig,
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("playbook_app=debug,playbook_timeline=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run { script, config } => run(&script, config.as_deref()),
        Commands::DefaultConfig => print_default_config(),
    };

    if let Err(e) = result {
        tracing::error!("playbook failed: {e}");
        std::process::exit(1);
    }
}

fn run(script_path: &Path, config_path: Option<&Path>) -> Result<(), AppError> {
    let config = match config_path {
        Some(path) => BoardConfig::load(path)?,
        None => BoardConfig::default(),
    };
    let script = Script::load(script_path)?;

    tracing::info!(
        "Running {} steps on a {}-tick timeline at {} fps",
        script.steps.len(),
        config.total_ticks(),
        config.frame_rate
    );

    let mut runner = ScriptRunner::new(Board::new(&config));
    runner.run(&script);
    report(runner.board());
    Ok(())
}

fn print_default_config() -> Result<(), AppError> {
    println!("{}", BoardConfig::default().to_ron_string()?);
    Ok(())
}

fn report(board: &Board) {
    println!(
        "tick {:.1} / {}{}",
        board.current_tick(),
        board.total_ticks(),
        if board.can_undo() { " (undo available)" } else { "" }
    );

    for entity in board.entities() {
        let segments: Vec<String> = board
            .track(entity.id)
            .map(|t| {
                t.segments()
                    .iter()
                    .map(|s| format!("[{}, {})", s.start_tick, s.end_tick))
                    .collect()
            })
            .unwrap_or_default();

        println!(
            "{:>4} {:<5} x={:.3} y={:.3} angle={:.1} keyframes={} segments={}",
            entity.id.to_string(),
            entity.label(),
            entity.pose.x,
            entity.pose.y,
            entity.pose.angle,
            board.keyframes(entity.id).len(),
            segments.join(" "),
        );
    }
}
