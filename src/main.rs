use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scriptbind::pipeline::{self, PipelineArgs};
use scriptbind_emitter::EmitOptions;

/// Annotation-driven binding generator for the engine scripting layer.
#[derive(Debug, Parser)]
#[command(name = "scriptbind", version, about)]
struct Cli {
    /// Path to a source file carrying ///@ tags (repeatable)
    #[arg(long = "meta", required = true)]
    meta: Vec<PathBuf>,

    /// Directory for the generated output set
    #[arg(long = "output")]
    output: PathBuf,

    /// Build hash baked into the version header
    #[arg(long = "build-hash")]
    build_hash: String,

    /// Dev game name and version
    #[arg(long = "dev-name")]
    dev_name: String,

    /// Game name and version
    #[arg(long = "game-name")]
    game_name: String,

    /// Game version
    #[arg(long = "game-version")]
    game_version: String,

    /// Debug config entry as key,value; a value starting with + appends
    #[arg(long = "config")]
    config: Vec<String>,

    /// Generate the AngelScript backend
    #[arg(long)]
    angelscript: bool,

    /// Generate the Mono backend
    #[arg(long)]
    mono: bool,

    /// Generate the native backend
    #[arg(long)]
    native: bool,

    /// Verbose logging
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let args = PipelineArgs {
        meta: cli.meta,
        output: cli.output,
        build_hash: cli.build_hash,
        dev_name: cli.dev_name,
        game_name: cli.game_name,
        game_version: cli.game_version,
        config: cli.config,
        backends: EmitOptions {
            angelscript: cli.angelscript,
            mono: cli.mono,
            native: cli.native,
        },
    };

    ExitCode::from(pipeline::run(&args) as u8)
}
