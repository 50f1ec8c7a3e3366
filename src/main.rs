//! tempstack CLI
//!
//! Usage:
//!   tempstack render [OPTIONS] <IDS>...
//!   tempstack check-config [--config <FILE>]
//!
//! Rendered JSON goes to stdout; logs go to stderr.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tempstack::{Args, Config, Engine};

#[derive(Parser)]
#[command(name = "tempstack")]
#[command(about = "Compose JSON documents from a directory tree of templates")]
struct Cli {
    /// Config file (TOML); defaults to ./tempstack.toml when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log composition steps to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render template ids into one JSON document
    Render {
        /// Template ids, mounted in order
        #[arg(required = true)]
        ids: Vec<String>,

        /// Template root directory
        #[arg(short, long)]
        template_dir: Option<PathBuf>,

        /// Arguments as a JSON object
        #[arg(short, long, conflicts_with = "args_file")]
        args: Option<String>,

        /// File holding arguments as a JSON object
        #[arg(long)]
        args_file: Option<PathBuf>,

        /// Print compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the effective configuration
    CheckConfig,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => fail(&e),
    };

    match cli.command {
        Command::CheckConfig => match toml::to_string_pretty(&config) {
            Ok(text) => print!("{}", text),
            Err(e) => fail(&e),
        },
        Command::Render {
            ids,
            template_dir,
            args,
            args_file,
            compact,
        } => {
            let config = match template_dir {
                Some(dir) => config.with_template_dir(dir),
                None => config,
            };
            let args = match read_args(args.as_deref(), args_file.as_deref()) {
                Ok(args) => args,
                Err(e) => fail(&e),
            };
            debug!(?ids, template_dir = %config.template_dir.display(), "render");

            let output = match Engine::new(config).render(&ids, &args) {
                Ok(output) => output,
                Err(e) => fail(&e),
            };
            let json = output.into_json();
            let text = if compact {
                serde_json::to_string(&json)
            } else {
                serde_json::to_string_pretty(&json)
            };
            match text {
                Ok(text) => println!("{}", text),
                Err(e) => fail(&e),
            }
        }
    }
}

fn read_args(inline: Option<&str>, file: Option<&std::path::Path>) -> Result<Args, String> {
    let text = match (inline, file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .map_err(|e| format!("Error reading args file '{}': {}", path.display(), e))?,
        (None, None) => return Ok(Args::new()),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(args)) => Ok(args),
        Ok(_) => Err("args must be a JSON object".to_string()),
        Err(e) => Err(format!("invalid args JSON: {}", e)),
    }
}

fn fail(error: &dyn std::fmt::Display) -> ! {
    eprintln!("Error: {}", error);
    std::process::exit(1);
}
