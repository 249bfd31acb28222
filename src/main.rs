//! Layered configuration resolver CLI.
//!
//! Resolves the active environment's configuration against the override
//! layer stack and prints audit snapshots, single fields, or the registry.

use anyhow::Result;
use clap::Parser;
use layered_config::cache::load_configuration_with;
use layered_config::cli::{Cli, Command, OutputFormat, parse_override_tokens};
use layered_config::layers::LayeredSources;
use layered_config::registry::EnvironmentRegistry;
use layered_config::resolved::{ResolvedConfig, value_text};
use std::fs::OpenOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn print_text_snapshot(config: &ResolvedConfig) {
    println!("environment: {}", config.env_code());
    println!("resolved at: {}", config.resolved_at().to_rfc3339());
    for (name, value) in config.iter() {
        let source = config
            .source(name)
            .map(|layer| layer.to_string())
            .unwrap_or_default();
        println!("{:<28} = {:<40} ({})", name, value_text(value), source);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    match cli.log.as_str() {
        "0" | "off" => {
            // No logging
        }
        "1" | "stdout" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        "2" | "stderr" => {
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        filename => {
            let file = OpenOptions::new().create(true).append(true).open(filename)?;
            let subscriber = FmtSubscriber::builder()
                .with_max_level(level)
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    let mut sources = LayeredSources::new();
    if let Some(env) = &cli.env {
        sources.env_code = Some(env.clone());
    }
    if let Some(path) = &cli.env_file {
        sources.dotenv_path = Some(path.into());
    }
    if let Some(tokens) = &cli.config {
        sources.explicit = parse_override_tokens(tokens)?;
    }

    match cli.command.unwrap_or(Command::Resolve {
        format: OutputFormat::Text,
    }) {
        Command::Resolve { format } => {
            let config = load_configuration_with(&sources)?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config.to_snapshot())?);
                }
                OutputFormat::Text => print_text_snapshot(&config),
            }
        }
        Command::Get { name } => {
            let config = load_configuration_with(&sources)?;
            if let Some(value) = config.get(&name) {
                println!("{}", value_text(value));
            } else if let Some(value) = config.opaque(&name) {
                println!("{}", value_text(&value));
            } else {
                anyhow::bail!("unknown configuration field '{name}'");
            }
        }
        Command::Envs => {
            for entry in EnvironmentRegistry::builtin().entries() {
                println!(
                    "{:<6} {:<12} {:<10} {}",
                    entry.code, entry.long_name, entry.env_type, entry.description
                );
            }
        }
    }

    Ok(())
}
