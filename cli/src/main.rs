// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Casbin MongoDB CLI
//!
//! The `casbin-mongo` binary drives a Casbin enforcer whose policy lives in a
//! MongoDB collection through `casbin-mongo-adapter`.
//!
//! ## Commands
//!
//! - `casbin-mongo policy list|enforce|add|remove|remove-filtered|save` - Policy operations
//! - `casbin-mongo config show|validate` - Configuration management
//!
//! Connection settings come from `--config`, then `CASBIN_MONGO_*` variables
//! (a `.env` file is honored), then the flags below.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod model;

use casbin_mongo_adapter::MongoAdapterConfig;
use commands::{ConfigCommand, PolicyCommand};

/// Manage Casbin policy stored in MongoDB
#[derive(Parser)]
#[command(name = "casbin-mongo")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to adapter configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "CASBIN_MONGO_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// MongoDB connection string (overrides config)
    #[arg(long, global = true)]
    uri: Option<String>,

    /// Database name (overrides config)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Collection name (overrides config)
    #[arg(long, global = true)]
    collection: Option<String>,

    /// Casbin model file (default: built-in RBAC model)
    #[arg(short, long, global = true, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "CASBIN_MONGO_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Policy operations
    #[command(name = "policy")]
    Policy {
        #[command(subcommand)]
        command: PolicyCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Policy { command } => {
            commands::policy::handle_command(command, &config, cli.model).await
        }
        Commands::Config { command } => commands::config::handle_command(command, &config),
    }
}

fn load_config(cli: &Cli) -> Result<MongoAdapterConfig> {
    let mut config = MongoAdapterConfig::load_or_default(cli.config.clone())
        .context("Failed to load adapter configuration")?;

    if let Some(uri) = &cli.uri {
        config.uri = uri.clone();
    }
    if let Some(database) = &cli.database {
        config.database = database.clone();
    }
    if let Some(collection) = &cli.collection {
        config.collection = collection.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
