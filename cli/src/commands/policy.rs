// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Policy commands
//!
//! Commands: list, enforce, add, remove, remove-filtered, save
//!
//! Every command builds an enforcer over the MongoDB adapter. Changes made by
//! `add`, `remove` and `remove-filtered` are written through immediately;
//! `save` rewrites the whole collection from the loaded model.

use anyhow::{Context, Result};
use casbin::prelude::*;
use casbin::error::AdapterError as CasbinAdapterError;
use casbin::Filter;
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use casbin_mongo_adapter::{AdapterError, MongoAdapter, MongoAdapterConfig, RepositoryError};

use crate::model::load_model;

#[derive(Subcommand)]
pub enum PolicyCommand {
    /// List stored rules
    List {
        /// Only load permission rules for this subject
        #[arg(long)]
        subject: Option<String>,
    },

    /// Check whether a request is allowed
    Enforce {
        subject: String,
        object: String,
        action: String,
    },

    /// Add one rule (ptype "p*" for permissions, "g*" for roles)
    Add {
        ptype: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove one rule
    Remove {
        ptype: String,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Remove every rule matching values from a field index on ("" matches anything)
    RemoveFiltered {
        ptype: String,
        field_index: usize,
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Rewrite the collection from the loaded policy
    Save,
}

pub async fn handle_command(
    command: PolicyCommand,
    config: &MongoAdapterConfig,
    model_path: Option<PathBuf>,
) -> Result<()> {
    // A filtered adapter never auto-loads, so saving would wipe the store
    if matches!(command, PolicyCommand::Save) && config.filtered {
        anyhow::bail!("cannot save a filtered policy");
    }

    let mut enforcer = build_enforcer(config, model_path).await?;

    match command {
        PolicyCommand::List { subject } => list(&mut enforcer, subject).await,
        PolicyCommand::Enforce { subject, object, action } => {
            enforce(&enforcer, &subject, &object, &action)
        }
        PolicyCommand::Add { ptype, values } => add(&mut enforcer, &ptype, values).await,
        PolicyCommand::Remove { ptype, values } => remove(&mut enforcer, &ptype, values).await,
        PolicyCommand::RemoveFiltered { ptype, field_index, values } => {
            remove_filtered(&mut enforcer, &ptype, field_index, values).await
        }
        PolicyCommand::Save => save(&mut enforcer).await,
    }
}

async fn build_enforcer(config: &MongoAdapterConfig, model_path: Option<PathBuf>) -> Result<Enforcer> {
    let model = load_model(model_path.as_deref()).await?;
    let adapter = MongoAdapter::connect(config)
        .await
        .context("Failed to open MongoDB policy store")?;
    let enforcer = Enforcer::new(model, adapter)
        .await
        .context("Failed to create enforcer")?;
    Ok(enforcer)
}

fn is_grouping(ptype: &str) -> bool {
    ptype.starts_with('g')
}

fn is_duplicate_rule(err: &casbin::Error) -> bool {
    match err {
        casbin::Error::AdapterError(CasbinAdapterError(inner)) => matches!(
            inner.downcast_ref::<AdapterError>(),
            Some(AdapterError::Repository(RepositoryError::Duplicate(_)))
        ),
        _ => false,
    }
}

async fn list(enforcer: &mut Enforcer, subject: Option<String>) -> Result<()> {
    if let Some(subject) = &subject {
        enforcer
            .load_filtered_policy(Filter { p: vec![subject.as_str()], g: vec![] })
            .await
            .context("Failed to load filtered policy")?;
    }

    println!("{}", "Permission rules:".bold());
    for rule in enforcer.get_policy() {
        println!("  p, {}", rule.join(", "));
    }
    println!("{}", "Role rules:".bold());
    for rule in enforcer.get_grouping_policy() {
        println!("  g, {}", rule.join(", "));
    }
    Ok(())
}

fn enforce(enforcer: &Enforcer, subject: &str, object: &str, action: &str) -> Result<()> {
    let allowed = enforcer
        .enforce((subject, object, action))
        .context("Failed to evaluate request")?;

    if allowed {
        println!("{} {} {} {}", "ALLOW".green().bold(), subject, object, action);
    } else {
        println!("{} {} {} {}", "DENY".red().bold(), subject, object, action);
    }
    Ok(())
}

async fn add(enforcer: &mut Enforcer, ptype: &str, values: Vec<String>) -> Result<()> {
    let result = if is_grouping(ptype) {
        enforcer.add_named_grouping_policy(ptype, values).await
    } else {
        enforcer.add_named_policy(ptype, values).await
    };

    // The model only knows loaded rules; the store's unique index catches the rest
    let added = match result {
        Ok(added) => added,
        Err(e) if is_duplicate_rule(&e) => false,
        Err(e) => return Err(e.into()),
    };

    if added {
        info!(ptype, "Rule added");
        println!("{}", "✓ Rule added".green());
    } else {
        println!("{}", "Rule already present".yellow());
    }
    Ok(())
}

async fn remove(enforcer: &mut Enforcer, ptype: &str, values: Vec<String>) -> Result<()> {
    let removed = if is_grouping(ptype) {
        enforcer.remove_named_grouping_policy(ptype, values).await?
    } else {
        enforcer.remove_named_policy(ptype, values).await?
    };

    if removed {
        println!("{}", "✓ Rule removed".green());
    } else {
        println!("{}", "Rule not present".yellow());
    }
    Ok(())
}

async fn remove_filtered(
    enforcer: &mut Enforcer,
    ptype: &str,
    field_index: usize,
    values: Vec<String>,
) -> Result<()> {
    let removed = if is_grouping(ptype) {
        enforcer
            .remove_filtered_named_grouping_policy(ptype, field_index, values)
            .await?
    } else {
        enforcer
            .remove_filtered_named_policy(ptype, field_index, values)
            .await?
    };

    if removed {
        println!("{}", "✓ Matching rules removed".green());
    } else {
        println!("{}", "No loaded rule matched".yellow());
    }
    Ok(())
}

async fn save(enforcer: &mut Enforcer) -> Result<()> {
    enforcer.save_policy().await.context("Failed to save policy")?;
    println!("{}", "✓ Policy saved".green());
    Ok(())
}
