// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Adapter Configuration
//
// Connection settings for the MongoDB policy store:
// - YAML file format (all keys optional, defaults below)
// - CASBIN_MONGO_* environment variable overrides for container deployments

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_URI: &str = "mongodb://127.0.0.1:27017";
pub const DEFAULT_DATABASE: &str = "casbin";
pub const DEFAULT_COLLECTION: &str = "casbin_rule";

/// MongoDB policy store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoAdapterConfig {
    /// Connection string, including credentials and replica set options
    pub uri: String,

    /// Database holding the policy collection
    pub database: String,

    /// Collection holding one document per policy rule
    pub collection: String,

    /// Start in filtered mode (the enforcer will not auto-load)
    pub filtered: bool,
}

impl Default for MongoAdapterConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            filtered: false,
        }
    }
}

impl MongoAdapterConfig {
    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load from an explicit path if given, otherwise defaults; env overrides apply to both
    pub fn load_or_default(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                tracing::info!("Loading adapter configuration from {:?}", path);
                Self::from_yaml_file(&path).map_err(|e| {
                    anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("CASBIN_MONGO_URI") {
            tracing::info!("Environment override: CASBIN_MONGO_URI");
            self.uri = val;
        }
        if let Ok(val) = std::env::var("CASBIN_MONGO_DATABASE") {
            tracing::info!("Environment override: CASBIN_MONGO_DATABASE={}", val);
            self.database = val;
        }
        if let Ok(val) = std::env::var("CASBIN_MONGO_COLLECTION") {
            tracing::info!("Environment override: CASBIN_MONGO_COLLECTION={}", val);
            self.collection = val;
        }
        if let Ok(val) = std::env::var("CASBIN_MONGO_FILTERED") {
            match val.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => self.filtered = true,
                "false" | "0" | "no" | "off" => self.filtered = false,
                _ => {
                    tracing::warn!(
                        "Invalid value for CASBIN_MONGO_FILTERED: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.uri.starts_with("mongodb://") && !self.uri.starts_with("mongodb+srv://") {
            anyhow::bail!(
                "Invalid uri: '{}'. Must start with 'mongodb://' or 'mongodb+srv://'",
                self.uri
            );
        }
        if self.database.is_empty() {
            anyhow::bail!("Database name must not be empty");
        }
        if self.collection.is_empty() {
            anyhow::bail!("Collection name must not be empty");
        }
        Ok(())
    }
}
