// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Casbin MongoDB Adapter
//!
//! Stores Casbin policy rules one document per rule in a MongoDB collection
//! and keeps an in-memory Casbin model in sync with it.
//!
//! # Architecture
//!
//! - **Layer:** Persistence Adapter
//! - **Purpose:** Implements `casbin::Adapter` over a document collection
//!
//! ```no_run
//! use casbin::prelude::*;
//! use casbin_mongo_adapter::{MongoAdapter, MongoAdapterConfig};
//!
//! # async fn run() -> casbin::Result<()> {
//! let adapter = MongoAdapter::connect(&MongoAdapterConfig::default()).await?;
//! let mut enforcer = Enforcer::new("rbac_model.conf", adapter).await?;
//! enforcer.add_policy(vec!["alice".into(), "data1".into(), "read".into()]).await?;
//! assert!(enforcer.enforce(("alice", "data1", "read"))?);
//! # Ok(())
//! # }
//! ```

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::{AdapterError, LoadState, MongoAdapter};
pub use infrastructure::{InMemoryRuleCollection, MongoAdapterConfig, MongoRuleCollection};
