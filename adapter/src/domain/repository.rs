// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Rule Collection Interface
//!
//! Persistence contract for the policy rule collection. The adapter in
//! `crate::application` talks only to this trait; implementations live in
//! `crate::infrastructure`.
//!
//! | Implementation | Backend |
//! |----------------|---------|
//! | `MongoRuleCollection` | MongoDB collection (production) |
//! | `InMemoryRuleCollection` | `Vec` behind an async lock (tests, development) |
//!
//! Every implementation must enforce uniqueness of the full
//! `(ptype, v0..v5)` tuple once `ensure_unique_index` has run.

use async_trait::async_trait;

use crate::domain::rule::CasbinRule;
use crate::domain::selector::{PolicySelector, RuleSelector};

#[async_trait]
pub trait RuleCollection: Send + Sync {
    /// Create the unique compound index over `ptype, v0..v5` if missing
    async fn ensure_unique_index(&self) -> Result<(), RepositoryError>;

    /// Find all documents matching the selector (`None` matches everything)
    async fn find(&self, selector: Option<&PolicySelector>) -> Result<Vec<CasbinRule>, RepositoryError>;

    /// Remove every document, keeping the collection and its index
    async fn clear(&self) -> Result<(), RepositoryError>;

    /// Insert one document, `RepositoryError::Duplicate` if the tuple exists
    async fn insert_one(&self, rule: &CasbinRule) -> Result<(), RepositoryError>;

    /// Insert a batch of documents in one round-trip
    async fn insert_many(&self, rules: &[CasbinRule]) -> Result<(), RepositoryError>;

    /// Delete the first matching document, `RepositoryError::NotFound` if none matched
    async fn delete_one(&self, selector: &RuleSelector) -> Result<(), RepositoryError>;

    /// Delete every matching document, returning how many were removed
    async fn delete_many(&self, selector: &RuleSelector) -> Result<u64, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("No matching document: {0}")]
    NotFound(String),

    #[error("Duplicate policy rule: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}
