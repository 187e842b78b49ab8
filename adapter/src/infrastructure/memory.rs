// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! In-memory rule collection
//!
//! Keeps documents in insertion order, so reads come back in the order they
//! were written. Uniqueness of the rule tuple is always enforced.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::repository::{RepositoryError, RuleCollection};
use crate::domain::rule::CasbinRule;
use crate::domain::selector::{PolicySelector, RuleSelector};

#[derive(Clone, Default)]
pub struct InMemoryRuleCollection {
    rules: Arc<RwLock<Vec<CasbinRule>>>,
}

impl InMemoryRuleCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the stored documents
    pub async fn documents(&self) -> Vec<CasbinRule> {
        self.rules.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.rules.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rules.read().await.is_empty()
    }
}

#[async_trait]
impl RuleCollection for InMemoryRuleCollection {
    async fn ensure_unique_index(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn find(&self, selector: Option<&PolicySelector>) -> Result<Vec<CasbinRule>, RepositoryError> {
        let rules = self.rules.read().await;
        Ok(rules
            .iter()
            .filter(|rule| selector.map_or(true, |s| s.matches(rule)))
            .cloned()
            .collect())
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        self.rules.write().await.clear();
        Ok(())
    }

    async fn insert_one(&self, rule: &CasbinRule) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().await;
        if rules.contains(rule) {
            return Err(RepositoryError::Duplicate(format!("{:?}", rule)));
        }
        rules.push(rule.clone());
        Ok(())
    }

    async fn insert_many(&self, batch: &[CasbinRule]) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().await;
        // Ordered insert: documents before the first duplicate are kept
        for rule in batch {
            if rules.contains(rule) {
                return Err(RepositoryError::Duplicate(format!("{:?}", rule)));
            }
            rules.push(rule.clone());
        }
        Ok(())
    }

    async fn delete_one(&self, selector: &RuleSelector) -> Result<(), RepositoryError> {
        let mut rules = self.rules.write().await;
        match rules.iter().position(|rule| selector.matches(rule)) {
            Some(index) => {
                rules.remove(index);
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("{:?}", selector))),
        }
    }

    async fn delete_many(&self, selector: &RuleSelector) -> Result<u64, RepositoryError> {
        let mut rules = self.rules.write().await;
        let before = rules.len();
        rules.retain(|rule| !selector.matches(rule));
        Ok((before - rules.len()) as u64)
    }
}
