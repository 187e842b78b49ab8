// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Casbin Policy Adapter
//!
//! Synchronizes a Casbin in-memory model with a `RuleCollection`. Every rule
//! crossing the boundary goes through the codec in `crate::domain::rule`.
//!
//! ## Load state
//!
//! The adapter is either `Unfiltered` or `Filtered`. Only load calls change
//! the state: a load without a selector makes it `Unfiltered`, a load with
//! one makes it `Filtered`. `save_policy` replaces the whole collection, so it
//! is refused while `Filtered`; otherwise it would drop every rule the filter
//! left out of the model.
//!
//! ## Failure modes
//!
//! - Store errors are returned unchanged, never retried.
//! - Saving is delete-then-insert without a transaction. If the insert fails
//!   the collection is left empty; the model is untouched and the caller can
//!   save again.
//! - Removing a rule that is not stored succeeds.
//!
//! The state flag is not synchronized. `casbin::Adapter` methods take
//! `&mut self`, so callers sharing one adapter must already serialize access.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Implements `casbin::Adapter` on top of `RuleCollection`

use async_trait::async_trait;
use casbin::error::AdapterError as CasbinAdapterError;
use casbin::{Adapter, Filter, Model};
use tracing::{debug, warn};

use crate::domain::repository::{RepositoryError, RuleCollection};
use crate::domain::rule::CasbinRule;
use crate::domain::selector::{PolicySelector, RuleSelector};
use crate::infrastructure::config::MongoAdapterConfig;
use crate::infrastructure::mongo::MongoRuleCollection;

/// Sections persisted by `save_policy`, in write order.
const PERSISTED_SECTIONS: [&str; 2] = ["p", "g"];

/// Whether the most recent load covered the whole collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unfiltered,
    Filtered,
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("cannot save a filtered policy")]
    FilteredSave,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AdapterError> for casbin::Error {
    fn from(err: AdapterError) -> Self {
        CasbinAdapterError(Box::new(err)).into()
    }
}

pub struct MongoAdapter<C: RuleCollection = MongoRuleCollection> {
    collection: C,
    state: LoadState,
}

impl MongoAdapter<MongoRuleCollection> {
    /// Connect using `config`; `config.filtered` selects the filtered constructor.
    pub async fn connect(config: &MongoAdapterConfig) -> Result<Self, AdapterError> {
        let collection = MongoRuleCollection::connect(config).await?;
        if config.filtered {
            Self::new_filtered(collection).await
        } else {
            Self::new(collection).await
        }
    }

    /// Connect using `config` and start `Filtered` regardless of `config.filtered`.
    pub async fn connect_filtered(config: &MongoAdapterConfig) -> Result<Self, AdapterError> {
        let collection = MongoRuleCollection::connect(config).await?;
        Self::new_filtered(collection).await
    }
}

impl<C: RuleCollection> MongoAdapter<C> {
    /// Create an adapter over `collection`, ensuring the unique rule index exists.
    pub async fn new(collection: C) -> Result<Self, AdapterError> {
        Self::with_state(collection, LoadState::Unfiltered).await
    }

    /// Like `new`, but starts `Filtered`: Casbin will not call `load_policy`
    /// when the adapter is registered, and saving is refused until a full load.
    pub async fn new_filtered(collection: C) -> Result<Self, AdapterError> {
        Self::with_state(collection, LoadState::Filtered).await
    }

    async fn with_state(collection: C, state: LoadState) -> Result<Self, AdapterError> {
        collection.ensure_unique_index().await?;
        Ok(Self { collection, state })
    }

    pub fn collection(&self) -> &C {
        &self.collection
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Load the rules matching `selector` into `m`, or every rule for `None`.
    ///
    /// Returns how many rules the model accepted. A selector matching nothing
    /// is not an error.
    pub async fn load_selected_policy(
        &mut self,
        m: &mut dyn Model,
        selector: Option<PolicySelector>,
    ) -> Result<usize, AdapterError> {
        self.state = match selector {
            Some(_) => LoadState::Filtered,
            None => LoadState::Unfiltered,
        };

        let records = self.collection.find(selector.as_ref()).await?;
        let total = records.len();
        let mut loaded = 0;

        for record in records {
            let (ptype, values) = record.decode();
            if values.is_empty() {
                warn!(ptype = %ptype, "Skipping stored policy rule without values");
                continue;
            }
            if m.add_policy(record.section(), &ptype, values) {
                loaded += 1;
            } else {
                debug!(ptype = %ptype, "Model did not accept stored policy rule");
            }
        }

        debug!(total, loaded, state = ?self.state, "Loaded policy");
        Ok(loaded)
    }

    /// Replace the stored rules with every "p" and "g" rule in `m`.
    pub async fn save_all(&mut self, m: &dyn Model) -> Result<(), AdapterError> {
        if self.state == LoadState::Filtered {
            return Err(AdapterError::FilteredSave);
        }

        let mut lines = Vec::new();
        for sec in PERSISTED_SECTIONS {
            let Some(assertions) = m.get_model().get(sec) else {
                continue;
            };
            for (ptype, assertion) in assertions {
                lines.extend(
                    assertion
                        .get_policy()
                        .iter()
                        .map(|rule| CasbinRule::from_rule(ptype, rule)),
                );
            }
        }

        self.collection.clear().await?;
        if !lines.is_empty() {
            self.collection.insert_many(&lines).await?;
        }

        debug!(rules = lines.len(), "Saved policy");
        Ok(())
    }

    /// Store one rule. Fails with `RepositoryError::Duplicate` if it already exists.
    pub async fn insert_rule(&self, ptype: &str, rule: &[String]) -> Result<(), AdapterError> {
        let line = CasbinRule::from_rule(ptype, rule);
        self.collection.insert_one(&line).await?;
        debug!(ptype, "Added policy rule");
        Ok(())
    }

    pub async fn insert_rules(&self, ptype: &str, rules: &[Vec<String>]) -> Result<(), AdapterError> {
        if rules.is_empty() {
            return Ok(());
        }
        let lines: Vec<CasbinRule> = rules
            .iter()
            .map(|rule| CasbinRule::from_rule(ptype, rule))
            .collect();
        self.collection.insert_many(&lines).await?;
        debug!(ptype, count = lines.len(), "Added policy rules");
        Ok(())
    }

    /// Delete the stored rule matching all seven attributes.
    ///
    /// Returns whether a document was removed; an absent rule is not an error.
    pub async fn delete_rule(&self, ptype: &str, rule: &[String]) -> Result<bool, AdapterError> {
        let line = CasbinRule::from_rule(ptype, rule);
        match self.collection.delete_one(&RuleSelector::exact(&line)).await {
            Ok(()) => Ok(true),
            Err(RepositoryError::NotFound(_)) => {
                debug!(ptype, "Policy rule already absent");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete each rule in turn, returning how many were stored.
    pub async fn delete_rules(&self, ptype: &str, rules: &[Vec<String>]) -> Result<u64, AdapterError> {
        let mut removed = 0;
        for rule in rules {
            if self.delete_rule(ptype, rule).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Delete every rule of `ptype` whose values match `field_values` from
    /// position `field_index` on. Empty values match anything.
    pub async fn delete_filtered(
        &self,
        ptype: &str,
        field_index: usize,
        field_values: &[String],
    ) -> Result<u64, AdapterError> {
        let selector = RuleSelector::ptype(ptype).with_values(field_index, field_values);
        let removed = self.collection.delete_many(&selector).await?;
        debug!(ptype, field_index, removed, "Removed filtered policy rules");
        Ok(removed)
    }

    /// Remove every stored rule.
    pub async fn clear_all(&self) -> Result<(), AdapterError> {
        self.collection.clear().await?;
        Ok(())
    }
}

#[async_trait]
impl<C: RuleCollection + 'static> Adapter for MongoAdapter<C> {
    async fn load_policy(&mut self, m: &mut dyn Model) -> casbin::Result<()> {
        self.load_selected_policy(m, None).await?;
        Ok(())
    }

    async fn load_filtered_policy<'a>(&mut self, m: &mut dyn Model, f: Filter<'a>) -> casbin::Result<()> {
        let selector = PolicySelector::from_casbin_filter(&f);
        self.load_selected_policy(m, selector).await?;
        Ok(())
    }

    async fn save_policy(&mut self, m: &mut dyn Model) -> casbin::Result<()> {
        self.save_all(&*m).await?;
        Ok(())
    }

    async fn clear_policy(&mut self) -> casbin::Result<()> {
        self.clear_all().await?;
        Ok(())
    }

    fn is_filtered(&self) -> bool {
        self.state == LoadState::Filtered
    }

    async fn add_policy(&mut self, _sec: &str, ptype: &str, rule: Vec<String>) -> casbin::Result<bool> {
        self.insert_rule(ptype, &rule).await?;
        Ok(true)
    }

    async fn add_policies(&mut self, _sec: &str, ptype: &str, rules: Vec<Vec<String>>) -> casbin::Result<bool> {
        self.insert_rules(ptype, &rules).await?;
        Ok(true)
    }

    async fn remove_policy(&mut self, _sec: &str, ptype: &str, rule: Vec<String>) -> casbin::Result<bool> {
        self.delete_rule(ptype, &rule).await?;
        Ok(true)
    }

    async fn remove_policies(&mut self, _sec: &str, ptype: &str, rules: Vec<Vec<String>>) -> casbin::Result<bool> {
        self.delete_rules(ptype, &rules).await?;
        Ok(true)
    }

    async fn remove_filtered_policy(
        &mut self,
        _sec: &str,
        ptype: &str,
        field_index: usize,
        field_values: Vec<String>,
    ) -> casbin::Result<bool> {
        self.delete_filtered(ptype, field_index, &field_values).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryRuleCollection;
    use casbin::prelude::DefaultModel;

    const RBAC_MODEL: &str = r#"
[request_definition]
r = sub, obj, act

[policy_definition]
p = sub, obj, act

[role_definition]
g = _, _

[policy_effect]
e = some(where (p.eft == allow))

[matchers]
m = g(r.sub, p.sub) && r.obj == p.obj && r.act == p.act
"#;

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    async fn model() -> DefaultModel {
        DefaultModel::from_str(RBAC_MODEL).await.unwrap()
    }

    #[tokio::test]
    async fn test_constructor_states() {
        let adapter = MongoAdapter::new(InMemoryRuleCollection::new()).await.unwrap();
        assert_eq!(adapter.state(), LoadState::Unfiltered);
        assert!(!adapter.is_filtered());

        let adapter = MongoAdapter::new_filtered(InMemoryRuleCollection::new()).await.unwrap();
        assert_eq!(adapter.state(), LoadState::Filtered);
        assert!(adapter.is_filtered());
    }

    #[tokio::test]
    async fn test_filtered_adapter_refuses_save_without_io() {
        let collection = InMemoryRuleCollection::new();
        collection
            .insert_one(&CasbinRule::from_rule("p", &rule(&["alice", "data1", "read"])))
            .await
            .unwrap();

        let mut adapter = MongoAdapter::new_filtered(collection.clone()).await.unwrap();
        let mut m = model().await;
        match adapter.save_policy(&mut m).await.unwrap_err() {
            casbin::Error::AdapterError(CasbinAdapterError(inner)) => {
                assert!(matches!(
                    inner.downcast_ref::<AdapterError>(),
                    Some(AdapterError::FilteredSave)
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(collection.len().await, 1);
    }

    #[tokio::test]
    async fn test_load_skips_bare_type_tags() {
        let collection = InMemoryRuleCollection::new();
        collection
            .insert_many(&[
                CasbinRule::from_rule("p", &[]),
                CasbinRule::from_rule("p", &rule(&["alice", "data1", "read"])),
            ])
            .await
            .unwrap();

        let mut adapter = MongoAdapter::new(collection).await.unwrap();
        let mut m = model().await;
        let loaded = adapter.load_selected_policy(&mut m, None).await.unwrap();
        assert_eq!(loaded, 1);
    }

    #[tokio::test]
    async fn test_load_skips_undeclared_ptype() {
        let collection = InMemoryRuleCollection::new();
        collection
            .insert_one(&CasbinRule::from_rule("p9", &rule(&["alice", "data1", "read"])))
            .await
            .unwrap();

        let mut adapter = MongoAdapter::new(collection).await.unwrap();
        let mut m = model().await;
        let loaded = adapter.load_selected_policy(&mut m, None).await.unwrap();
        assert_eq!(loaded, 0);
        assert_eq!(adapter.state(), LoadState::Unfiltered);
    }

    #[tokio::test]
    async fn test_delete_rule_reports_presence() {
        let adapter = MongoAdapter::new(InMemoryRuleCollection::new()).await.unwrap();
        let alice = rule(&["alice", "data1", "read"]);

        adapter.insert_rule("p", &alice).await.unwrap();
        assert!(adapter.delete_rule("p", &alice).await.unwrap());
        assert!(!adapter.delete_rule("p", &alice).await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_rules_empty_batch_is_noop() {
        let adapter = MongoAdapter::new(InMemoryRuleCollection::new()).await.unwrap();
        adapter.insert_rules("p", &[]).await.unwrap();
        assert!(adapter.collection().is_empty().await);
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_repository_error() {
        let adapter = MongoAdapter::new(InMemoryRuleCollection::new()).await.unwrap();
        let alice = rule(&["alice", "data1", "read"]);

        adapter.insert_rule("p", &alice).await.unwrap();
        let err = adapter.insert_rule("p", &alice).await.unwrap_err();
        assert!(matches!(err, AdapterError::Repository(RepositoryError::Duplicate(_))));
    }
}
