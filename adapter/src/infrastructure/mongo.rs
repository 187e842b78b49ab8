// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # MongoDB Rule Collection
//!
//! Production `RuleCollection` backed by a MongoDB collection via the
//! official `mongodb` driver. Each policy rule is one document with the
//! attributes `ptype, v0..v5`; a unique compound index over all seven keeps
//! the tuple unique.
//!
//! Selectors are translated into MongoDB query documents here and nowhere
//! else, so the rest of the crate never sees driver-specific syntax.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure Layer
//! - **Purpose:** Implements `RuleCollection` against MongoDB

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};

use crate::domain::repository::{RepositoryError, RuleCollection};
use crate::domain::rule::{CasbinRule, FIELD_NAMES, PTYPE_FIELD};
use crate::domain::selector::{PolicySelector, RuleSelector, TypeMatch};
use crate::infrastructure::config::MongoAdapterConfig;

/// MongoDB server error code for unique index violations.
const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoRuleCollection {
    collection: Collection<CasbinRule>,
}

impl MongoRuleCollection {
    pub fn new(collection: Collection<CasbinRule>) -> Self {
        Self { collection }
    }

    /// Connect with the driver's own pooling and open the configured collection
    pub async fn connect(config: &MongoAdapterConfig) -> Result<Self, RepositoryError> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| RepositoryError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        tracing::info!(
            database = %config.database,
            collection = %config.collection,
            "Connected to MongoDB policy store"
        );

        Ok(Self::new(
            client
                .database(&config.database)
                .collection::<CasbinRule>(&config.collection),
        ))
    }

    pub fn collection(&self) -> &Collection<CasbinRule> {
        &self.collection
    }
}

#[async_trait]
impl RuleCollection for MongoRuleCollection {
    async fn ensure_unique_index(&self) -> Result<(), RepositoryError> {
        let mut keys = Document::new();
        keys.insert(PTYPE_FIELD, 1);
        for name in FIELD_NAMES {
            keys.insert(name, 1);
        }

        let index = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();

        let created = self
            .collection
            .create_index(index)
            .await
            .map_err(|e| map_error("create policy index", e))?;

        tracing::info!(index = %created.index_name, "Ensured unique policy index");
        Ok(())
    }

    async fn find(&self, selector: Option<&PolicySelector>) -> Result<Vec<CasbinRule>, RepositoryError> {
        let filter = selector.map(policy_selector_document).unwrap_or_default();

        let cursor = self
            .collection
            .find(filter)
            .await
            .map_err(|e| map_error("find policy rules", e))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| map_error("read policy rules", e))
    }

    async fn clear(&self) -> Result<(), RepositoryError> {
        let result = self
            .collection
            .delete_many(doc! {})
            .await
            .map_err(|e| map_error("clear policy rules", e))?;

        tracing::debug!(deleted = result.deleted_count, "Cleared policy collection");
        Ok(())
    }

    async fn insert_one(&self, rule: &CasbinRule) -> Result<(), RepositoryError> {
        self.collection
            .insert_one(rule)
            .await
            .map_err(|e| map_error("insert policy rule", e))?;
        Ok(())
    }

    async fn insert_many(&self, rules: &[CasbinRule]) -> Result<(), RepositoryError> {
        self.collection
            .insert_many(rules)
            .await
            .map_err(|e| map_error("insert policy rules", e))?;
        Ok(())
    }

    async fn delete_one(&self, selector: &RuleSelector) -> Result<(), RepositoryError> {
        let filter = rule_selector_document(selector);
        let result = self
            .collection
            .delete_one(filter.clone())
            .await
            .map_err(|e| map_error("delete policy rule", e))?;

        if result.deleted_count == 0 {
            return Err(RepositoryError::NotFound(filter.to_string()));
        }
        Ok(())
    }

    async fn delete_many(&self, selector: &RuleSelector) -> Result<u64, RepositoryError> {
        let result = self
            .collection
            .delete_many(rule_selector_document(selector))
            .await
            .map_err(|e| map_error("delete policy rules", e))?;
        Ok(result.deleted_count)
    }
}

/// Query document for a conjunction of equality constraints.
pub fn rule_selector_document(selector: &RuleSelector) -> Document {
    let mut document = Document::new();
    match selector.ptype {
        Some(TypeMatch::Exact(ref ptype)) => {
            document.insert(PTYPE_FIELD, ptype.as_str());
        }
        Some(TypeMatch::Section(ref prefix)) => {
            document.insert(
                PTYPE_FIELD,
                doc! { "$regex": format!("^{}", regex::escape(prefix)) },
            );
        }
        None => {}
    }
    for (index, value) in selector.constraints() {
        document.insert(FIELD_NAMES[index], value);
    }
    document
}

/// Query document for a disjunction of rule selectors.
pub fn policy_selector_document(selector: &PolicySelector) -> Document {
    match selector {
        PolicySelector::Rule(rule) => rule_selector_document(rule),
        // Every stored document has an `_id`, so this matches nothing
        PolicySelector::AnyOf(selectors) if selectors.is_empty() => {
            doc! { "_id": { "$exists": false } }
        }
        PolicySelector::AnyOf(selectors) if selectors.len() == 1 => {
            rule_selector_document(&selectors[0])
        }
        PolicySelector::AnyOf(selectors) => {
            let alternatives: Vec<Bson> = selectors
                .iter()
                .map(|s| Bson::Document(rule_selector_document(s)))
                .collect();
            doc! { "$or": alternatives }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match *err.kind {
        ErrorKind::Write(WriteFailure::WriteError(ref e)) => e.code == DUPLICATE_KEY,
        ErrorKind::InsertMany(ref e) => e
            .write_errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|w| w.code == DUPLICATE_KEY)),
        _ => false,
    }
}

fn map_error(operation: &str, err: MongoError) -> RepositoryError {
    if is_duplicate_key(&err) {
        RepositoryError::Duplicate(err.to_string())
    } else {
        RepositoryError::Database(format!("Failed to {}: {}", operation, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_selector_document() {
        let rule = CasbinRule::from_rule("p", &["alice".to_string(), "data1".to_string()]);
        let document = rule_selector_document(&RuleSelector::exact(&rule));
        assert_eq!(
            document,
            doc! {
                "ptype": "p",
                "v0": "alice",
                "v1": "data1",
                "v2": "",
                "v3": "",
                "v4": "",
                "v5": "",
            }
        );
    }

    #[test]
    fn test_partial_selector_document() {
        let selector = RuleSelector::ptype("p").with_values(1, &["data1", "", "x"]);
        assert_eq!(
            rule_selector_document(&selector),
            doc! { "ptype": "p", "v1": "data1", "v3": "x" }
        );
        assert_eq!(rule_selector_document(&RuleSelector::all()), doc! {});
    }

    #[test]
    fn test_section_selector_escapes_prefix() {
        let document = rule_selector_document(&RuleSelector::section("p."));
        assert_eq!(document, doc! { "ptype": { "$regex": "^p\\." } });
    }

    #[test]
    fn test_policy_selector_documents() {
        let single = PolicySelector::AnyOf(vec![RuleSelector::ptype("g")]);
        assert_eq!(policy_selector_document(&single), doc! { "ptype": "g" });

        let none = PolicySelector::AnyOf(vec![]);
        assert_eq!(
            policy_selector_document(&none),
            doc! { "_id": { "$exists": false } }
        );

        let both = PolicySelector::AnyOf(vec![
            RuleSelector::ptype("p").with_value(0, "alice"),
            RuleSelector::ptype("g"),
        ]);
        assert_eq!(
            policy_selector_document(&both),
            doc! { "$or": [ { "ptype": "p", "v0": "alice" }, { "ptype": "g" } ] }
        );
    }
}
