// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Domain layer: the rule codec, selectors, and the collection contract

pub mod rule;
pub mod selector;
pub mod repository;

pub use rule::{CasbinRule, FIELD_NAMES, MAX_FIELDS, PTYPE_FIELD};
pub use selector::{PolicySelector, RuleSelector, TypeMatch};
pub use repository::{RepositoryError, RuleCollection};
