// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Rule Selectors
//!
//! Store-neutral predicates over `CasbinRule` documents, used by filtered
//! loads and filtered deletes. A `RuleSelector` is a conjunction of equality
//! constraints; a `PolicySelector` is a disjunction of them. Infrastructure
//! implementations translate these into their native query language.

use casbin::Filter;

use crate::domain::rule::{CasbinRule, MAX_FIELDS};

/// Constraint on the `ptype` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeMatch {
    /// `ptype` equals the value.
    Exact(String),
    /// `ptype` starts with the value (`"p"` matches `p`, `p2`, ...).
    Section(String),
}

impl TypeMatch {
    pub fn matches(&self, ptype: &str) -> bool {
        match self {
            TypeMatch::Exact(expected) => ptype == expected,
            TypeMatch::Section(prefix) => ptype.starts_with(prefix.as_str()),
        }
    }
}

/// Conjunction of equality constraints over one rule document.
///
/// Unconstrained slots are wildcards, so `RuleSelector::all()` matches every
/// document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSelector {
    pub ptype: Option<TypeMatch>,
    pub values: [Option<String>; MAX_FIELDS],
}

impl RuleSelector {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn ptype(ptype: impl Into<String>) -> Self {
        Self {
            ptype: Some(TypeMatch::Exact(ptype.into())),
            ..Self::default()
        }
    }

    pub fn section(section: impl Into<String>) -> Self {
        Self {
            ptype: Some(TypeMatch::Section(section.into())),
            ..Self::default()
        }
    }

    /// Selector matching exactly one stored tuple, empty slots included.
    pub fn exact(rule: &CasbinRule) -> Self {
        let mut selector = Self::ptype(rule.ptype.clone());
        for (index, value) in rule.fields().iter().enumerate() {
            selector.values[index] = Some(value.to_string());
        }
        selector
    }

    /// Constrain slot `index` to `value`. Out-of-range indices are ignored.
    pub fn with_value(mut self, index: usize, value: impl Into<String>) -> Self {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = Some(value.into());
        }
        self
    }

    /// Constrain consecutive slots starting at `field_index`.
    ///
    /// `values[i]` applies to slot `field_index + i`. Empty strings and slots
    /// past the last one stay unconstrained.
    ///
    /// If every value lands past slot 5, no slot is constrained and the
    /// selector matches every rule of its ptype. A delete built from it removes
    /// the whole ptype.
    pub fn with_values<S: AsRef<str>>(mut self, field_index: usize, values: &[S]) -> Self {
        for (offset, value) in values.iter().enumerate() {
            let value = value.as_ref();
            if value.is_empty() {
                continue;
            }
            let Some(position) = field_index.checked_add(offset) else {
                break;
            };
            self = self.with_value(position, value);
        }
        self
    }

    /// Constrained slots as `(index, value)` pairs.
    pub fn constraints(&self) -> impl Iterator<Item = (usize, &str)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(index, value)| value.as_deref().map(|v| (index, v)))
    }

    pub fn is_unconstrained(&self) -> bool {
        self.ptype.is_none() && self.values.iter().all(Option::is_none)
    }

    pub fn matches(&self, rule: &CasbinRule) -> bool {
        if let Some(ref ptype) = self.ptype {
            if !ptype.matches(&rule.ptype) {
                return false;
            }
        }
        let fields = rule.fields();
        self.constraints().all(|(index, value)| fields[index] == value)
    }
}

/// Predicate used for filtered loads: one or more alternative rule selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicySelector {
    Rule(RuleSelector),
    /// Matches when any alternative matches; an empty list matches nothing.
    AnyOf(Vec<RuleSelector>),
}

impl PolicySelector {
    pub fn matches(&self, rule: &CasbinRule) -> bool {
        match self {
            PolicySelector::Rule(selector) => selector.matches(rule),
            PolicySelector::AnyOf(selectors) => selectors.iter().any(|s| s.matches(rule)),
        }
    }

    /// Build a selector from a Casbin load filter.
    ///
    /// `filter.p` constrains permission rules and `filter.g` role rules, both
    /// starting from `v0`. A filter without any non-empty value selects
    /// everything and yields `None`.
    pub fn from_casbin_filter(filter: &Filter<'_>) -> Option<Self> {
        let has_values = |values: &[&str]| values.iter().any(|v| !v.is_empty());
        if !has_values(&filter.p) && !has_values(&filter.g) {
            return None;
        }

        Some(PolicySelector::AnyOf(vec![
            RuleSelector::section("p").with_values(0, &filter.p),
            RuleSelector::section("g").with_values(0, &filter.g),
        ]))
    }
}

impl From<RuleSelector> for PolicySelector {
    fn from(selector: RuleSelector) -> Self {
        PolicySelector::Rule(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(ptype: &str, values: &[&str]) -> CasbinRule {
        let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        CasbinRule::from_rule(ptype, &values)
    }

    #[test]
    fn test_with_values_offsets_from_field_index() {
        let selector = RuleSelector::ptype("p").with_values(1, &["data1", "", "x"]);
        let constraints: Vec<_> = selector.constraints().collect();
        assert_eq!(constraints, vec![(1, "data1"), (3, "x")]);
    }

    #[test]
    fn test_with_values_ignores_slots_past_the_end() {
        let selector = RuleSelector::ptype("p").with_values(5, &["a", "b", "c"]);
        let constraints: Vec<_> = selector.constraints().collect();
        assert_eq!(constraints, vec![(5, "a")]);

        let selector = RuleSelector::ptype("p").with_values(usize::MAX, &["a", "b"]);
        assert_eq!(selector.constraints().count(), 0);
    }

    #[test]
    fn test_with_values_past_last_slot_matches_whole_ptype() {
        let selector = RuleSelector::ptype("p").with_values(7, &["x"]);
        assert_eq!(selector.constraints().count(), 0);
        assert!(selector.matches(&rule("p", &["alice", "data1", "read"])));
        assert!(!selector.matches(&rule("g", &["carol", "alice"])));
    }

    #[test]
    fn test_partial_match_semantics() {
        let alice = rule("p", &["alice", "data1", "read"]);
        let bob = rule("p", &["bob", "data1", "write"]);

        let by_subject = RuleSelector::ptype("p").with_values(0, &["alice"]);
        assert!(by_subject.matches(&alice));
        assert!(!by_subject.matches(&bob));

        let by_object = RuleSelector::ptype("p").with_values(1, &["data1"]);
        assert!(by_object.matches(&alice));
        assert!(by_object.matches(&bob));

        let other_type = RuleSelector::ptype("g").with_values(1, &["data1"]);
        assert!(!other_type.matches(&alice));
    }

    #[test]
    fn test_exact_constrains_empty_slots() {
        let stored = rule("p", &["alice", "data1", "read"]);
        let longer = rule("p", &["alice", "data1", "read", "extra"]);
        let selector = RuleSelector::exact(&stored);
        assert!(selector.matches(&stored));
        assert!(!selector.matches(&longer));
        assert_eq!(selector.constraints().count(), MAX_FIELDS);
    }

    #[test]
    fn test_section_match() {
        let selector = RuleSelector::section("p");
        assert!(selector.matches(&rule("p2", &["alice"])));
        assert!(!selector.matches(&rule("g", &["alice", "admin"])));
        assert!(RuleSelector::all().is_unconstrained());
        assert!(!selector.is_unconstrained());
    }

    #[test]
    fn test_any_of_empty_matches_nothing() {
        let selector = PolicySelector::AnyOf(vec![]);
        assert!(!selector.matches(&rule("p", &["alice"])));
    }

    #[test]
    fn test_from_casbin_filter() {
        let empty = Filter { p: vec![], g: vec![""] };
        assert_eq!(PolicySelector::from_casbin_filter(&empty), None);

        let filter = Filter { p: vec!["", "data1"], g: vec![] };
        let selector = PolicySelector::from_casbin_filter(&filter).unwrap();
        assert!(selector.matches(&rule("p", &["alice", "data1", "read"])));
        assert!(!selector.matches(&rule("p", &["alice", "data2", "read"])));
        assert!(selector.matches(&rule("g", &["alice", "admin"])));
    }
}
