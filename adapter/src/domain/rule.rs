// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Rule Codec
//!
//! Maps a variable-arity Casbin policy rule (`ptype` plus up to six positional
//! values) onto the fixed-width `CasbinRule` document stored one-per-rule in
//! the policy collection, and back again.
//!
//! The stored shape is always seven string attributes (`ptype`, `v0`..`v5`) so
//! the whole tuple can carry a single unique compound index. Unused slots hold
//! the empty string.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Isolates the width/arity mismatch between rules and documents

use serde::{Deserialize, Serialize};

/// Number of value slots in a stored rule document.
pub const MAX_FIELDS: usize = 6;

/// Attribute names of the value slots, in positional order.
pub const FIELD_NAMES: [&str; MAX_FIELDS] = ["v0", "v1", "v2", "v3", "v4", "v5"];

/// Attribute name of the rule type tag.
pub const PTYPE_FIELD: &str = "ptype";

/// One persisted policy rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CasbinRule {
    pub ptype: String,
    #[serde(default)]
    pub v0: String,
    #[serde(default)]
    pub v1: String,
    #[serde(default)]
    pub v2: String,
    #[serde(default)]
    pub v3: String,
    #[serde(default)]
    pub v4: String,
    #[serde(default)]
    pub v5: String,
}

impl CasbinRule {
    /// Encode a rule. Values past `MAX_FIELDS` are dropped.
    pub fn from_rule(ptype: &str, rule: &[String]) -> Self {
        if rule.len() > MAX_FIELDS {
            tracing::warn!(
                ptype,
                arity = rule.len(),
                "Policy rule exceeds {} values, extra values are not persisted",
                MAX_FIELDS
            );
        }

        let mut line = Self {
            ptype: ptype.to_string(),
            ..Self::default()
        };
        for (index, value) in rule.iter().take(MAX_FIELDS).enumerate() {
            *line.field_mut(index) = value.clone();
        }
        line
    }

    /// Value slots in positional order.
    pub fn fields(&self) -> [&str; MAX_FIELDS] {
        [&self.v0, &self.v1, &self.v2, &self.v3, &self.v4, &self.v5]
    }

    /// Value slot at `index`, `None` past `MAX_FIELDS`.
    pub fn field(&self, index: usize) -> Option<&str> {
        self.fields().get(index).copied()
    }

    fn field_mut(&mut self, index: usize) -> &mut String {
        match index {
            0 => &mut self.v0,
            1 => &mut self.v1,
            2 => &mut self.v2,
            3 => &mut self.v3,
            4 => &mut self.v4,
            _ => &mut self.v5,
        }
    }

    /// Section the rule belongs to: the first character of `ptype`.
    pub fn section(&self) -> &str {
        self.ptype
            .char_indices()
            .nth(1)
            .map_or(self.ptype.as_str(), |(end, _)| &self.ptype[..end])
    }

    /// Number of values the rule declares.
    ///
    /// Values are assumed contiguous from `v0`: an empty `v0` means a bare
    /// type tag, even if later slots hold data. Gaps after `v0` are kept up to
    /// the highest non-empty slot.
    pub fn arity(&self) -> usize {
        let fields = self.fields();
        if fields[0].is_empty() {
            return 0;
        }
        fields
            .iter()
            .rposition(|value| !value.is_empty())
            .map_or(0, |last| last + 1)
    }

    /// Decode back into `(ptype, values)`.
    pub fn decode(&self) -> (String, Vec<String>) {
        let values = self.fields()[..self.arity()]
            .iter()
            .map(|value| value.to_string())
            .collect();
        (self.ptype.clone(), values)
    }

    /// Textual policy line, e.g. `p, alice, data1, read`.
    ///
    /// Returns `None` for a bare type tag, which has nothing to load.
    pub fn to_policy_line(&self) -> Option<String> {
        let arity = self.arity();
        if arity == 0 {
            return None;
        }
        let mut parts = Vec::with_capacity(arity + 1);
        parts.push(self.ptype.as_str());
        parts.extend_from_slice(&self.fields()[..arity]);
        Some(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_round_trip_permission_rule() {
        let line = CasbinRule::from_rule("p", &rule(&["alice", "data1", "read"]));
        assert_eq!(line.v0, "alice");
        assert_eq!(line.v2, "read");
        assert_eq!(line.v3, "");

        let (ptype, values) = line.decode();
        assert_eq!(ptype, "p");
        assert_eq!(values, rule(&["alice", "data1", "read"]));
    }

    #[test]
    fn test_round_trip_every_arity() {
        let all = ["a", "b", "c", "d", "e", "f"];
        for arity in 0..=MAX_FIELDS {
            let values = rule(&all[..arity]);
            let line = CasbinRule::from_rule("g2", &values);
            assert_eq!(line.decode(), ("g2".to_string(), values));
        }
    }

    #[test]
    fn test_bare_type_tag_has_no_line() {
        let line = CasbinRule::from_rule("p", &[]);
        assert_eq!(line.arity(), 0);
        assert!(line.decode().1.is_empty());
        assert_eq!(line.to_policy_line(), None);
    }

    #[test]
    fn test_extra_values_are_truncated() {
        let values = rule(&["1", "2", "3", "4", "5", "6", "7"]);
        let line = CasbinRule::from_rule("p", &values);
        assert_eq!(line.v5, "6");
        assert_eq!(line.decode().1, rule(&["1", "2", "3", "4", "5", "6"]));
    }

    #[test]
    fn test_empty_v0_drops_later_values() {
        let line = CasbinRule {
            ptype: "p".to_string(),
            v1: "data1".to_string(),
            ..CasbinRule::default()
        };
        assert_eq!(line.arity(), 0);
        assert!(line.decode().1.is_empty());
    }

    #[test]
    fn test_inner_gap_is_preserved() {
        let line = CasbinRule::from_rule("p", &rule(&["alice", "", "read"]));
        assert_eq!(line.to_policy_line().as_deref(), Some("p, alice, , read"));
    }

    #[test]
    fn test_policy_line_and_section() {
        let line = CasbinRule::from_rule("g", &rule(&["alice", "admin"]));
        assert_eq!(line.to_policy_line().as_deref(), Some("g, alice, admin"));
        assert_eq!(line.section(), "g");
        assert_eq!(CasbinRule::from_rule("p2", &[]).section(), "p");
        assert_eq!(CasbinRule::default().section(), "");
    }

    #[test]
    fn test_field_lookup() {
        let line = CasbinRule::from_rule("p", &rule(&["alice", "data1"]));
        assert_eq!(line.field(1), Some("data1"));
        assert_eq!(line.field(5), Some(""));
        assert_eq!(line.field(6), None);
    }
}
