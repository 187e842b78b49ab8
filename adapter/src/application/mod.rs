// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Application layer: the Casbin adapter built on a `RuleCollection`

pub mod adapter;

pub use adapter::{AdapterError, LoadState, MongoAdapter};
