// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Infrastructure layer for policy rule storage
//!
//! - **MongoRuleCollection** - MongoDB-backed collection (production)
//! - **InMemoryRuleCollection** - Lock-protected `Vec` (tests, development)
//! - **MongoAdapterConfig** - Connection settings loaded from YAML and env

pub mod config;
pub mod memory;
pub mod mongo;

pub use config::MongoAdapterConfig;
pub use memory::InMemoryRuleCollection;
pub use mongo::MongoRuleCollection;
