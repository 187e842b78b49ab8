// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Casbin model selection for the CLI

use anyhow::{Context, Result};
use casbin::prelude::DefaultModel;
use std::path::Path;

// Embedded so the CLI works without a separate model file.
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

/// Load `path` if given, otherwise the built-in RBAC model
pub async fn load_model(path: Option<&Path>) -> Result<DefaultModel> {
    match path {
        Some(path) => DefaultModel::from_file(path)
            .await
            .with_context(|| format!("Failed to load Casbin model from {:?}", path)),
        None => DefaultModel::from_str(RBAC_MODEL)
            .await
            .context("Built-in Casbin model is invalid"),
    }
}
