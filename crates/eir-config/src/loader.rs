// SPDX-FileCopyrightText: 2026 EIR Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./eir.toml` > `~/.config/eir/eir.toml` >
//! `/etc/eir/eir.toml` with environment variable overrides via the
//! `EIR_` prefix, plus the bare legacy variable names (`SPEAKER_MODEL`,
//! `NEO4J_URL`, ...) the original deployment recognizes.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::EirConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/eir/eir.toml` (system-wide)
/// 3. `~/.config/eir/eir.toml` (user XDG config)
/// 4. `./eir.toml` (local directory)
/// 5. `EIR_*` environment variables
/// 6. Bare legacy environment variables (`SPEAKER_MODEL`, `NEO4J_URL`, ...)
pub fn load_config() -> Result<EirConfig, figment::Error> {
    let mut config: EirConfig = Figment::new()
        .merge(Serialized::defaults(EirConfig::default()))
        .merge(Toml::file("/etc/eir/eir.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("eir/eir.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("eir.toml"))
        .merge(env_provider())
        .extract()?;
    apply_legacy_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<EirConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(EirConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<EirConfig, figment::Error> {
    let mut config: EirConfig = Figment::new()
        .merge(Serialized::defaults(EirConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()?;
    apply_legacy_env(&mut config, |name| std::env::var(name).ok());
    Ok(config)
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `EIR_SPEAKER_API_KEY` must map to
/// `speaker.api_key`, not `speaker.api.key`.
fn env_provider() -> Env {
    Env::prefixed("EIR_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: EIR_SPEAKER_API_KEY -> "speaker_api_key"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("speaker_", "speaker.", 1)
            .replacen("executive_", "executive.", 1)
            .replacen("embedding_", "embedding.", 1)
            .replacen("graph_", "graph.", 1)
            .replacen("server_", "server.", 1)
            .replacen("orchestrator_", "orchestrator.", 1);
        mapped.into()
    })
}

/// Apply the bare legacy environment variables the original deployment
/// recognizes, on top of whatever the layered config produced.
///
/// `DEFAULT_API_KEY` only fills worker keys that are still unset, so an
/// explicit per-worker key always wins.
fn apply_legacy_env(config: &mut EirConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(model) = lookup("SPEAKER_MODEL") {
        config.speaker.model = model;
    }
    if let Some(model) = lookup("EXECUTIVE_MODEL") {
        config.executive.model = model;
    }
    if let Some(path) = lookup("EMBEDDING_MODEL") {
        config.embedding.model_path = Some(path);
    }
    if let Some(dim) = lookup("EMBEDDING_DIMENSION").and_then(|d| d.parse().ok()) {
        config.embedding.dimension = dim;
    }
    if let Some(url) = lookup("NEO4J_URL") {
        config.graph.url = Some(url);
    }
    if let Some(user) = lookup("NEO4J_USER") {
        config.graph.user = user;
    }
    if let Some(password) = lookup("NEO4J_PASSWORD") {
        config.graph.password = password;
    }
    if let Some(key) = lookup("DEFAULT_API_KEY") {
        if config.speaker.api_key.is_none() {
            config.speaker.api_key = Some(key.clone());
        }
        if config.executive.api_key.is_none() {
            config.executive.api_key = Some(key);
        }
    }
    if let Some(debug) = lookup("DEBUG") {
        config.server.debug = debug.eq_ignore_ascii_case("true") || debug == "1";
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn legacy_env_overrides_models_and_graph() {
        let vars = env(&[
            ("SPEAKER_MODEL", "gpt-4o-mini"),
            ("EXECUTIVE_MODEL", "gpt-4o"),
            ("EMBEDDING_DIMENSION", "768"),
            ("NEO4J_URL", "neo4j://localhost:7687"),
            ("NEO4J_USER", "eir"),
            ("NEO4J_PASSWORD", "secret"),
        ]);
        let mut config = EirConfig::default();
        apply_legacy_env(&mut config, |k| vars.get(k).cloned());

        assert_eq!(config.speaker.model, "gpt-4o-mini");
        assert_eq!(config.executive.model, "gpt-4o");
        assert_eq!(config.embedding.dimension, 768);
        assert_eq!(config.graph.url.as_deref(), Some("neo4j://localhost:7687"));
        assert_eq!(config.graph.user, "eir");
        assert_eq!(config.graph.password, "secret");
    }

    #[test]
    fn default_api_key_does_not_clobber_explicit_keys() {
        let vars = env(&[("DEFAULT_API_KEY", "sk-default")]);

        let mut config = EirConfig::default();
        config.speaker.api_key = Some("sk-speaker".into());
        apply_legacy_env(&mut config, |k| vars.get(k).cloned());

        assert_eq!(config.speaker.api_key.as_deref(), Some("sk-speaker"));
        assert_eq!(config.executive.api_key.as_deref(), Some("sk-default"));
    }

    #[test]
    fn debug_flag_parses_truthy_values() {
        for value in ["true", "TRUE", "1"] {
            let vars = env(&[("DEBUG", value)]);
            let mut config = EirConfig::default();
            apply_legacy_env(&mut config, |k| vars.get(k).cloned());
            assert!(config.server.debug, "DEBUG={value} should enable debug");
        }

        let vars = env(&[("DEBUG", "false")]);
        let mut config = EirConfig::default();
        apply_legacy_env(&mut config, |k| vars.get(k).cloned());
        assert!(!config.server.debug);
    }

    #[test]
    fn invalid_dimension_is_ignored() {
        let vars = env(&[("EMBEDDING_DIMENSION", "not-a-number")]);
        let mut config = EirConfig::default();
        apply_legacy_env(&mut config, |k| vars.get(k).cloned());
        assert_eq!(config.embedding.dimension, 384);
    }

    #[test]
    fn toml_string_overrides_defaults() {
        let config = load_config_from_str(
            r#"
            [speaker]
            model = "gpt-4.1"

            [orchestrator]
            reeval_stride = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.speaker.model, "gpt-4.1");
        assert_eq!(config.orchestrator.reeval_stride, 20);
        // Untouched sections keep defaults.
        assert_eq!(config.executive.model, "gpt-4o");
        assert_eq!(config.orchestrator.request_timeout_secs, 120);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result = load_config_from_str(
            r#"
            [speaker]
            modle = "typo"
            "#,
        );
        assert!(result.is_err());
    }
}
