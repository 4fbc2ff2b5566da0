use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::provider::Provider;
use crate::security;

// ── Config file sections ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AiConfig {
    /// Provider name ("gpt", "gemini", "ollama", "geminicli")
    pub provider: Option<String>,
    /// API key for the HTTP providers (sent as Bearer token / query key)
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OllamaConfig {
    /// Path to the ollama binary. If unset, looked up on PATH.
    pub path: Option<String>,
    /// Model passed to `ollama run`
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    /// Comma-separated sensitive keywords; replaces the built-in list.
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl ConfigFile {
    /// Load from disk, or return a default config if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    /// Write a starter config file to disk (only if it doesn't exist).
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG_TOML)?;
        Ok(path)
    }
}

// ── Resolved runtime config (after merging file + CLI/env overrides) ──────────

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub ollama_path: Option<String>,
    pub ollama_model: String,
    /// Sensitive keywords threaded into the diff scanner — never global state.
    pub keywords: Vec<String>,
}

impl ResolvedConfig {
    /// Merge config file with CLI overrides.
    /// Priority: CLI args > env vars (handled by clap) > config file > built-in defaults
    pub fn resolve(
        file: &ConfigFile,
        provider_override: Option<&str>,
        api_key_override: Option<&str>,
        keywords_override: Option<&str>,
    ) -> Result<Self> {
        let provider_str = provider_override
            .map(str::to_string)
            .or_else(|| file.ai.provider.clone())
            .unwrap_or_default();
        let provider = Provider::parse(&provider_str)?;

        // Legacy provider-specific env vars remain usable as a fallback.
        let api_key = api_key_override
            .map(str::to_string)
            .or_else(|| file.ai.api_key.clone())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .filter(|k| !k.is_empty());

        let keywords = keywords_override
            .or(file.security.keywords.as_deref())
            .map(security::parse_keywords_csv)
            .filter(|kws| !kws.is_empty())
            .unwrap_or_else(security::default_keywords);

        let ollama_path =
            pick_ollama_path(file.ollama.path.clone(), std::env::var("OLLAMA_API_PATH").ok())
                .or_else(find_ollama);

        Ok(Self {
            provider,
            api_key,
            ollama_path,
            ollama_model: file
                .ollama
                .model
                .clone()
                .unwrap_or_else(|| "llama3.1:8b".to_string()),
            keywords,
        })
    }
}

/// Config file key first, then the legacy OLLAMA_API_PATH env var.
fn pick_ollama_path(configured: Option<String>, legacy_env: Option<String>) -> Option<String> {
    configured
        .filter(|p| !p.is_empty())
        .or(legacy_env.filter(|p| !p.is_empty()))
}

/// Look up `ollama` on PATH for when nothing pins a path.
fn find_ollama() -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join("ollama"))
        .find(|candidate| is_executable(candidate))
        .map(|p| p.to_string_lossy().into_owned())
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    dirs_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("aicommit")
        .join("config.toml")
}

fn dirs_config_dir() -> Option<PathBuf> {
    // XDG_CONFIG_HOME or ~/.config on Linux/macOS
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

// ── Default config template written on first run ──────────────────────────────

const DEFAULT_CONFIG_TOML: &str = r#"# aicommit configuration
# Run `aicommit --init` to regenerate this file.

[ai]
# Provider: "gpt" (OpenAI), "gemini", "ollama", or "geminicli"
provider = "ollama"
# API key for gpt/gemini. Env vars AICOMMIT_API_KEY, OPENAI_API_KEY and
# GEMINI_API_KEY are also honored.
# api_key = "sk-..."

[ollama]
# Path to the ollama binary. Defaults to the one found on PATH.
# path = "/usr/local/bin/ollama"
model = "llama3.1:8b"

[security]
# Comma-separated keywords flagged by the pre-commit security scan.
# Replaces the built-in list (password, api_key, access_token, ...).
# Also overridable per run with --keywords or AICOMMIT_KEYWORDS.
# keywords = "password,api_key,my_internal_token"
"#;

// ── Tests ──────────────────────────────────────────────────────────────────────
