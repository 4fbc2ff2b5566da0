/// AI providers for commit message generation.
///
/// Two HTTP backends (OpenAI, Gemini) via reqwest and two subprocess
/// backends (Ollama, Gemini CLI) via tokio::process. Every call carries a
/// fixed 60s upper bound — HTTP through the client timeout, subprocesses
/// through tokio::time::timeout — so a hung backend can never wedge the
/// session. No retries: the first failure surfaces to the user.
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde_json::Value;
use tokio::time::timeout;

use crate::config::ResolvedConfig;

const SYSTEM_PROMPT: &str = "You are an assistant that writes concise, conventional git commit \
messages. Given a diff and a short status summary, reply with a single \
commit message line (imperative mood, under 72 characters) and nothing else.";

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 256;
const AI_TIMEOUT_SECS: u64 = 60;

// ── Provider ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gpt,
    Gemini,
    Ollama,
    GeminiCli,
    None,
}

impl Provider {
    /// Parse a provider name (case-insensitive, accepts common aliases).
    /// Unrecognized input is an error, never silently coerced.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "gpt" | "openai" | "gpt3" | "gpt3.5" | "gpt4" => Ok(Self::Gpt),
            "gemini" | "google" => Ok(Self::Gemini),
            "geminicli" | "gemini_cli" | "gemini_wrapper" | "gemini-cli" | "gemini-wrapper" => {
                Ok(Self::GeminiCli)
            }
            "ollama" | "local" => Ok(Self::Ollama),
            "" | "none" => Ok(Self::None),
            other => Err(anyhow!("unknown provider: {other}")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Gpt => "gpt",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
            Self::GeminiCli => "geminicli",
            Self::None => "none",
        }
    }
}

// ── Generator ─────────────────────────────────────────────────────────────────

/// One configured generation backend. Built once per session; the provider
/// never changes after construction.
pub struct Generator {
    provider: Provider,
    api_key: Option<String>,
    ollama_path: Option<String>,
    ollama_model: String,
    http: reqwest::Client,
}

impl Generator {
    pub fn new(resolved: &ResolvedConfig) -> Self {
        Self {
            provider: resolved.provider,
            api_key: resolved.api_key.clone(),
            ollama_path: resolved.ollama_path.clone(),
            ollama_model: resolved.ollama_model.clone(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(AI_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Generate a commit message from a diff and status summary.
    pub async fn generate(&self, diff: &str, status: &str) -> Result<String> {
        let user = build_user_message(diff, status);
        match self.provider {
            Provider::Gpt => self.call_gpt(&user).await,
            Provider::Gemini => self.call_gemini(&user).await,
            Provider::Ollama => self.call_ollama(&user).await,
            Provider::GeminiCli => self.call_gemini_cli(&user).await,
            Provider::None => bail!("invalid AI provider: none"),
        }
    }

    // ── OpenAI ────────────────────────────────────────────────────────────────

    async fn call_gpt(&self, user: &str) -> Result<String> {
        let Some(key) = &self.api_key else {
            bail!("API key not set");
        };

        let body = serde_json::json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": user},
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let resp = self
            .http
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {key}"))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("API error {status}: {text}");
        }

        let body: Value = resp.json().await?;
        parse_gpt_response(&body)
    }

    // ── Gemini ────────────────────────────────────────────────────────────────

    async fn call_gemini(&self, user: &str) -> Result<String> {
        let Some(key) = &self.api_key else {
            bail!("API key not set");
        };

        let body = serde_json::json!({
            "contents": [
                {"parts": [{"text": SYSTEM_PROMPT}, {"text": user}]}
            ],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS,
            },
        });

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key={key}"
        );

        let resp = self.http.post(&url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("API error {status}: {text}");
        }

        let body: Value = resp.json().await?;
        parse_gemini_response(&body)
    }

    // ── Ollama (subprocess) ───────────────────────────────────────────────────

    async fn call_ollama(&self, user: &str) -> Result<String> {
        let Some(path) = &self.ollama_path else {
            bail!("ollama binary not found in PATH");
        };

        let prompt = format!("{SYSTEM_PROMPT}\n\n{user}");
        let fut = tokio::process::Command::new(path)
            .args(["run", &self.ollama_model, &prompt])
            .output();

        let output = match timeout(Duration::from_secs(AI_TIMEOUT_SECS), fut).await {
            Ok(Ok(o)) => o,
            Ok(Err(e)) => bail!("ollama command failed to start: {e}"),
            Err(_) => bail!("ollama command timed out"),
        };

        let combined = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        if !output.status.success() {
            bail!("ollama command failed: {}", combined.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    // ── Gemini CLI (subprocess) ───────────────────────────────────────────────

    async fn call_gemini_cli(&self, user: &str) -> Result<String> {
        let prompt = format!("System: {SYSTEM_PROMPT}\nUser: {user}");
        let fut = tokio::process::Command::new("gemini")
            .args(["-p", &prompt])
            .output();

        let output = match timeout(Duration::from_secs(AI_TIMEOUT_SECS), fut).await {
            Ok(Ok(o)) => o,
            Ok(Err(e)) => bail!("gemini command failed to start: {e}"),
            Err(_) => bail!("gemini command timed out"),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("gemini command failed: {}", stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

// ── Response parsing ──────────────────────────────────────────────────────────

fn build_user_message(diff: &str, status: &str) -> String {
    format!("diff: {diff}\n\nstatus: {status}")
}

fn parse_gpt_response(body: &Value) -> Result<String> {
    body["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("no response from provider"))
}

fn parse_gemini_response(body: &Value) -> Result<String> {
    body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("no response from provider"))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
