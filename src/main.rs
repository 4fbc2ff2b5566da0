mod config;
mod git;
mod provider;
mod security;
mod tui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use config::{ConfigFile, ResolvedConfig};

#[derive(Parser, Debug)]
#[command(
    name = "aicommit",
    about = "Interactive AI-generated commit messages with a security pre-scan",
    long_about = None,
)]
struct Args {
    /// AI provider to use (gpt|gemini|ollama|geminicli). If empty, uses env or config.
    #[arg(short, long, env = "AICOMMIT_PROVIDER")]
    provider: Option<String>,

    /// API key for the gpt/gemini providers
    #[arg(short = 'k', long, env = "AICOMMIT_API_KEY")]
    api_key: Option<String>,

    /// Comma-separated sensitive keywords for the security scan
    /// (replaces the built-in list)
    #[arg(long, env = "AICOMMIT_KEYWORDS")]
    keywords: Option<String>,

    /// Write a default config file to ~/.config/aicommit/config.toml and exit
    #[arg(long)]
    init: bool,

    /// Generate shell completions and print to stdout (bash, zsh, fish, elvish)
    #[arg(long, value_name = "SHELL")]
    completions: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── --init ────────────────────────────────────────────────────────────────
    if args.init {
        let path = ConfigFile::write_default_if_missing()?;
        println!("Config written to: {}", path.display());
        println!("Edit it, then run: aicommit");
        return Ok(());
    }

    // ── --completions ─────────────────────────────────────────────────────────
    if let Some(shell_name) = &args.completions {
        return generate_completions(shell_name);
    }

    let file = ConfigFile::load()?;
    let resolved = ResolvedConfig::resolve(
        &file,
        args.provider.as_deref(),
        args.api_key.as_deref(),
        args.keywords.as_deref(),
    )?;

    tui::run(resolved).await
}

// ── Shell completions ─────────────────────────────────────────────────────────

fn generate_completions(shell_name: &str) -> Result<()> {
    use clap_complete::{Shell, generate};

    let shell: Shell = match shell_name.to_lowercase().as_str() {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "elvish" => Shell::Elvish,
        _ => {
            eprintln!("Unknown shell: {shell_name}");
            eprintln!("Supported: bash, zsh, fish, elvish");
            std::process::exit(1);
        }
    };

    let mut cmd = Args::command();
    generate(shell, &mut cmd, "aicommit", &mut std::io::stdout());
    Ok(())
}
