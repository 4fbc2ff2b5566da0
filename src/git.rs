/// Git integration for aicommit — changed-file listing, file-scoped diffs
/// and status, commit, push.
///
/// Everything shells out to the `git` binary. Startup queries (changed
/// files) run synchronously; the operations dispatched from the workflow
/// loop are async so they never block the interactive surface.
use anyhow::{anyhow, bail, Result};

// ── Startup queries (sync) ─────────────────────────────────────────────────────

/// Returns the paths of all changed files from `git status --porcelain`.
pub fn changed_files() -> Result<Vec<String>> {
    let output = std::process::Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .map_err(|e| anyhow!("failed to run git: {e}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("git status failed: {}", stderr.trim());
    }

    Ok(parse_changed_files(&String::from_utf8_lossy(&output.stdout)))
}

/// Extract file paths from porcelain status lines ("XY path").
fn parse_changed_files(porcelain: &str) -> Vec<String> {
    porcelain
        .lines()
        .filter(|l| l.len() > 3)
        .map(|l| l[3..].trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

// ── Workflow operations (async) ────────────────────────────────────────────────

/// Returns `git diff HEAD -- <files>` — all staged and unstaged changes
/// for exactly the given files. An empty file list yields an empty diff.
pub async fn diff_for_files(files: &[String]) -> Result<String> {
    let clean: Vec<&str> = files
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .collect();
    if clean.is_empty() {
        return Ok(String::new());
    }

    let mut args = vec!["diff", "HEAD", "--"];
    args.extend(&clean);
    run_git(&args).await
}

/// Returns the `git status --porcelain` lines for the given files only.
pub async fn status_for_files(files: &[String]) -> Result<String> {
    if files.is_empty() {
        return Ok(String::new());
    }
    let out = run_git(&["status", "--porcelain"]).await?;
    Ok(filter_status(&out, files))
}

/// Keep porcelain lines whose path is in `files`. Renames appear as
/// "XY old -> new" — match if either side is selected.
fn filter_status(porcelain: &str, files: &[String]) -> String {
    let relevant: Vec<&str> = porcelain
        .lines()
        .filter(|line| {
            if line.len() < 4 {
                return false;
            }
            let path = line[3..].trim();
            if let Some((old, new)) = path.split_once(" -> ") {
                files.iter().any(|f| f == old || f == new)
            } else {
                files.iter().any(|f| f == path)
            }
        })
        .collect();
    relevant.join("\n")
}

/// Stage exactly `files` and commit only them with `message`.
pub async fn commit(files: &[String], message: &str) -> Result<()> {
    if files.is_empty() {
        bail!("no files provided to commit");
    }

    let mut add_args = vec!["add", "--"];
    add_args.extend(files.iter().map(String::as_str));
    run_git(&add_args).await?;

    let output = tokio::process::Command::new("git")
        .args(["commit", "-m", message])
        .output()
        .await
        .map_err(|e| anyhow!("failed to run git: {e}"))?;

    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    commit_outcome(output.status.success(), &combined)
}

/// Interpret `git commit` output. "nothing to commit" is success — the
/// selection may contain files whose staged content already matches HEAD.
fn commit_outcome(status_ok: bool, combined: &str) -> Result<()> {
    if status_ok || combined.contains("nothing to commit") {
        return Ok(());
    }
    bail!("git commit failed: {}", combined.trim())
}

/// Push the current branch. Git's own output is the error text.
pub async fn push() -> Result<()> {
    let output = tokio::process::Command::new("git")
        .arg("push")
        .output()
        .await
        .map_err(|e| anyhow!("failed to run git: {e}"))?;

    if output.status.success() {
        return Ok(());
    }
    let combined = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    bail!("git push failed: {}", combined.trim())
}

/// Run a git command. Returns stdout on success, Err(stderr) on failure.
async fn run_git(args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new("git")
        .args(args)
        .output()
        .await
        .map_err(|e| anyhow!("failed to run git: {e}"))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow!("git {}: {}", args.join(" "), stderr.trim()))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_changed_files() {
        let porcelain = " M src/main.rs\n?? notes.txt\nA  src/new.rs\n";
        let files = parse_changed_files(porcelain);
        assert_eq!(files, vec!["src/main.rs", "notes.txt", "src/new.rs"]);
    }

    #[test]
    fn test_parse_changed_files_skips_short_lines() {
        assert!(parse_changed_files("\n M \n").is_empty());
    }

    #[test]
    fn test_filter_status_keeps_selected_only() {
        let porcelain = " M a.rs\n M b.rs\n?? c.txt";
        let files = vec!["a.rs".to_string(), "c.txt".to_string()];
        let out = filter_status(porcelain, &files);
        assert_eq!(out, " M a.rs\n?? c.txt");
    }

    #[test]
    fn test_commit_outcome_nothing_to_commit_is_success() {
        // Git exits non-zero here, but the selection just had nothing new.
        let out = "On branch main\nnothing to commit, working tree clean\n";
        assert!(commit_outcome(false, out).is_ok());
    }

    #[test]
    fn test_commit_outcome_success_and_failure() {
        assert!(commit_outcome(true, "").is_ok());

        let err = commit_outcome(false, "error: gpg failed to sign the data\n").unwrap_err();
        assert!(err.to_string().contains("git commit failed"));
        assert!(err.to_string().contains("gpg failed to sign the data"));
    }

    #[test]
    fn test_filter_status_matches_rename_on_either_side() {
        let porcelain = "R  old.rs -> new.rs\n M other.rs";

        let by_new = filter_status(porcelain, &["new.rs".to_string()]);
        assert_eq!(by_new, "R  old.rs -> new.rs");

        let by_old = filter_status(porcelain, &["old.rs".to_string()]);
        assert_eq!(by_old, "R  old.rs -> new.rs");

        let neither = filter_status(porcelain, &["unrelated.rs".to_string()]);
        assert!(neither.is_empty());
    }
}
