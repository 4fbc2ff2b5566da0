/// Security pre-scan over unified diffs.
///
/// Flags *added* lines that contain any configured sensitive keyword
/// (case-insensitive substring — over-flagging is deliberate, missing a
/// secret is worse than a false positive). Each finding carries the file
/// path and the line number the line will occupy after the diff applies.
use anyhow::{anyhow, Result};

// ── Data structures ────────────────────────────────────────────────────────────

/// One flagged added line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub file: String,
    /// 1-based line number in the post-patch version of the file.
    pub line: usize,
    /// The offending line text, trimmed.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkLine {
    Added(String),
    Removed(String),
    Context(String),
}

#[derive(Debug, Clone)]
pub struct Hunk {
    /// Declared starting line of this hunk in the post-patch file.
    pub new_start: usize,
    pub lines: Vec<HunkLine>,
}

#[derive(Debug, Clone)]
pub struct FileDiff {
    /// Logical path of the post-patch file, "a/"/"b/" prefix stripped.
    pub path: String,
    pub hunks: Vec<Hunk>,
}

// ── Default keywords ───────────────────────────────────────────────────────────

/// Built-in sensitive keyword list. Overridable via config file, env, or
/// the --keywords flag (CSV) — see `parse_keywords_csv`.
pub fn default_keywords() -> Vec<String> {
    [
        "password",
        "passwd",
        "pwd",
        "secret",
        "api_key",
        "apikey",
        "access_token",
        "private_key",
        "ssh-rsa",
        "begin private key",
        "aws_access_key_id",
        "aws_secret_access_key",
        "client_secret",
        "jwt",
        "encryption_key",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Parse a comma-separated keyword list: lowercased, trimmed, empties dropped.
pub fn parse_keywords_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

// ── Parser ─────────────────────────────────────────────────────────────────────

/// Parse unified diff output into per-file hunks.
/// Empty input yields an empty list. A malformed hunk header is an error.
pub fn parse_diff(raw: &str) -> Result<Vec<FileDiff>> {
    let mut files: Vec<FileDiff> = Vec::new();
    let mut current_file: Option<FileDiff> = None;
    let mut current_hunk: Option<Hunk> = None;

    for line in raw.lines() {
        // New file header: diff --git a/path b/path
        if line.starts_with("diff --git") {
            if let Some(hunk) = current_hunk.take() {
                if let Some(file) = &mut current_file {
                    file.hunks.push(hunk);
                }
            }
            if let Some(file) = current_file.take() {
                files.push(file);
            }

            let path = line.split(" b/").last().unwrap_or("").to_string();
            current_file = Some(FileDiff { path, hunks: Vec::new() });
            continue;
        }

        // Hunk header: @@ -old_start,old_count +new_start,new_count @@ context
        if line.starts_with("@@") {
            if let Some(hunk) = current_hunk.take() {
                if let Some(file) = &mut current_file {
                    file.hunks.push(hunk);
                }
            }
            let new_start = parse_hunk_header(line)
                .ok_or_else(|| anyhow!("malformed hunk header: {line}"))?;
            current_hunk = Some(Hunk { new_start, lines: Vec::new() });
            continue;
        }

        // "+++"/"---" are file headers, never hunk content.
        if line.starts_with("+++") || line.starts_with("---") {
            continue;
        }

        if let Some(hunk) = &mut current_hunk {
            if let Some(rest) = line.strip_prefix('+') {
                hunk.lines.push(HunkLine::Added(rest.to_string()));
            } else if let Some(rest) = line.strip_prefix('-') {
                hunk.lines.push(HunkLine::Removed(rest.to_string()));
            } else if let Some(rest) = line.strip_prefix(' ') {
                hunk.lines.push(HunkLine::Context(rest.to_string()));
            }
            // Blank lines and any other prefix ("\ No newline at end of
            // file", mode lines) are ignored.
        }
    }

    if let Some(hunk) = current_hunk {
        if let Some(file) = &mut current_file {
            file.hunks.push(hunk);
        }
    }
    if let Some(file) = current_file {
        files.push(file);
    }

    Ok(files)
}

/// Extract the post-patch start line from "@@ -10,4 +10,15 @@ fn foo()".
fn parse_hunk_header(line: &str) -> Option<usize> {
    let after = line.strip_prefix("@@ ")?;
    let end = after.find(" @@")?;
    let range = &after[..end];

    let new_part = range.split_whitespace().nth(1)?.strip_prefix('+')?;
    let start = match new_part.split_once(',') {
        Some((start, _count)) => start.parse().ok()?,
        None => new_part.parse().ok()?,
    };
    Some(start)
}

// ── Scanner ────────────────────────────────────────────────────────────────────

/// Scan a unified diff for added lines containing any of `keywords`.
/// Pure function of its inputs; findings come back in diff order.
pub fn scan(diff_text: &str, keywords: &[String]) -> Result<Vec<Finding>> {
    let files = parse_diff(diff_text)?;

    let mut findings = Vec::new();
    for file in &files {
        let path = file
            .path
            .strip_prefix("b/")
            .or_else(|| file.path.strip_prefix("a/"))
            .unwrap_or(&file.path);

        for hunk in &file.hunks {
            // Running post-patch line counter: added and context lines
            // advance it, removed lines don't exist after the patch.
            let mut new_line = hunk.new_start;
            for line in &hunk.lines {
                match line {
                    HunkLine::Added(text) => {
                        if contains_keyword(text, keywords) {
                            findings.push(Finding {
                                file: path.to_string(),
                                line: new_line,
                                text: text.trim().to_string(),
                            });
                        }
                        new_line += 1;
                    }
                    HunkLine::Context(_) => new_line += 1,
                    HunkLine::Removed(_) => {}
                }
            }
        }
    }

    Ok(findings)
}

fn contains_keyword(text: &str, keywords: &[String]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|kw| lower.contains(kw.as_str()))
}

// ── Rendering ──────────────────────────────────────────────────────────────────

/// Render findings as one line each, with a file:// URI so terminals like
/// VS Code make the location clickable.
pub fn render_findings(findings: &[Finding]) -> String {
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let mut out = String::new();
    for f in findings {
        let abs = if std::path::Path::new(&f.file).is_absolute() {
            std::path::PathBuf::from(&f.file)
        } else {
            cwd.join(&f.file)
        };
        out.push_str(&format!("- file://{}:{}:1: {}\n", abs.display(), f.line, f.text));
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_DIFF: &str = "\
diff --git a/src/main.rs b/src/main.rs
index abc123..def456 100644
--- a/src/main.rs
+++ b/src/main.rs
@@ -1,3 +1,4 @@ fn main()
 fn main() {
+    let password = \"x\";
     let x = 1;
 }
";

    fn kw(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_scan_flags_added_line_with_keyword() {
        let findings = scan(SIMPLE_DIFF, &kw(&["password"])).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].file, "src/main.rs");
        assert_eq!(findings[0].line, 2);
        assert_eq!(findings[0].text, "let password = \"x\";");
    }

    #[test]
    fn test_scan_ignores_context_and_removed_lines() {
        let diff = "\
diff --git a/cfg.rs b/cfg.rs
--- a/cfg.rs
+++ b/cfg.rs
@@ -1,3 +1,2 @@
 let a = 1;
-let password = \"old\";
 let b = 2;
";
        let findings = scan(diff, &kw(&["password"])).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_scan_line_numbers_skip_removed_lines() {
        // Post-patch: line 10 "keep", line 11 "let secret = 1" (the removed
        // line doesn't exist after the patch and must not advance the counter).
        let diff = "\
diff --git a/x.rs b/x.rs
--- a/x.rs
+++ b/x.rs
@@ -10,3 +10,3 @@
 keep
-old line
+let secret = 1;
 tail
";
        let findings = scan(diff, &kw(&["secret"])).unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 11);
    }

    #[test]
    fn test_scan_counts_context_and_added_before_match() {
        let diff = "\
diff --git a/y.rs b/y.rs
--- a/y.rs
+++ b/y.rs
@@ -5,4 +5,6 @@
 ctx1
+added1
 ctx2
+api_key = \"k\"
 ctx3
";
        let findings = scan(diff, &kw(&["api_key"])).unwrap();
        assert_eq!(findings.len(), 1);
        // start 5 + ctx1 + added1 + ctx2 = line 8
        assert_eq!(findings[0].line, 8);
    }

    #[test]
    fn test_scan_case_insensitive_substring() {
        let diff = "\
diff --git a/z.rs b/z.rs
--- a/z.rs
+++ b/z.rs
@@ -1,1 +1,2 @@
 x
+const DB_PASSWORD_HASH: u8 = 0;
";
        let findings = scan(diff, &kw(&["password"])).unwrap();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_scan_multiple_files_and_hunks() {
        let diff = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1,1 +1,2 @@
 x
+token = 1
@@ -10,1 +11,2 @@
 y
+apikey = 2
diff --git a/b.rs b/b.rs
--- a/b.rs
+++ b/b.rs
@@ -1,0 +1,1 @@
+client_secret = 3
";
        let findings = scan(diff, &kw(&["token", "apikey", "client_secret"])).unwrap();
        assert_eq!(findings.len(), 3);
        assert_eq!((findings[0].file.as_str(), findings[0].line), ("a.rs", 2));
        assert_eq!((findings[1].file.as_str(), findings[1].line), ("a.rs", 12));
        assert_eq!((findings[2].file.as_str(), findings[2].line), ("b.rs", 1));
    }

    #[test]
    fn test_scan_empty_diff_is_ok() {
        let findings = scan("", &default_keywords()).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_scan_plus_plus_plus_header_is_not_content() {
        // The +++ header contains no keyword here, but it must not advance
        // the counter or be scanned even if a keyword were present.
        let diff = "\
diff --git a/secrets.txt b/secrets.txt
--- a/secrets.txt
+++ b/secrets.txt
@@ -1,1 +1,2 @@
 x
+plain line
";
        let findings = scan(diff, &kw(&["secrets"])).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn test_scan_is_order_stable() {
        let first = scan(SIMPLE_DIFF, &kw(&["password"])).unwrap();
        let second = scan(SIMPLE_DIFF, &kw(&["password"])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_hunk_header_is_error() {
        let diff = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ garbage @@
+password = 1
";
        assert!(scan(diff, &kw(&["password"])).is_err());
    }

    #[test]
    fn test_parse_hunk_header_variants() {
        assert_eq!(parse_hunk_header("@@ -10,4 +10,15 @@ impl Foo"), Some(10));
        assert_eq!(parse_hunk_header("@@ -0,0 +1,2 @@"), Some(1));
        assert_eq!(parse_hunk_header("@@ -3 +7 @@"), Some(7));
        assert_eq!(parse_hunk_header("@@ nonsense @@"), None);
    }

    #[test]
    fn test_parse_keywords_csv() {
        let kws = parse_keywords_csv(" My_Secret , api_key ,, token ");
        assert_eq!(kws, vec!["my_secret", "api_key", "token"]);
    }

    #[test]
    fn test_render_findings_format() {
        let findings = vec![Finding {
            file: "src/lib.rs".to_string(),
            line: 42,
            text: "password = 1".to_string(),
        }];
        let out = render_findings(&findings);
        assert!(out.starts_with("- file://"));
        assert!(out.contains("src/lib.rs:42:1: password = 1"));
    }
}
