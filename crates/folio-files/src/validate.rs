//! Post-edit structural checks for document sources

use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static ENVIRONMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(begin|end)\{([^}]+)\}").expect("environment pattern is valid")
});

/// Source format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// LaTeX source
    Latex,
    /// Markdown
    Markdown,
    /// Anything else
    Text,
}

impl DocumentFormat {
    /// Guesses the format from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("tex") | Some("latex") | Some("sty") | Some("cls") => DocumentFormat::Latex,
            Some("md") | Some("markdown") => DocumentFormat::Markdown,
            _ => DocumentFormat::Text,
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Latex => write!(f, "latex"),
            DocumentFormat::Markdown => write!(f, "markdown"),
            DocumentFormat::Text => write!(f, "text"),
        }
    }
}

/// Outcome of a validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether no problems were found
    pub valid: bool,
    /// Problem descriptions
    pub errors: Vec<String>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Checks document content after an edit
pub trait ContentValidator: Send + Sync {
    /// Validates content in the given format
    fn validate(&self, content: &str, format: DocumentFormat) -> ValidationReport;
}

/// Delimiter balance checks: LaTeX braces and environments, Markdown fences
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimiterValidator;

impl ContentValidator for DelimiterValidator {
    fn validate(&self, content: &str, format: DocumentFormat) -> ValidationReport {
        let errors = match format {
            DocumentFormat::Latex => {
                let mut errors = check_braces(content);
                errors.extend(check_environments(content));
                errors
            }
            DocumentFormat::Markdown => check_fences(content),
            DocumentFormat::Text => Vec::new(),
        };
        ValidationReport::from_errors(errors)
    }
}

/// Unescaped `{`/`}` balance, ignoring `%` comments
fn check_braces(content: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut depth: usize = 0;

    for (index, line) in content.lines().enumerate() {
        let mut escaped = false;
        for ch in line.chars() {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '%' => break,
                '{' => depth += 1,
                '}' => {
                    if depth == 0 {
                        errors.push(format!("Line {}: unmatched '}}'", index + 1));
                    } else {
                        depth -= 1;
                    }
                }
                _ => {}
            }
        }
    }

    if depth > 0 {
        errors.push(format!("{} unclosed '{{'", depth));
    }
    errors
}

fn check_environments(content: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut stack: Vec<(String, usize)> = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let code = line.split('%').next().unwrap_or_default();
        for caps in ENVIRONMENT.captures_iter(code) {
            let name = caps[2].to_string();
            if &caps[1] == "begin" {
                stack.push((name, index + 1));
                continue;
            }
            match stack.pop() {
                Some((open, _)) if open == name => {}
                Some((open, opened_at)) => errors.push(format!(
                    "Line {}: \\end{{{}}} closes \\begin{{{}}} from line {}",
                    index + 1,
                    name,
                    open,
                    opened_at
                )),
                None => errors.push(format!(
                    "Line {}: \\end{{{}}} without \\begin",
                    index + 1,
                    name
                )),
            }
        }
    }

    for (open, opened_at) in stack {
        errors.push(format!("Line {}: \\begin{{{}}} is never closed", opened_at, open));
    }
    errors
}

fn check_fences(content: &str) -> Vec<String> {
    let mut open: Option<usize> = None;
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            open = match open {
                Some(_) => None,
                None => Some(index + 1),
            };
        }
    }

    match open {
        Some(line) => vec![format!("Line {}: code fence is never closed", line)],
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.tex")), DocumentFormat::Latex);
        assert_eq!(DocumentFormat::from_path(Path::new("a.MD")), DocumentFormat::Markdown);
        assert_eq!(DocumentFormat::from_path(Path::new("a.txt")), DocumentFormat::Text);
        assert_eq!(DocumentFormat::from_path(Path::new("README")), DocumentFormat::Text);
    }

    #[test]
    fn test_balanced_latex() {
        let content = "\\begin{itemize}\n\\item {a} \\{ literal\n\\end{itemize}\n% stray } in comment\n";
        let report = DelimiterValidator.validate(content, DocumentFormat::Latex);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn test_unbalanced_braces() {
        let report = DelimiterValidator.validate("\\textbf{open\n}}\n", DocumentFormat::Latex);
        assert!(!report.valid);
        assert_eq!(report.errors, vec!["Line 2: unmatched '}'".to_string()]);

        let report = DelimiterValidator.validate("\\emph{x", DocumentFormat::Latex);
        assert_eq!(report.errors, vec!["1 unclosed '{'".to_string()]);
    }

    #[test]
    fn test_mismatched_environments() {
        let content = "\\begin{figure}\n\\begin{center}\n\\end{figure}\n";
        let report = DelimiterValidator.validate(content, DocumentFormat::Latex);

        assert!(!report.valid);
        assert!(report.errors[0].contains("closes \\begin{center}"));
        assert!(report.errors[1].contains("\\begin{figure} is never closed"));
    }

    #[test]
    fn test_markdown_fences() {
        let ok = "# T\n```rust\nfn x() {}\n```\n";
        assert!(DelimiterValidator.validate(ok, DocumentFormat::Markdown).valid);

        let open = "# T\n```\ncode\n";
        let report = DelimiterValidator.validate(open, DocumentFormat::Markdown);
        assert_eq!(report.errors, vec!["Line 2: code fence is never closed".to_string()]);
    }

    #[test]
    fn test_plain_text_always_valid() {
        assert!(DelimiterValidator.validate("}{", DocumentFormat::Text).valid);
    }
}
