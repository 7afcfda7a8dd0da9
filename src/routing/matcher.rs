//! Path pattern matching and parameter extraction.
//!
//! # Responsibilities
//! - Normalize paths (strip trailing slash, root excepted)
//! - Compile `{name}` placeholder patterns to anchored regexes
//! - Extract named path parameters from matching paths
//!
//! # Design Decisions
//! - A placeholder matches exactly one segment: the capture group excludes
//!   `/`, so `/users/{id}` never matches `/users/42/posts`
//! - Every literal character is regex-escaped, so paths containing `.`,
//!   `+`, or parentheses cannot be mis-read as pattern syntax
//! - Patterns compile once at registration and are reused for every lookup

use std::collections::HashMap;

use regex::Regex;

/// Normalize a request or registration path: ensure a leading slash and
/// strip trailing slashes, keeping bare `/` intact.
pub fn normalize_path(path: &str) -> String {
    let with_lead = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    let trimmed = with_lead.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// A compiled path pattern such as `/users/{id}/posts/{post_id}`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    regex: Regex,
    param_names: Vec<String>,
}

/// Invalid pattern, e.g. an unclosed or empty placeholder.
#[derive(Debug, thiserror::Error)]
#[error("invalid path pattern '{pattern}': {message}")]
pub struct PatternError {
    pub pattern: String,
    pub message: String,
}

impl PathPattern {
    /// Compile a normalized pattern. Placeholders become named,
    /// slash-excluding capture groups; everything else is escaped.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let pattern = normalize_path(pattern);
        let mut regex_src = String::from("^");
        let mut param_names = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '{' {
                literal.push(c);
                continue;
            }

            regex_src.push_str(&regex::escape(&literal));
            literal.clear();

            let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            let valid = !name.is_empty()
                && name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
                && !name.starts_with(|c: char| c.is_ascii_digit());
            if !valid {
                return Err(PatternError {
                    pattern: pattern.clone(),
                    message: format!("bad placeholder name '{{{name}}}'"),
                });
            }
            regex_src.push_str(&format!("(?P<{name}>[^/]+)"));
            param_names.push(name);
        }
        regex_src.push_str(&regex::escape(&literal));
        regex_src.push('$');

        let regex = Regex::new(&regex_src).map_err(|e| PatternError {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            pattern,
            regex,
            param_names,
        })
    }

    /// The normalized pattern text.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Whether this pattern contains any `{name}` placeholders.
    pub fn has_placeholders(&self) -> bool {
        !self.param_names.is_empty()
    }

    /// Test a (normalized) path against the whole pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Extract named captures; empty map when the path does not match.
    pub fn extract(&self, path: &str) -> HashMap<String, String> {
        let Some(captures) = self.regex.captures(path) else {
            return HashMap::new();
        };
        self.param_names
            .iter()
            .filter_map(|name| {
                captures
                    .name(name)
                    .map(|m| (name.clone(), m.as_str().to_string()))
            })
            .collect()
    }
}

/// One-shot parameter extraction for an uncompiled pattern. Returns an
/// empty map when the path does not match or the pattern is invalid.
pub fn extract_path_params(pattern: &str, path: &str) -> HashMap<String, String> {
    match PathPattern::compile(pattern) {
        Ok(compiled) => compiled.extract(&normalize_path(path)),
        Err(_) => HashMap::new(),
    }
}
