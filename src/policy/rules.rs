//! URL pattern lists (whitelist / blacklist).
//!
//! Patterns are regular expressions with find semantics: a pattern matches if
//! it occurs anywhere in the URL, so `/admin` matches
//! `https://example.com/admin/users`. A pattern that fails to compile is kept
//! as a literal substring so a typo never turns into a startup failure.

use regex::{Regex, RegexSet, RegexSetBuilder};

/// Compiled-size ceiling for the combined set, the `regex` crate default.
const SET_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A compiled list of URL patterns.
#[derive(Debug, Clone)]
pub struct UrlRules {
    regexes: RegexSet,
    /// Used instead of `regexes` when the combined set is too large to build.
    singles: Vec<Regex>,
    literals: Vec<String>,
}

impl UrlRules {
    pub fn compile(patterns: &[String]) -> Self {
        Self::compile_with_limit(patterns, SET_SIZE_LIMIT)
    }

    fn compile_with_limit(patterns: &[String], set_size_limit: usize) -> Self {
        let mut valid = Vec::with_capacity(patterns.len());
        let mut literals = Vec::new();

        for pattern in patterns {
            if pattern.is_empty() {
                tracing::warn!("Ignoring empty URL pattern");
                continue;
            }
            match Regex::new(pattern) {
                Ok(regex) => valid.push(regex),
                Err(e) => {
                    tracing::warn!(
                        pattern = %pattern,
                        error = %e,
                        "Invalid URL pattern, matching it as a literal"
                    );
                    literals.push(pattern.clone());
                }
            }
        }

        match RegexSetBuilder::new(valid.iter().map(Regex::as_str))
            .size_limit(set_size_limit)
            .build()
        {
            Ok(regexes) => Self {
                regexes,
                singles: Vec::new(),
                literals,
            },
            Err(e) => {
                tracing::warn!(
                    patterns = valid.len(),
                    error = %e,
                    "URL pattern set too large, matching patterns one by one"
                );
                Self {
                    regexes: RegexSet::empty(),
                    singles: valid,
                    literals,
                }
            }
        }
    }

    /// Returns true if any pattern occurs in `url`.
    pub fn matches(&self, url: &str) -> bool {
        self.regexes.is_match(url)
            || self.singles.iter().any(|r| r.is_match(url))
            || self.literals.iter().any(|l| url.contains(l.as_str()))
    }

    pub fn len(&self) -> usize {
        self.regexes.len() + self.singles.len() + self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
