//! Source tree filtering

use std::path::{Component, Path};

/// Tokens excluded from packing unless configured otherwise
pub const DEFAULT_IGNORE_TOKENS: [&str; 2] = [".meta", ".DS_Store"];

/// Decides which files of a source tree are left out of a container.
///
/// A file is ignored when any token:
/// - occurs inside the name of one of its ancestor directories, or
/// - equals its file name, or
/// - ends its file name.
///
/// Paths are taken relative to the source root, so directories above the
/// root never exclude anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnorePolicy {
    tokens: Vec<String>,
}

impl IgnorePolicy {
    /// Create a policy from a list of tokens. Empty tokens are dropped.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|token: &String| !token.is_empty())
                .collect(),
        }
    }

    /// A policy that ignores nothing
    pub fn none() -> Self {
        Self { tokens: Vec::new() }
    }

    /// Configured tokens
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Check a path relative to the source root
    pub fn is_ignored(&self, relative: &Path) -> bool {
        if self.tokens.is_empty() {
            return false;
        }

        let file_name = relative
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();

        let in_ignored_dir = relative.parent().is_some_and(|parent| {
            parent.components().any(|component| match component {
                Component::Normal(dir) => {
                    let dir = dir.to_string_lossy();
                    self.tokens.iter().any(|token| dir.contains(token.as_str()))
                }
                _ => false,
            })
        });

        // An exact match is also a suffix match.
        in_ignored_dir
            || self
                .tokens
                .iter()
                .any(|token| file_name.ends_with(token.as_str()))
    }
}

impl Default for IgnorePolicy {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_TOKENS)
    }
}
