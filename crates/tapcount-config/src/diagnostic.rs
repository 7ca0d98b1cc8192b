// SPDX-FileCopyrightText: 2026 Tapcount Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Config error diagnostics.
//!
//! Turns Figment extraction failures into miette reports that point at the
//! offending line of `tapcount.toml` and suggest the closest valid key.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Jaro-Winkler score a candidate must beat to be offered as a correction.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// A configuration problem, rendered through miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(tapcount::config::unknown_key),
        help("{}", unknown_key_help(suggestion.as_deref(), valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a recognized key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(code(tapcount::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        detail: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(tapcount::config::missing_key),
        help("add `{key} = <value>` to tapcount.toml")
    )]
    MissingKey { key: String },

    /// A value parsed correctly but violates a semantic rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(tapcount::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(tapcount::config::other))]
    Other(String),
}

impl ConfigError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

fn unknown_key_help(suggestion: Option<&str>, valid_keys: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
        None => format!("valid keys: {valid_keys}"),
    }
}

/// Flatten a Figment error chain into one diagnostic per failure.
///
/// `toml_sources` pairs each file path with its contents so unknown keys can
/// be labelled in place.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let dotted = error
                .path
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(".");
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    let suggestion = suggest_key(field, expected);
                    let (span, src) = locate_key(&error, field, toml_sources);
                    ConfigError::UnknownKey {
                        key: field.clone(),
                        suggestion,
                        valid_keys: expected.join(", "),
                        span,
                        src,
                    }
                }
                Kind::MissingField(field) => ConfigError::MissingKey {
                    key: if dotted.is_empty() {
                        field.to_string()
                    } else {
                        format!("{dotted}.{field}")
                    },
                },
                Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
                    key: dotted,
                    detail: format!("found {actual}, expected {expected}"),
                    expected: expected.clone(),
                },
                _ => ConfigError::Other(error.to_string()),
            }
        })
        .collect()
}

fn locate_key(
    error: &figment::Error,
    field: &str,
    toml_sources: &[(String, String)],
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    let origin = error
        .metadata
        .as_ref()
        .and_then(|m| m.source.as_ref())
        .and_then(|s| match s {
            figment::Source::File(path) => Some(path.display().to_string()),
            _ => None,
        });

    // Inline strings carry no file metadata; fall back to the only source.
    let source = match origin {
        Some(path) => toml_sources.iter().find(|(p, _)| *p == path),
        None if toml_sources.len() == 1 => toml_sources.first(),
        None => None,
    };

    let Some((path, content)) = source else {
        return (None, None);
    };

    match find_key_offset(content, &error.path, field) {
        Some(offset) => (
            Some(SourceSpan::new(offset.into(), field.len())),
            Some(NamedSource::new(path, content.clone())),
        ),
        None => (None, None),
    }
}

/// Byte offset of `field` inside the `[section]` named by `path[0]`, or
/// from the top of the document when `path` is empty.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let start = match path.first() {
        Some(section) => {
            let header = format!("[{section}]");
            content.find(&header)? + header.len()
        }
        None => 0,
    };

    let mut offset = start;
    for line in content[start..].split_inclusive('\n') {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') && !path.is_empty() {
            // Walked into the next table.
            return None;
        }
        if let Some(rest) = trimmed.strip_prefix(field)
            && rest.trim_start().starts_with('=')
        {
            return Some(offset + (line.len() - trimmed.len()));
        }
        offset += line.len();
    }
    None
}

/// Closest valid key by Jaro-Winkler similarity, if any is close enough.
pub fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Print every error to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggests_close_worker_key() {
        let valid = &["concurrency", "rate_limit_per_second", "max_attempts"];
        assert_eq!(
            suggest_key("concurency", valid),
            Some("concurrency".to_string())
        );
        assert_eq!(
            suggest_key("max_atempts", valid),
            Some("max_attempts".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_unrelated_key() {
        let valid = &["interval_secs", "eviction_secs"];
        assert_eq!(suggest_key("qqqq", valid), None);
    }

    #[test]
    fn finds_key_inside_its_section() {
        let content = "[tiers]\nhigh_delay_ms = 1\n\n[worker]\nconcurency = 4\n";
        let offset = find_key_offset(content, &["worker".to_string()], "concurency").unwrap();
        assert_eq!(&content[offset..offset + 10], "concurency");
    }

    #[test]
    fn key_search_stops_at_next_table() {
        let content = "[worker]\nconcurrency = 4\n[tiers]\nbogus = 1\n";
        assert_eq!(
            find_key_offset(content, &["worker".to_string()], "bogus"),
            None
        );
    }
}
