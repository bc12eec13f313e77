// src/manifest/mod.rs

//! Parser for Valve's nested key/value text format (`.acf`, `app_info_print`)
//!
//! The format is line oriented:
//!
//! ```text
//! "AppState"
//! {
//!     "appid"        "376030"
//!     "InstalledDepots"
//!     {
//!         "1006"
//!         {
//!             "manifest"     "6912453647411644579"
//!         }
//!     }
//! }
//! ```
//!
//! Parsing flattens the tree into [`ManifestPair`]s whose path joins every
//! key from the root with `.`, e.g. `.AppState.InstalledDepots.1006.manifest`.
//! The parser is best effort: unterminated scopes and stray lines never fail,
//! they just end the scope early or get ignored.

mod depots;

pub use depots::{installed_depot_manifests, remote_depot_manifests, workshop_time_updated};

use tracing::warn;

/// Nesting deeper than this is skipped rather than recursed into
pub const MAX_DEPTH: usize = 64;

/// One flattened leaf of a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestPair {
    /// Dot-joined key path from the root, starting with the caller's prefix
    pub path: String,
    /// Raw leaf value with quotes removed
    pub value: String,
}

impl ManifestPair {
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Path segments after the leading prefix separator
    ///
    /// `.AppState.appid` yields `["", "AppState", "appid"]`, matching the
    /// positions used by the depot lookups.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('.').collect()
    }
}

/// Parse a manifest document with an empty prefix
pub fn parse(text: &str) -> Vec<ManifestPair> {
    parse_with_prefix(text, "")
}

/// Parse a manifest document, prepending `prefix` to every path
pub fn parse_with_prefix(text: &str, prefix: &str) -> Vec<ManifestPair> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut pairs = Vec::new();
    parse_scope(&lines, prefix, 0, &mut pairs);
    pairs
}

/// Last value recorded for `path`, if any
pub fn lookup<'a>(pairs: &'a [ManifestPair], path: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|pair| pair.path == path)
        .map(|pair| pair.value.as_str())
}

/// Split a line into its key and optional value
fn split_line(line: &str) -> (&str, &str) {
    let line = line.trim();
    let (key, value) = match line.split_once('\t') {
        Some((key, value)) => (key, value),
        None => (line, ""),
    };
    (unquote(key.trim()), unquote(value.trim()))
}

/// Remove one layer of surrounding double quotes
fn unquote(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

/// Parse one scope, returning the number of lines consumed
///
/// The count includes the closing `}` when the scope is terminated; an
/// unterminated scope consumes every remaining line.
fn parse_scope(lines: &[&str], prefix: &str, depth: usize, out: &mut Vec<ManifestPair>) -> usize {
    let mut section = String::new();
    let mut i = 0;

    while i < lines.len() {
        let (key, value) = split_line(lines[i]);

        if key == "{" {
            let rest = &lines[i + 1..];
            let consumed = if depth + 1 >= MAX_DEPTH {
                warn!(
                    "Manifest nesting exceeds {} levels under '{}', skipping block",
                    MAX_DEPTH, prefix
                );
                skip_scope(rest)
            } else {
                let nested = format!("{}.{}", prefix, section);
                parse_scope(rest, &nested, depth + 1, out)
            };
            i += 1 + consumed;
            continue;
        }

        if key == "}" {
            return i + 1;
        }

        if value.is_empty() {
            if !key.is_empty() {
                section = key.to_string();
            }
        } else if !key.is_empty() {
            out.push(ManifestPair::new(format!("{}.{}", prefix, key), value));
        }

        i += 1;
    }

    lines.len()
}

/// Consume a scope without emitting pairs
fn skip_scope(lines: &[&str]) -> usize {
    let mut open = 1usize;
    for (i, line) in lines.iter().enumerate() {
        match split_line(line).0 {
            "{" => open += 1,
            "}" => {
                open -= 1;
                if open == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    lines.len()
}
