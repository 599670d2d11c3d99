//! Cross-reference identifiers (`REQ-F-001`, `ARCH-002`, `BL-010`).
//!
//! Identifiers are recognised purely by pattern: a kind prefix, a dash, an
//! optional upper-case category segment (`F-`, `NF-`) and a numeric suffix
//! that may be dotted (`1.2.3`).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static ANY_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(REQ|ARCH|BL)-(?:[A-Z]{1,4}-)?[0-9]+(?:\.[0-9]+)*\b").unwrap()
});

static EXACT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(REQ|ARCH|BL)-(?:[A-Z]{1,4}-)?[0-9]+(?:\.[0-9]+)*$").unwrap()
});

/// Which artifact family an identifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    /// Declared by the requirements document.
    Requirement,
    /// Declared by the architecture document.
    Architecture,
    /// Declared by the backlog.
    Backlog,
}

impl IdKind {
    /// The textual prefix, without the trailing dash.
    pub fn prefix(&self) -> &'static str {
        match self {
            IdKind::Requirement => "REQ",
            IdKind::Architecture => "ARCH",
            IdKind::Backlog => "BL",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "REQ" => Some(IdKind::Requirement),
            "ARCH" => Some(IdKind::Architecture),
            "BL" => Some(IdKind::Backlog),
            _ => None,
        }
    }
}

/// A validated identifier, ordered naturally (`REQ-2` sorts before `REQ-10`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Parse a complete token. Returns `None` unless the whole string is an
    /// identifier of the expected kind.
    pub fn parse(kind: IdKind, token: &str) -> Option<Self> {
        let token = token.trim();
        let caps = EXACT_ID.captures(token)?;
        if IdKind::from_prefix(&caps[1])? != kind {
            return None;
        }
        Some(Identifier(token.to_string()))
    }

    /// The kind encoded in the prefix.
    pub fn kind(&self) -> IdKind {
        let prefix = self.0.split('-').next().unwrap_or_default();
        // Construction guarantees a known prefix.
        IdKind::from_prefix(prefix).unwrap_or(IdKind::Requirement)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An identifier occurrence inside a text, with its byte span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub id: Identifier,
    pub start: usize,
    pub end: usize,
}

/// All occurrences of identifiers of `kind` in `text`, in textual order.
pub fn occurrences(kind: IdKind, text: &str) -> Vec<Occurrence> {
    ANY_ID
        .captures_iter(text)
        .filter(|caps| IdKind::from_prefix(&caps[1]) == Some(kind))
        .filter_map(|caps| {
            let m = caps.get(0)?;
            Some(Occurrence {
                id: Identifier(m.as_str().to_string()),
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

/// Distinct identifiers of `kind` found in `text`.
pub fn scan(kind: IdKind, text: &str) -> BTreeSet<Identifier> {
    occurrences(kind, text).into_iter().map(|o| o.id).collect()
}

/// Compare two strings treating runs of ASCII digits as numbers.
///
/// Ties between numerically equal runs (`01` vs `1`) fall back to plain
/// string order so the result stays a total order consistent with `Eq`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks { rest: a };
    let mut right = Chunks { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_chunks(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let x_digits = x.starts_with(|c: char| c.is_ascii_digit());
    let y_digits = y.starts_with(|c: char| c.is_ascii_digit());

    if x_digits && y_digits {
        let x = x.trim_start_matches('0');
        let y = y.trim_start_matches('0');
        x.len().cmp(&y.len()).then_with(|| x.cmp(y))
    } else {
        x.cmp(y)
    }
}

/// Splits a string into maximal runs of digits and non-digits.
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}
