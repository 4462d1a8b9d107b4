//! # Subjects and Subscription Filters
//!
//! Subjects are non-empty, dot-separated tokens without whitespace.
//! Subscriptions may end in a `>` token to match every subject below a prefix.

use crate::error::BusError;

/// Filter deciding which subjects a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubjectFilter {
    /// Exactly this subject.
    Exact(String),
    /// Every subject starting with this prefix (including the trailing dot).
    /// An empty prefix matches all subjects.
    Prefix(String),
}

impl SubjectFilter {
    /// Filter for a single subject.
    #[must_use]
    pub fn exact(subject: impl Into<String>) -> Self {
        Self::Exact(subject.into())
    }

    /// Parse a subscription pattern (`a.b.c` or `a.b.>` or `>`).
    ///
    /// # Errors
    ///
    /// `BusError::InvalidSubject` for empty tokens, whitespace, or a `>`
    /// anywhere but the last token.
    pub fn parse(pattern: &str) -> Result<Self, BusError> {
        if pattern == ">" {
            return Ok(Self::Prefix(String::new()));
        }
        if let Some(stem) = pattern.strip_suffix(".>") {
            validate_subject(stem)?;
            return Ok(Self::Prefix(format!("{stem}.")));
        }
        validate_subject(pattern)?;
        Ok(Self::Exact(pattern.to_string()))
    }

    /// Check if a subject matches this filter.
    #[must_use]
    pub fn matches(&self, subject: &str) -> bool {
        match self {
            Self::Exact(s) => s == subject,
            Self::Prefix(p) => subject.starts_with(p.as_str()) && subject.len() > p.len(),
        }
    }
}

impl std::fmt::Display for SubjectFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s}"),
            Self::Prefix(p) if p.is_empty() => write!(f, ">"),
            Self::Prefix(p) => write!(f, "{p}>"),
        }
    }
}

/// Validate a concrete subject (no wildcards).
///
/// # Errors
///
/// `BusError::InvalidSubject` if the subject is empty, has an empty token,
/// contains whitespace, or contains a wildcard token.
pub fn validate_subject(subject: &str) -> Result<(), BusError> {
    if subject.is_empty() {
        return Err(BusError::InvalidSubject("empty subject".into()));
    }
    if subject.chars().any(char::is_whitespace) {
        return Err(BusError::InvalidSubject(format!("'{subject}' contains whitespace")));
    }
    for token in subject.split('.') {
        if token.is_empty() {
            return Err(BusError::InvalidSubject(format!("'{subject}' has an empty token")));
        }
        if token == ">" || token == "*" {
            return Err(BusError::InvalidSubject(format!("'{subject}' contains a wildcard")));
        }
    }
    Ok(())
}
