//! Validation policy.
//!
//! Records are checked before a mutation is allowed to touch the catalog.
//! The rules are configuration rather than code: the minimum title length,
//! whether an author is required, and the accepted year range all vary
//! between deployments.

use crate::{error::Result, BookRecord, Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldIssue {
    /// Field name
    pub field: String,
    /// Human-readable reason
    pub reason: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.reason)
    }
}

/// Checks a record before it enters the catalog.
pub trait Validator {
    /// Return every issue with the record, or `Ok(())` if it is acceptable.
    fn validate(&self, record: &BookRecord) -> Result<()>;
}

/// Configurable field rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPolicy {
    /// Minimum number of characters in the trimmed title
    pub title_min_len: usize,
    /// Whether the author must be non-empty
    pub author_required: bool,
    /// Lowest accepted year (inclusive)
    pub year_min: i32,
    /// Highest accepted year (inclusive)
    pub year_max: i32,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            title_min_len: 3,
            author_required: true,
            year_min: 1000,
            year_max: 2026,
        }
    }
}

impl ValidationPolicy {
    /// A policy that accepts an empty author.
    pub fn lenient_author(mut self) -> Self {
        self.author_required = false;
        self
    }

    /// Builder-style year range.
    pub fn with_year_range(mut self, min: i32, max: i32) -> Self {
        self.year_min = min;
        self.year_max = max;
        self
    }

    /// Collect every issue without failing fast.
    pub fn issues(&self, record: &BookRecord) -> Vec<FieldIssue> {
        let mut issues = Vec::new();

        if record.title.trim().chars().count() < self.title_min_len {
            issues.push(FieldIssue::new(
                "title",
                format!("must be at least {} characters", self.title_min_len),
            ));
        }

        if self.author_required && record.author.trim().is_empty() {
            issues.push(FieldIssue::new("author", "is required"));
        }

        if let Some(year) = record.year {
            if year < self.year_min || year > self.year_max {
                issues.push(FieldIssue::new(
                    "year",
                    format!("must be between {} and {}", self.year_min, self.year_max),
                ));
            }
        }

        issues
    }
}

impl Validator for ValidationPolicy {
    fn validate(&self, record: &BookRecord) -> Result<()> {
        let issues = self.issues(record);
        if issues.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(issues))
        }
    }
}
