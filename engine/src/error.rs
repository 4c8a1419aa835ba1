//! Error types for the Shelf engine.

use crate::validate::FieldIssue;
use crate::BookId;
use thiserror::Error;

/// All possible errors from the Shelf engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("validation failed: {}", format_issues(.0))]
    Validation(Vec<FieldIssue>),

    // Mutation errors
    #[error("a mutation is already in flight for book {0}")]
    MutationInFlight(BookId),

    #[error("unknown pending mutation ticket: {0}")]
    UnknownTicket(u64),

    #[error("could not allocate a unique id after {0} attempts")]
    IdExhausted(usize),

    #[error("{0} mutation(s) still in flight")]
    Busy(usize),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::MutationInFlight(BookId::from("abc"));
        assert_eq!(err.to_string(), "a mutation is already in flight for book abc");

        let err = Error::MutationInFlight(BookId::Num(7));
        assert_eq!(err.to_string(), "a mutation is already in flight for book 7");

        let err = Error::Validation(vec![
            FieldIssue::new("title", "must be at least 3 characters"),
            FieldIssue::new("author", "is required"),
        ]);
        assert_eq!(
            err.to_string(),
            "validation failed: title must be at least 3 characters; author is required"
        );
    }
}
