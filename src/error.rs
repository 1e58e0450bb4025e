//! Typed errors raised by the core pipeline.
//!
//! Application-level failures (unreadable files, bad config) travel as
//! `anyhow::Error`; these are the conditions the pipeline itself detects.

use thiserror::Error;

/// Errors detected while ingesting or reconciling observation tables.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// A required column is absent from a source table.
    #[error("column '{column}' not found in table '{table}'")]
    MissingColumn { table: String, column: String },

    /// More than one row for the same (area, year) under the `error` policy.
    #[error("duplicate observation in table '{table}' for {area} / {year}")]
    DuplicateObservation {
        table: String,
        area: String,
        year: i32,
    },

    /// Life expectancy and population maps disagree under the `strict` policy.
    #[error("{count} observation(s) are not aligned between life expectancy and population data")]
    Misaligned { count: usize },

    /// The configured year range is empty.
    #[error("invalid year range {start}-{end}: start must not be after end")]
    InvalidYearRange { start: i32, end: i32 },

    /// The configured area registry is unusable.
    #[error("invalid area registry: {0}")]
    InvalidRegistry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PipelineError::MissingColumn {
            table: "life_both".to_string(),
            column: "Value".to_string(),
        };
        assert_eq!(err.to_string(), "column 'Value' not found in table 'life_both'");

        let err = PipelineError::DuplicateObservation {
            table: "pop_male".to_string(),
            area: "World".to_string(),
            year: 2020,
        };
        assert!(err.to_string().contains("World / 2020"));
    }
}
