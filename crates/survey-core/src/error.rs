//! # Error Types
//!
//! Validation failures raised while authoring surveys and templates. The
//! analysis engine itself has no error path: unknown answer keys, missing
//! answers and non-numeric scale values are tolerated, and an empty
//! response set is a defined result, not an error.

use thiserror::Error;

/// A question violated one of the schema invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Every question needs non-blank text.
    #[error("question {index} must have text")]
    MissingText {
        /// Zero-based position of the question in the schema.
        index: usize,
    },

    /// Choice-type questions need at least one non-blank choice.
    #[error("question {index} must have at least one non-blank choice")]
    NoChoices {
        /// Zero-based position of the question in the schema.
        index: usize,
    },

    /// Grid questions need rows and columns.
    #[error("grid question {index} must have at least one row and one column")]
    EmptyGrid {
        /// Zero-based position of the question in the schema.
        index: usize,
    },

    /// Scale questions need both bounds with `min < max`.
    #[error("scale question {index} needs min < max (got min={min:?}, max={max:?})")]
    InvalidScaleBounds {
        index: usize,
        min: Option<f64>,
        max: Option<f64>,
    },

    /// Two questions in one survey share an id.
    #[error("duplicate question id: {0}")]
    DuplicateId(String),
}

/// Validation failure for a survey, template, package or user record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurveyError {
    /// The question schema is invalid.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A required field was missing or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A field was present but out of range.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },
}
