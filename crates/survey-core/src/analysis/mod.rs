//! # Response Analysis Engine
//!
//! Turns a survey's raw response documents into the summaries shown on the
//! researcher dashboard.
//!
//! ## Pipeline
//!
//! ```text
//! responses ──► group ──► coerce (per question) ──► aggregate ──► compose
//! ```
//!
//! 1. [`group::group_answers`] partitions answer maps by question id,
//!    keeping response order and dropping ids the schema does not know.
//! 2. [`aggregate::TypedAnswers::coerce`] turns one question's raw values
//!    into the typed union for its declared type.
//! 3. [`aggregate::aggregate`] applies the per-type algorithm: frequency
//!    counting for single-choice questions, sampling for free text,
//!    descriptive statistics for scales. Checkbox and grid questions are
//!    deliberately left unaggregated.
//! 4. [`compose::compute_analysis`] merges everything with survey metadata
//!    and adds the raw export used for client-side cross-tabulation.
//!
//! Every stage is pure. No stage reads storage timestamps.

pub mod aggregate;
pub mod compose;
pub mod group;

pub use aggregate::{
    aggregate, ChartKind, ChartSeries, DescriptiveStats, QuestionAggregate, TypedAnswers,
    OPEN_ENDED_SAMPLE_SIZE,
};
pub use compose::{
    completion_rate, compute_analysis, AnalysisDiagnostics, AnalysisOutcome, AnalysisResult,
    AnalysisSection, NoAnalysis, QuestionRef, QuestionView, RawRecord, SurveyAnalysis,
    SurveyStats, NO_RESPONSES_MESSAGE,
};
pub use group::{group_answers, AnswerGroups};
