//! # survey-core — Domain Types and Analysis Engine
//!
//! The leaf crate of the survey admin backend. It defines the question
//! schema, survey and response records, the package catalog and user
//! spending summaries, and the response analysis engine that turns raw
//! answer documents into dashboard-ready summaries.
//!
//! ## Key Design Principles
//!
//! 1. **The schema is authoritative.** Answers are only interpreted through
//!    the question that owns them. Answers for unknown question ids are
//!    dropped, never guessed at.
//!
//! 2. **Typed at the boundary.** Raw answers are untyped JSON values. They are
//!    coerced into [`analysis::TypedAnswers`] at the single point where the
//!    question type is known, and stay typed from there on.
//!
//! 3. **Pure computation.** Nothing in this crate performs I/O or holds
//!    shared state. [`analysis::compute_analysis`] is a deterministic
//!    function of its inputs: the same survey and responses always
//!    serialize to the same bytes.
//!
//! 4. **Storage timestamps are opaque.** `submitted_at`, `created_at` and
//!    friends are written by the storage layer; no computation here reads
//!    them.
//!
//! ## Crate Policy
//!
//! - No dependencies on other workspace crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod analysis;
pub mod catalog;
pub mod error;
pub mod question;
pub mod survey;
pub mod user;

pub use analysis::{compute_analysis, AnalysisOutcome, AnalysisResult, SurveyAnalysis};
pub use catalog::{Package, PackageKpi};
pub use error::{SchemaError, SurveyError};
pub use question::{Question, QuestionOptions, QuestionType};
pub use survey::{PublicSurvey, Survey, SurveyResponse, SurveyStatus, Template};
pub use user::{Transaction, TransactionStatus, User, UserSummary};
