//! # Surveys, Templates and Responses
//!
//! Record types for survey authoring and respondent submissions, plus the
//! template instantiation rules used when a survey is created from a
//! template.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::SurveyError;
use crate::question::{validate_schema, Question};

/// Placeholder replaced by the survey variable when a template is used.
pub const VARIABLE_PLACEHOLDER: &str = "{variable}";

/// Survey activation status. Only `Active` surveys accept responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum SurveyStatus {
    #[default]
    Draft,
    Active,
    Closed,
}

impl SurveyStatus {
    /// Return the wire name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Active => "Active",
            Self::Closed => "Closed",
        }
    }

    /// Whether respondents may view and answer the survey.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for SurveyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A survey owned by a researcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Research variable, substituted into template question texts.
    pub variable: String,
    /// Declared target respondent count. Zero means "no target".
    pub target: u64,
    pub questions: Vec<Question>,
    /// Template the questions were taken from, or empty.
    #[serde(default)]
    pub template_id: String,
    #[serde(default)]
    pub status: SurveyStatus,
    pub created_by: String,
    pub creation_date: DateTime<Utc>,
    /// Respondent counter, only ever changed by response submission.
    #[serde(default)]
    pub responses: u64,
    pub updated_at: DateTime<Utc>,
}

impl Survey {
    /// Check the authoring invariants of the survey.
    ///
    /// Every question must carry a non-blank, unique id by this point.
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.title.trim().is_empty() {
            return Err(SurveyError::MissingField("title"));
        }
        if self.variable.trim().is_empty() {
            return Err(SurveyError::MissingField("variable"));
        }
        if self.end_date < self.start_date {
            return Err(SurveyError::InvalidField {
                field: "endDate",
                reason: format!(
                    "{} is before startDate {}",
                    self.end_date, self.start_date
                ),
            });
        }
        if self.questions.iter().any(|q| q.id.trim().is_empty()) {
            return Err(SurveyError::MissingField("question id"));
        }
        validate_schema(&self.questions)?;
        Ok(())
    }

    /// The respondent-facing view of this survey.
    pub fn public_view(&self) -> PublicSurvey {
        PublicSurvey {
            id: self.id.clone(),
            title: self.title.clone(),
            questions: self.questions.clone(),
        }
    }
}

/// What a respondent sees: no target, counters or authoring metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PublicSurvey {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

/// A reusable question set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub questions: Vec<Question>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Template {
    /// Check the template's title and question schema.
    pub fn validate(&self) -> Result<(), SurveyError> {
        if self.title.trim().is_empty() {
            return Err(SurveyError::MissingField("title"));
        }
        validate_schema(&self.questions)?;
        Ok(())
    }
}

/// One respondent's submitted answers. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyResponse {
    pub id: String,
    pub survey_id: String,
    /// Raw answers keyed by question id. Shapes depend on the question type
    /// and are only interpreted by the analysis engine.
    #[schema(value_type = Object)]
    pub answers: BTreeMap<String, serde_json::Value>,
    /// Set by the store at write time.
    pub submitted_at: DateTime<Utc>,
}

/// Generate an id for every question whose id is blank.
pub fn assign_missing_ids(questions: &mut [Question]) {
    for question in questions.iter_mut().filter(|q| q.id.trim().is_empty()) {
        question.id = Uuid::new_v4().simple().to_string();
    }
}

/// Copy a template's questions into a new survey schema.
///
/// The first `{variable}` placeholder in each question text is replaced by
/// `variable`, and blank ids are generated.
pub fn instantiate_template(template: &Template, variable: &str) -> Vec<Question> {
    let mut questions: Vec<Question> = template
        .questions
        .iter()
        .map(|q| Question {
            text: q.text.replacen(VARIABLE_PLACEHOLDER, variable, 1),
            ..q.clone()
        })
        .collect();
    assign_missing_ids(&mut questions);
    questions
}
