//! # Question Schema
//!
//! A survey's questions: id, text, declared type and the type-specific
//! options. The declared [`QuestionType`] decides both how a respondent
//! answers and which aggregation the analysis engine applies.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::SchemaError;

/// Declared question type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Single choice rendered as radio buttons.
    MultipleChoice,
    /// Single choice rendered as a select box.
    Dropdown,
    /// Multiple choices. Not aggregated.
    Checkbox,
    /// Free text.
    #[serde(alias = "open-ended")]
    OpenEnded,
    /// Numeric rating between `min` and `max`.
    Scale,
    /// One choice per grid row. Not aggregated.
    GridChoice,
    /// Several choices per grid row. Not aggregated.
    GridCheckbox,
}

impl QuestionType {
    /// Return the wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MultipleChoice => "multiple_choice",
            Self::Dropdown => "dropdown",
            Self::Checkbox => "checkbox",
            Self::OpenEnded => "open_ended",
            Self::Scale => "scale",
            Self::GridChoice => "grid_choice",
            Self::GridCheckbox => "grid_checkbox",
        }
    }

    /// Return all question types.
    pub fn all() -> &'static [QuestionType] {
        &[
            Self::MultipleChoice,
            Self::Dropdown,
            Self::Checkbox,
            Self::OpenEnded,
            Self::Scale,
            Self::GridChoice,
            Self::GridCheckbox,
        ]
    }

    /// Types whose answers are counted into a frequency table.
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Dropdown)
    }

    /// Types that must declare a list of choices.
    pub fn has_choices(&self) -> bool {
        matches!(self, Self::MultipleChoice | Self::Dropdown | Self::Checkbox)
    }

    /// Types laid out as a rows × columns grid.
    pub fn is_grid(&self) -> bool {
        matches!(self, Self::GridChoice | Self::GridCheckbox)
    }
}

impl std::fmt::Display for QuestionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-specific options. Only the fields relevant to the question's type
/// are meaningful; the rest stay empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionOptions {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rows: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
}

/// One question of a survey or template.
///
/// `id` may be blank in templates; ids are assigned when a survey is built
/// (see [`crate::survey::assign_missing_ids`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub options: QuestionOptions,
}

impl Question {
    /// Check the per-type invariants of this question.
    ///
    /// `index` is only used to locate the question in error messages.
    pub fn validate(&self, index: usize) -> Result<(), SchemaError> {
        if self.text.trim().is_empty() {
            return Err(SchemaError::MissingText { index });
        }
        if self.kind.has_choices() && self.options.choices.iter().all(|c| c.trim().is_empty()) {
            return Err(SchemaError::NoChoices { index });
        }
        if self.kind.is_grid() && (self.options.rows.is_empty() || self.options.columns.is_empty())
        {
            return Err(SchemaError::EmptyGrid { index });
        }
        if self.kind == QuestionType::Scale {
            let (min, max) = (self.options.min, self.options.max);
            match (min, max) {
                (Some(lo), Some(hi)) if lo < hi => {}
                _ => return Err(SchemaError::InvalidScaleBounds { index, min, max }),
            }
        }
        Ok(())
    }
}

/// Validate every question of a schema.
///
/// Non-blank ids must be unique. Blank ids are allowed here; surveys fill
/// them in before validation, templates keep them blank.
pub fn validate_schema(questions: &[Question]) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for (index, question) in questions.iter().enumerate() {
        question.validate(index)?;
        if !question.id.is_empty() && !seen.insert(question.id.as_str()) {
            return Err(SchemaError::DuplicateId(question.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionType, options: QuestionOptions) -> Question {
        Question {
            id: "q1".into(),
            text: "How was it?".into(),
            kind,
            options,
        }
    }

    fn choices(items: &[&str]) -> QuestionOptions {
        QuestionOptions {
            choices: items.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn question_type_wire_names_round_trip() {
        for kind in QuestionType::all() {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let back: QuestionType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, *kind);
        }
    }

    #[test]
    fn hyphenated_open_ended_is_accepted() {
        let kind: QuestionType = serde_json::from_str("\"open-ended\"").unwrap();
        assert_eq!(kind, QuestionType::OpenEnded);
    }

    #[test]
    fn question_deserializes_with_type_key_and_missing_options() {
        let q: Question =
            serde_json::from_value(serde_json::json!({"id": "a", "text": "Why?", "type": "open_ended"}))
                .unwrap();
        assert_eq!(q.kind, QuestionType::OpenEnded);
        assert_eq!(q.options, QuestionOptions::default());
    }

    #[test]
    fn blank_text_rejected() {
        let mut q = question(QuestionType::OpenEnded, QuestionOptions::default());
        q.text = "   ".into();
        assert_eq!(q.validate(2), Err(SchemaError::MissingText { index: 2 }));
    }

    #[test]
    fn choice_types_need_a_non_blank_choice() {
        for kind in [
            QuestionType::MultipleChoice,
            QuestionType::Dropdown,
            QuestionType::Checkbox,
        ] {
            assert!(question(kind, choices(&[])).validate(0).is_err());
            assert!(question(kind, choices(&["", "  "])).validate(0).is_err());
            assert!(question(kind, choices(&["", "Yes"])).validate(0).is_ok());
        }
    }

    #[test]
    fn grid_types_need_rows_and_columns() {
        let only_rows = QuestionOptions {
            rows: vec!["Service".into()],
            ..Default::default()
        };
        assert_eq!(
            question(QuestionType::GridChoice, only_rows).validate(1),
            Err(SchemaError::EmptyGrid { index: 1 })
        );
        let full = QuestionOptions {
            rows: vec!["Service".into()],
            columns: vec!["Good".into(), "Bad".into()],
            ..Default::default()
        };
        assert!(question(QuestionType::GridCheckbox, full).validate(0).is_ok());
    }

    #[test]
    fn scale_bounds_must_be_ordered() {
        let bounds = |min, max| QuestionOptions {
            min,
            max,
            ..Default::default()
        };
        assert!(question(QuestionType::Scale, bounds(Some(1.0), Some(5.0))).validate(0).is_ok());
        assert!(question(QuestionType::Scale, bounds(Some(5.0), Some(5.0))).validate(0).is_err());
        assert!(question(QuestionType::Scale, bounds(Some(6.0), Some(5.0))).validate(0).is_err());
        assert!(question(QuestionType::Scale, bounds(None, Some(5.0))).validate(0).is_err());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let a = question(QuestionType::OpenEnded, QuestionOptions::default());
        let b = a.clone();
        assert_eq!(
            validate_schema(&[a, b]),
            Err(SchemaError::DuplicateId("q1".into()))
        );
    }

    #[test]
    fn blank_ids_do_not_collide() {
        let mut a = question(QuestionType::OpenEnded, QuestionOptions::default());
        a.id.clear();
        let b = a.clone();
        assert!(validate_schema(&[a, b]).is_ok());
    }
}
