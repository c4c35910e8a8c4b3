//! # Result Composition
//!
//! Merges per-question aggregates with the survey record into the payload
//! served to the dashboard, and adds the raw export used for client-side
//! cross-tabulation.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::aggregate::{aggregate, ChartSeries, DescriptiveStats, QuestionAggregate, TypedAnswers};
use super::group::group_answers;
use crate::question::{Question, QuestionType};
use crate::survey::{Survey, SurveyResponse, SurveyStatus};

/// Message returned in place of an analysis when nobody has responded yet.
pub const NO_RESPONSES_MESSAGE: &str = "No responses have been recorded for this survey yet.";

/// Output of [`compute_analysis`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    /// The survey has no responses; nothing was aggregated.
    Empty(NoAnalysis),
    /// Full analysis of at least one response.
    Ready(Box<SurveyAnalysis>),
}

impl AnalysisOutcome {
    /// The analysis, if there was anything to analyse.
    pub fn analysis(&self) -> Option<&SurveyAnalysis> {
        match self {
            Self::Empty(_) => None,
            Self::Ready(analysis) => Some(analysis),
        }
    }
}

/// Sentinel body: `{"message": "...", "analysis": null}`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct NoAnalysis {
    pub message: String,
    /// Always `null`.
    #[schema(value_type = Option<Object>)]
    pub analysis: Option<()>,
}

impl Default for NoAnalysis {
    fn default() -> Self {
        Self {
            message: NO_RESPONSES_MESSAGE.to_string(),
            analysis: None,
        }
    }
}

/// Per-question aggregates of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Frequency charts keyed by question id.
    pub question_results: BTreeMap<String, ChartSeries>,
    /// Free-text samples keyed by question id.
    #[schema(value_type = Object)]
    pub open_ended_samples: BTreeMap<String, Vec<Value>>,
    /// Scale statistics in schema order.
    pub descriptive_stats: Vec<DescriptiveStats>,
}

impl AnalysisResult {
    fn record(&mut self, question_id: &str, aggregate: QuestionAggregate) {
        match aggregate {
            QuestionAggregate::Chart(chart) => {
                self.question_results.insert(question_id.to_string(), chart);
            }
            QuestionAggregate::Samples(samples) => {
                self.open_ended_samples
                    .insert(question_id.to_string(), samples);
            }
            QuestionAggregate::Statistics(stats) => self.descriptive_stats.push(stats),
        }
    }
}

/// Headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStats {
    pub total_respondents: usize,
    /// Percentage of the target reached, rounded, not clamped.
    pub completion_rate: u64,
}

/// A question as shown on the dashboard, with its aggregate if it has one.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuestionView {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<ChartSeries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Vec<Object>>)]
    pub samples: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<DescriptiveStats>,
}

impl QuestionView {
    fn new(question: &Question, aggregate: Option<&QuestionAggregate>) -> Self {
        let mut view = Self {
            id: question.id.clone(),
            text: question.text.clone(),
            kind: question.kind,
            results: None,
            samples: None,
            statistics: None,
        };
        match aggregate {
            Some(QuestionAggregate::Chart(chart)) => view.results = Some(chart.clone()),
            Some(QuestionAggregate::Samples(samples)) => view.samples = Some(samples.clone()),
            Some(QuestionAggregate::Statistics(stats)) => view.statistics = Some(stats.clone()),
            None => {}
        }
        view
    }
}

/// One response in the raw export, labelled `r1`, `r2`, ... in input order.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub resp_id: String,
    #[schema(value_type = Object)]
    pub answers: BTreeMap<String, Value>,
}

/// Question id and text, for building cross-tabulations client side.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct QuestionRef {
    pub id: String,
    pub text: String,
}

/// The analysis block: aggregates plus the material for ad-hoc analysis.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSection {
    /// Every response, unfiltered.
    pub structured_raw_data: Vec<RawRecord>,
    pub categorical_questions: Vec<Question>,
    pub all_questions_for_analysis: Vec<QuestionRef>,
    pub question_results: BTreeMap<String, ChartSeries>,
    #[schema(value_type = Object)]
    pub open_ended_samples: BTreeMap<String, Vec<Value>>,
    pub descriptive_stats: Vec<DescriptiveStats>,
}

/// Answers that did not make it into any aggregate.
///
/// Not part of the payload; the request layer logs it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisDiagnostics {
    /// Answers keyed by a question id the schema does not contain.
    pub unmatched_answers: usize,
    /// Scale answers that were not numbers.
    pub excluded_scale_answers: usize,
}

/// The full dashboard payload for a survey with responses.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SurveyAnalysis {
    pub id: String,
    pub title: String,
    pub status: SurveyStatus,
    pub stats: SurveyStats,
    pub questions: Vec<QuestionView>,
    pub analysis: AnalysisSection,
    #[serde(skip)]
    pub diagnostics: AnalysisDiagnostics,
}

/// `round(100 × respondents / target)`, or 100 when there is no target.
///
/// Halves round up. The rate is not clamped: exceeding the target yields
/// more than 100.
pub fn completion_rate(respondents: usize, target: u64) -> u64 {
    if target == 0 {
        return 100;
    }
    let respondents = respondents as u128;
    let target = u128::from(target);
    let rate = (200 * respondents + target) / (2 * target);
    u64::try_from(rate).unwrap_or(u64::MAX)
}

/// Analyse `responses` against `survey`'s question schema.
///
/// With no responses the sentinel [`AnalysisOutcome::Empty`] is returned
/// and no aggregation runs. The function is deterministic: identical inputs
/// serialize to identical bytes.
pub fn compute_analysis(survey: &Survey, responses: &[SurveyResponse]) -> AnalysisOutcome {
    if responses.is_empty() {
        return AnalysisOutcome::Empty(NoAnalysis::default());
    }

    let groups = group_answers(&survey.questions, responses);
    let mut diagnostics = AnalysisDiagnostics {
        unmatched_answers: groups.unmatched(),
        excluded_scale_answers: 0,
    };
    let mut result = AnalysisResult::default();
    let mut views = Vec::with_capacity(survey.questions.len());

    for question in &survey.questions {
        let typed = TypedAnswers::coerce(question.kind, groups.answers(&question.id));
        diagnostics.excluded_scale_answers += typed.excluded();

        let aggregate = aggregate(question, &typed);
        views.push(QuestionView::new(question, aggregate.as_ref()));
        if let Some(aggregate) = aggregate {
            result.record(&question.id, aggregate);
        }
    }

    let structured_raw_data = responses
        .iter()
        .enumerate()
        .map(|(i, r)| RawRecord {
            resp_id: format!("r{}", i + 1),
            answers: r.answers.clone(),
        })
        .collect();

    AnalysisOutcome::Ready(Box::new(SurveyAnalysis {
        id: survey.id.clone(),
        title: survey.title.clone(),
        status: survey.status,
        stats: SurveyStats {
            total_respondents: responses.len(),
            completion_rate: completion_rate(responses.len(), survey.target),
        },
        questions: views,
        analysis: AnalysisSection {
            structured_raw_data,
            categorical_questions: survey
                .questions
                .iter()
                .filter(|q| q.kind.is_categorical())
                .cloned()
                .collect(),
            all_questions_for_analysis: survey
                .questions
                .iter()
                .map(|q| QuestionRef {
                    id: q.id.clone(),
                    text: q.text.clone(),
                })
                .collect(),
            question_results: result.question_results,
            open_ended_samples: result.open_ended_samples,
            descriptive_stats: result.descriptive_stats,
        },
        diagnostics,
    }))
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The rate equals the float formula rounded half up.
        #[test]
        fn completion_rate_matches_rounded_percentage(
            respondents in 0usize..10_000,
            target in 1u64..5_000,
        ) {
            let expected = ((respondents as f64 / target as f64) * 100.0 + 0.5).floor() as u64;
            let actual = completion_rate(respondents, target);
            // Float rounding can land one off on exact halves; integers do not.
            prop_assert!(actual.abs_diff(expected) <= 1);
            prop_assert!(actual * target * 2 + target >= 200 * respondents as u64);
        }
    }
}
