//! # Per-Question Aggregation
//!
//! Raw answers are coerced into [`TypedAnswers`] once the question type is
//! known, then reduced by one of three algorithms:
//!
//! | Question type                  | Result                               |
//! |--------------------------------|--------------------------------------|
//! | `multiple_choice`, `dropdown`  | [`ChartSeries`] frequency table      |
//! | `open_ended`                   | first [`OPEN_ENDED_SAMPLE_SIZE`] answers |
//! | `scale`                        | [`DescriptiveStats`]                 |
//! | `checkbox`, grid types         | nothing (not aggregated)             |
//!
//! Aggregation never mutates its input and never fails: values that cannot
//! be coerced are excluded from the population and counted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::question::{Question, QuestionType};

/// Number of free-text answers kept per open-ended question.
pub const OPEN_ENDED_SAMPLE_SIZE: usize = 5;

/// One question's answers, typed by the question's declared type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedAnswers {
    /// Single-choice answers as labels.
    Categorical(Vec<String>),
    /// Free-text answers, kept as submitted.
    FreeText(Vec<Value>),
    /// Scale answers that coerced to finite numbers, plus how many did not.
    Numeric { values: Vec<f64>, excluded: usize },
    /// Checkbox and grid answers, passed through untouched in the raw export.
    Unaggregated,
}

impl TypedAnswers {
    /// Coerce raw answer values for a question of type `kind`.
    pub fn coerce(kind: QuestionType, raw: &[&Value]) -> Self {
        match kind {
            QuestionType::MultipleChoice | QuestionType::Dropdown => {
                Self::Categorical(raw.iter().map(|v| answer_label(v)).collect())
            }
            QuestionType::OpenEnded => Self::FreeText(raw.iter().map(|v| (*v).clone()).collect()),
            QuestionType::Scale => {
                let values: Vec<f64> = raw.iter().filter_map(|v| coerce_number(v)).collect();
                let excluded = raw.len() - values.len();
                Self::Numeric { values, excluded }
            }
            QuestionType::Checkbox | QuestionType::GridChoice | QuestionType::GridCheckbox => {
                Self::Unaggregated
            }
        }
    }

    /// Answers left out of the population during coercion.
    pub fn excluded(&self) -> usize {
        match self {
            Self::Numeric { excluded, .. } => *excluded,
            _ => 0,
        }
    }
}

/// Text form of an answer: strings verbatim, anything else as compact JSON.
pub fn answer_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric form of a scale answer.
///
/// JSON numbers and numeric strings (surrounding whitespace allowed)
/// coerce; blank strings, booleans, null, arrays, objects and non-finite
/// values do not.
///
/// Blank strings are excluded rather than read as `0`: an
/// untouched rating field is a non-answer, not a zero rating.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// Chart flavour requested from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    HorizontalBar,
}

/// Frequency table for a single-choice question, ready to chart.
///
/// `labels[i]` was chosen `counts[i]` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChartSeries {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub counts: Vec<u64>,
}

impl ChartSeries {
    /// Count distinct answers, most frequent first.
    ///
    /// Equal counts keep the order in which the labels were first seen.
    pub fn from_answers(answers: &[String]) -> Self {
        let mut tally: Vec<(&str, u64)> = Vec::new();
        let mut position: HashMap<&str, usize> = HashMap::new();
        for answer in answers {
            match position.get(answer.as_str()) {
                Some(&i) => tally[i].1 += 1,
                None => {
                    position.insert(answer.as_str(), tally.len());
                    tally.push((answer.as_str(), 1));
                }
            }
        }
        // `sort_by` is stable, which keeps first-encounter order on ties.
        tally.sort_by(|a, b| b.1.cmp(&a.1));

        let (labels, counts) = tally
            .into_iter()
            .map(|(label, count)| (label.to_string(), count))
            .unzip();
        Self {
            kind: ChartKind::HorizontalBar,
            labels,
            counts,
        }
    }
}

/// Descriptive statistics of a scale question. Values are unrounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveStats {
    pub question_id: String,
    /// Question text, used as the row label on the dashboard.
    pub question: String,
    /// Size of the numeric population.
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation (divisor = count).
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl DescriptiveStats {
    /// Describe `values`, or `None` when there is nothing to describe.
    pub fn describe(question: &Question, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 1 {
            sorted[mid]
        } else {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        };
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            question_id: question.id.clone(),
            question: question.text.clone(),
            count: sorted.len(),
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// The aggregate computed for one question.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionAggregate {
    Chart(ChartSeries),
    Samples(Vec<Value>),
    Statistics(DescriptiveStats),
}

/// Reduce one question's typed answers to its aggregate.
///
/// Returns `None` for unaggregated types and for scale questions without a
/// single numeric answer.
pub fn aggregate(question: &Question, answers: &TypedAnswers) -> Option<QuestionAggregate> {
    match answers {
        TypedAnswers::Categorical(labels) => {
            Some(QuestionAggregate::Chart(ChartSeries::from_answers(labels)))
        }
        TypedAnswers::FreeText(answers) => Some(QuestionAggregate::Samples(
            answers.iter().take(OPEN_ENDED_SAMPLE_SIZE).cloned().collect(),
        )),
        TypedAnswers::Numeric { values, .. } => {
            DescriptiveStats::describe(question, values).map(QuestionAggregate::Statistics)
        }
        TypedAnswers::Unaggregated => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::QuestionOptions;
    use serde_json::json;

    fn question(kind: QuestionType) -> Question {
        Question {
            id: "q".into(),
            text: "Rate us".into(),
            kind,
            options: QuestionOptions::default(),
        }
    }

    fn run(kind: QuestionType, raw: &[Value]) -> Option<QuestionAggregate> {
        let refs: Vec<&Value> = raw.iter().collect();
        aggregate(&question(kind), &TypedAnswers::coerce(kind, &refs))
    }

    fn strings(items: &[&str]) -> Vec<Value> {
        items.iter().map(|s| json!(s)).collect()
    }

    fn chart(kind: QuestionType, raw: &[Value]) -> ChartSeries {
        match run(kind, raw) {
            Some(QuestionAggregate::Chart(c)) => c,
            other => panic!("expected chart, got {other:?}"),
        }
    }

    fn stats(raw: &[Value]) -> DescriptiveStats {
        match run(QuestionType::Scale, raw) {
            Some(QuestionAggregate::Statistics(s)) => s,
            other => panic!("expected statistics, got {other:?}"),
        }
    }

    #[test]
    fn categorical_sorted_by_frequency() {
        let c = chart(
            QuestionType::MultipleChoice,
            &strings(&["A", "B", "A", "C", "B", "A"]),
        );
        assert_eq!(c.labels, ["A", "B", "C"]);
        assert_eq!(c.counts, [3, 2, 1]);
    }

    #[test]
    fn categorical_ties_keep_first_encounter_order() {
        let c = chart(QuestionType::Dropdown, &strings(&["X", "Y", "X", "Y"]));
        assert_eq!(c.labels, ["X", "Y"]);
        assert_eq!(c.counts, [2, 2]);

        let c = chart(QuestionType::Dropdown, &strings(&["Y", "Z", "X", "Z", "Y", "X"]));
        assert_eq!(c.labels, ["Y", "Z", "X"]);
    }

    #[test]
    fn categorical_without_answers_is_empty_not_missing() {
        let c = chart(QuestionType::MultipleChoice, &[]);
        assert!(c.labels.is_empty());
        assert!(c.counts.is_empty());
    }

    #[test]
    fn categorical_numbers_share_a_label_with_their_string_form() {
        let c = chart(QuestionType::MultipleChoice, &[json!(3), json!("3")]);
        assert_eq!(c.labels, ["3"]);
        assert_eq!(c.counts, [2]);
    }

    #[test]
    fn open_ended_keeps_first_five_verbatim() {
        let raw = strings(&["  one ", "two", "three", "four", "five", "six", "seven"]);
        match run(QuestionType::OpenEnded, &raw) {
            Some(QuestionAggregate::Samples(samples)) => {
                assert_eq!(samples, ["  one ", "two", "three", "four", "five"]);
            }
            other => panic!("expected samples, got {other:?}"),
        }
    }

    #[test]
    fn open_ended_with_fewer_answers_returns_all() {
        match run(QuestionType::OpenEnded, &strings(&["only"])) {
            Some(QuestionAggregate::Samples(samples)) => assert_eq!(samples, ["only"]),
            other => panic!("expected samples, got {other:?}"),
        }
    }

    #[test]
    fn open_ended_keeps_non_string_answers_as_submitted() {
        let raw = [json!(42), json!(["a", "b"]), json!("text")];
        match run(QuestionType::OpenEnded, &raw) {
            Some(QuestionAggregate::Samples(samples)) => {
                assert_eq!(samples, [json!(42), json!(["a", "b"]), json!("text")]);
            }
            other => panic!("expected samples, got {other:?}"),
        }
    }

    #[test]
    fn blank_scale_answers_are_not_zero() {
        let s = stats(&strings(&["5", "", " "]));
        assert_eq!(s.count, 1);
        assert_eq!(s.mean, 5.0);
    }

    #[test]
    fn scale_statistics_even_count() {
        let s = stats(&strings(&["1", "2", "3", "4"]));
        assert_eq!(s.count, 4);
        assert_eq!(s.mean, 2.5);
        assert_eq!(s.median, 2.5);
        assert!((s.std_dev - 1.25f64.sqrt()).abs() < 1e-12);
        assert!((s.std_dev - 1.1180).abs() < 1e-4);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
    }

    #[test]
    fn scale_statistics_odd_count_uses_middle_value() {
        let s = stats(&[json!(5), json!(1), json!(4)]);
        assert_eq!(s.median, 4.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
    }

    #[test]
    fn scale_excludes_non_numeric_answers() {
        let s = stats(&strings(&["1", "x", "3"]));
        assert_eq!(s.count, 2);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.median, 2.0);
    }

    #[test]
    fn scale_without_numeric_answers_has_no_statistics() {
        assert_eq!(run(QuestionType::Scale, &strings(&["x", "", "NaN"])), None);
        assert_eq!(run(QuestionType::Scale, &[]), None);
    }

    #[test]
    fn coercion_rules() {
        assert_eq!(coerce_number(&json!(" 4.5 ")), Some(4.5));
        assert_eq!(coerce_number(&json!(7)), Some(7.0));
        assert_eq!(coerce_number(&json!("")), None);
        assert_eq!(coerce_number(&json!("inf")), None);
        assert_eq!(coerce_number(&json!(true)), None);
        assert_eq!(coerce_number(&Value::Null), None);
        assert_eq!(coerce_number(&json!([1])), None);
    }

    #[test]
    fn excluded_count_reported_for_scale_only() {
        let raw = strings(&["1", "x", "y"]);
        let refs: Vec<&Value> = raw.iter().collect();
        assert_eq!(TypedAnswers::coerce(QuestionType::Scale, &refs).excluded(), 2);
        assert_eq!(TypedAnswers::coerce(QuestionType::OpenEnded, &refs).excluded(), 0);
    }

    #[test]
    fn checkbox_and_grid_types_are_not_aggregated() {
        let raw = [json!(["a", "b"]), json!({"row": "col"})];
        for kind in [
            QuestionType::Checkbox,
            QuestionType::GridChoice,
            QuestionType::GridCheckbox,
        ] {
            assert_eq!(run(kind, &raw), None);
        }
    }

    #[test]
    fn chart_serializes_with_type_tag() {
        let c = ChartSeries::from_answers(&["A".to_string()]);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "horizontal_bar");
        assert_eq!(json["labels"], json!(["A"]));
        assert_eq!(json["counts"], json!([1]));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::question::QuestionOptions;
    use proptest::prelude::*;

    fn scale_question() -> Question {
        Question {
            id: "q".into(),
            text: "Rate".into(),
            kind: QuestionType::Scale,
            options: QuestionOptions::default(),
        }
    }

    proptest! {
        /// Counts add up to the number of answers and never increase.
        #[test]
        fn frequency_counts_are_complete_and_sorted(
            answers in prop::collection::vec("[a-d]", 0..40)
        ) {
            let chart = ChartSeries::from_answers(&answers);
            prop_assert_eq!(chart.labels.len(), chart.counts.len());
            prop_assert_eq!(chart.counts.iter().sum::<u64>(), answers.len() as u64);
            prop_assert!(chart.counts.windows(2).all(|w| w[0] >= w[1]));
            let mut distinct = chart.labels.clone();
            distinct.sort();
            distinct.dedup();
            prop_assert_eq!(distinct.len(), chart.labels.len());
        }

        /// Among equal counts, labels appear in first-encounter order.
        #[test]
        fn frequency_ties_follow_first_encounter(
            answers in prop::collection::vec("[a-e]", 1..40)
        ) {
            let chart = ChartSeries::from_answers(&answers);
            let first_seen = |label: &str| answers.iter().position(|a| a == label);
            for i in 1..chart.labels.len() {
                if chart.counts[i - 1] == chart.counts[i] {
                    prop_assert!(first_seen(chart.labels[i - 1].as_str()) < first_seen(chart.labels[i].as_str()));
                }
            }
        }

        /// Summary statistics stay inside the observed range.
        #[test]
        fn statistics_are_bounded(values in prop::collection::vec(-1000i32..1000, 1..50)) {
            let values: Vec<f64> = values.into_iter().map(f64::from).collect();
            let stats = DescriptiveStats::describe(&scale_question(), &values).unwrap();
            prop_assert!(stats.min <= stats.median && stats.median <= stats.max);
            prop_assert!(stats.min <= stats.mean && stats.mean <= stats.max);
            prop_assert!(stats.std_dev >= 0.0);
            prop_assert!(stats.std_dev <= stats.max - stats.min);
            prop_assert_eq!(stats.count, values.len());
        }

        /// Sampling never reorders and never exceeds the sample size.
        #[test]
        fn samples_are_a_prefix(texts in prop::collection::vec(".{0,12}", 0..12)) {
            let typed = TypedAnswers::FreeText(texts.iter().cloned().map(Value::String).collect());
            let question = Question { kind: QuestionType::OpenEnded, ..scale_question() };
            match aggregate(&question, &typed) {
                Some(QuestionAggregate::Samples(samples)) => {
                    prop_assert!(samples.len() <= OPEN_ENDED_SAMPLE_SIZE);
                    prop_assert_eq!(&samples[..], &texts[..samples.len()]);
                }
                other => prop_assert!(false, "expected samples, got {:?}", other),
            }
        }
    }
}
