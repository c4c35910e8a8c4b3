//! Answer grouping: raw response maps → per-question answer sequences.

use std::collections::HashMap;

use serde_json::Value;

use crate::question::Question;
use crate::survey::SurveyResponse;

/// Answers of every schema question, in response order.
///
/// Borrows from the schema and the responses; nothing is copied.
#[derive(Debug)]
pub struct AnswerGroups<'a> {
    by_question: HashMap<&'a str, Vec<&'a Value>>,
    unmatched: usize,
}

impl<'a> AnswerGroups<'a> {
    /// The answers given to `question_id`. Empty for unanswered or unknown ids.
    pub fn answers(&self, question_id: &str) -> &[&'a Value] {
        self.by_question
            .get(question_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of answers dropped because their question id is not in the schema.
    pub fn unmatched(&self) -> usize {
        self.unmatched
    }
}

/// Group the answers of `responses` by the question ids of `questions`.
pub fn group_answers<'a>(
    questions: &'a [Question],
    responses: &'a [SurveyResponse],
) -> AnswerGroups<'a> {
    let mut by_question: HashMap<&str, Vec<&Value>> = questions
        .iter()
        .map(|q| (q.id.as_str(), Vec::new()))
        .collect();
    let mut unmatched = 0;

    for response in responses {
        for (question_id, value) in &response.answers {
            match by_question.get_mut(question_id.as_str()) {
                Some(answers) => answers.push(value),
                None => unmatched += 1,
            }
        }
    }

    AnswerGroups {
        by_question,
        unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{QuestionOptions, QuestionType};
    use chrono::Utc;
    use serde_json::json;

    fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            text: format!("Question {id}"),
            kind: QuestionType::OpenEnded,
            options: QuestionOptions::default(),
        }
    }

    fn response(answers: serde_json::Value) -> SurveyResponse {
        SurveyResponse {
            id: "r".into(),
            survey_id: "s".into(),
            answers: serde_json::from_value(answers).unwrap(),
            submitted_at: Utc::now(),
        }
    }

    #[test]
    fn preserves_response_order() {
        let questions = [question("q1")];
        let responses = [
            response(json!({"q1": "first"})),
            response(json!({"q1": "second"})),
            response(json!({"q1": "third"})),
        ];
        let groups = group_answers(&questions, &responses);
        let answers: Vec<_> = groups.answers("q1").iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(answers, ["first", "second", "third"]);
    }

    #[test]
    fn unanswered_question_maps_to_empty() {
        let questions = [question("q1"), question("q2")];
        let responses = [response(json!({"q1": "only q1"}))];
        let groups = group_answers(&questions, &responses);
        assert!(groups.answers("q2").is_empty());
        assert_eq!(groups.answers("q1").len(), 1);
    }

    #[test]
    fn unknown_ids_are_dropped_and_counted() {
        let questions = [question("q1")];
        let responses = [
            response(json!({"q1": "a", "ghost": "boo"})),
            response(json!({"other": 1})),
        ];
        let groups = group_answers(&questions, &responses);
        assert!(groups.answers("ghost").is_empty());
        assert_eq!(groups.unmatched(), 2);
    }

    #[test]
    fn values_are_borrowed_unmodified() {
        let questions = [question("grid")];
        let raw = json!({"row1": ["a", "b"]});
        let responses = [response(json!({"grid": raw.clone()}))];
        let groups = group_answers(&questions, &responses);
        assert_eq!(groups.answers("grid"), [&raw]);
    }
}
