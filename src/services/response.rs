use serde_json::Value;

use crate::db::types::DifficultyLevel;
use crate::services::error::PredictionError;

const SNIPPET_LIMIT: usize = 500;

/// One predicted question after validation and coercion of the raw model
/// output. The generative model is untrusted: every field here went through
/// an explicit validating constructor.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatedQuestion {
    pub(crate) text: String,
    pub(crate) probability: f64,
    pub(crate) difficulty: DifficultyLevel,
    pub(crate) marks: i32,
    pub(crate) module: Option<String>,
    pub(crate) topic: Option<String>,
    pub(crate) reasoning: Vec<String>,
}

/// Reduce a free-text model response to validated predicted questions.
///
/// Repair steps, each applied only when the previous one did not yield a
/// parseable payload: strip a fenced code block, then locate the first
/// balanced `{...}` or `[...]` span by bracket matching. A response that
/// still fails to parse is an `UnparsableResponse` carrying a diagnostic
/// snippet; it is never silently turned into an empty result. Validation is
/// strict-or-nothing: one malformed entry rejects the whole batch, because a
/// partially-contract-violating response cannot be trusted piecemeal.
pub(crate) fn parse_predictions(raw: &str) -> Result<Vec<ValidatedQuestion>, PredictionError> {
    let stripped = strip_code_fence(raw.trim());

    let candidate = if stripped.starts_with('{') || stripped.starts_with('[') {
        stripped
    } else {
        balanced_json_span(stripped).unwrap_or(stripped)
    };

    let parsed: Value = match serde_json::from_str(candidate) {
        Ok(value) => value,
        Err(_) => {
            let span = balanced_json_span(stripped).ok_or_else(|| {
                PredictionError::UnparsableResponse { reason: snippet(stripped) }
            })?;
            serde_json::from_str(span)
                .map_err(|_| PredictionError::UnparsableResponse { reason: snippet(span) })?
        }
    };

    let items = match &parsed {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("questions").or_else(|| map.get("predictions"))
            {
                items.as_slice()
            } else if map.contains_key("text") {
                std::slice::from_ref(&parsed)
            } else {
                return Err(PredictionError::UnparsableResponse {
                    reason: format!("expected an array of questions, got: {}", snippet(candidate)),
                });
            }
        }
        _ => {
            return Err(PredictionError::UnparsableResponse {
                reason: format!("expected an array of questions, got: {}", snippet(candidate)),
            })
        }
    };

    let mut questions = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let question =
            validate_question(item).map_err(|reason| PredictionError::UnparsableResponse {
                reason: format!("question {index} violated the output contract: {reason}"),
            })?;
        questions.push(question);
    }

    Ok(questions)
}

/// Arithmetic mean of the validated probabilities; 0.0 for an empty list,
/// which is a degenerate-but-valid prediction, not an error.
pub(crate) fn mean_confidence(questions: &[ValidatedQuestion]) -> f64 {
    if questions.is_empty() {
        return 0.0;
    }

    let total: f64 = questions.iter().map(|question| question.probability).sum();
    total / questions.len() as f64
}

fn validate_question(value: &Value) -> Result<ValidatedQuestion, String> {
    let text = value
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .ok_or("missing or empty text")?
        .to_string();

    let probability = value
        .get("probability")
        .and_then(coerce_f64)
        .ok_or("probability is not a finite number")?
        .clamp(0.0, 1.0);

    let difficulty = match value.get("difficulty").and_then(Value::as_str) {
        Some(raw) => match raw.trim().to_ascii_uppercase().as_str() {
            "EASY" => DifficultyLevel::Easy,
            "HARD" => DifficultyLevel::Hard,
            // The prompt names exactly three values; anything else is noise.
            _ => DifficultyLevel::Medium,
        },
        None => DifficultyLevel::Medium,
    };

    let marks = value.get("marks").and_then(coerce_i64).map_or(0, |marks| marks.max(0)) as i32;

    let module = optional_label(value.get("module"));
    let topic = optional_label(value.get("topic"));

    let reasoning = match value.get("reasoning") {
        Some(Value::Array(items)) => items.iter().map(reasoning_entry).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![reasoning_entry(other)],
    };

    Ok(ValidatedQuestion { text, probability, difficulty, marks, module, topic, reasoning })
}

fn reasoning_entry(value: &Value) -> String {
    match value.as_str() {
        Some(text) => text.to_string(),
        None => value.to_string(),
    }
}

fn optional_label(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(ToString::to_string)
}

fn coerce_f64(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(raw) => raw.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}

fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => {
            number.as_i64().or_else(|| number.as_f64().map(|float| float.round() as i64))
        }
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn snippet(text: &str) -> String {
    if text.chars().count() <= SNIPPET_LIMIT {
        return text.to_string();
    }

    let mut capped: String = text.chars().take(SNIPPET_LIMIT).collect();
    capped.push_str("...");
    capped
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };

    // Drop the info string ("json") up to the first newline.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.trim().strip_suffix("```").map_or_else(|| body.trim(), str::trim_end)
}

/// First balanced `{...}` or `[...]` span, honoring JSON string literals and
/// escapes. Bracket matching rather than a greedy regex, so text containing
/// several JSON fragments yields only the first complete one.
fn balanced_json_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire_question(text: &str, probability: f64) -> Value {
        json!({
            "id": "q1",
            "text": text,
            "probability": probability,
            "module": "Thermodynamics",
            "topic": "Entropy",
            "difficulty": "HARD",
            "marks": 10,
            "reasoning": ["asked twice before", "high freshness"]
        })
    }

    #[test]
    fn parses_fenced_response_and_clamps_probability() {
        let raw = format!(
            "Sure! Here you go:\n```json\n{}\n```",
            json!([wire_question("Derive the entropy change of an ideal gas.", 1.4)])
        );

        let questions = parse_predictions(&raw).expect("fenced response");

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].probability, 1.0);
        assert_eq!(questions[0].difficulty, DifficultyLevel::Hard);
        assert_eq!(questions[0].marks, 10);
        assert_eq!(questions[0].reasoning.len(), 2);
    }

    #[test]
    fn parses_bare_fenced_block_without_prose() {
        let raw = format!("```json\n{}\n```", json!([wire_question("State Hess's law.", 0.8)]));
        let questions = parse_predictions(&raw).expect("bare fence");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "State Hess's law.");
    }

    #[test]
    fn non_json_input_is_an_error_not_an_empty_list() {
        let err = parse_predictions("not json at all").expect_err("unparsable");
        match err {
            PredictionError::UnparsableResponse { reason } => {
                assert!(reason.contains("not json at all"));
            }
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
    }

    #[test]
    fn diagnostic_snippet_is_capped_at_500_chars() {
        let noise = "x".repeat(2000);
        let err = parse_predictions(&noise).expect_err("unparsable");
        match err {
            PredictionError::UnparsableResponse { reason } => {
                assert!(reason.chars().count() <= SNIPPET_LIMIT + 3);
            }
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
    }

    #[test]
    fn bracket_matching_takes_only_the_first_balanced_span() {
        let raw = format!(
            "First: {} and then junk {{\"text\": 1}}",
            json!([wire_question("Define enthalpy.", 0.5)])
        );

        let questions = parse_predictions(&raw).expect("first span");
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].text, "Define enthalpy.");
    }

    #[test]
    fn one_malformed_entry_rejects_the_whole_batch() {
        let raw = json!([
            wire_question("Good question?", 0.9),
            {"probability": 0.5, "difficulty": "EASY"}
        ])
        .to_string();

        let err = parse_predictions(&raw).expect_err("strict-or-nothing");
        match err {
            PredictionError::UnparsableResponse { reason } => {
                assert!(reason.contains("question 1"), "{reason}");
            }
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
    }

    #[test]
    fn coercions_apply_defaults_for_loose_fields() {
        let raw = json!([{
            "text": "Sketch a Carnot cycle.",
            "probability": "0.65",
            "difficulty": "EXTREME",
            "marks": "oops",
            "reasoning": "single justification"
        }])
        .to_string();

        let questions = parse_predictions(&raw).expect("coerced");

        assert_eq!(questions[0].probability, 0.65);
        assert_eq!(questions[0].difficulty, DifficultyLevel::Medium);
        assert_eq!(questions[0].marks, 0);
        assert_eq!(questions[0].reasoning, vec!["single justification".to_string()]);
        assert_eq!(questions[0].module, None);
    }

    #[test]
    fn wrapped_questions_object_is_accepted() {
        let raw = json!({"questions": [wire_question("Define entropy.", 0.7)]}).to_string();
        let questions = parse_predictions(&raw).expect("wrapped object");
        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn empty_array_is_valid_with_zero_confidence() {
        let questions = parse_predictions("[]").expect("empty array");
        assert!(questions.is_empty());
        assert_eq!(mean_confidence(&questions), 0.0);
    }

    #[test]
    fn round_trip_through_the_wire_shape_is_stable() {
        let wire = json!([
            wire_question("Q1", 0.9),
            wire_question("Q2", 0.5),
            wire_question("Q3", 0.7)
        ])
        .to_string();

        let first = parse_predictions(&wire).expect("first parse");

        // Re-serialize in the exact wire shape and parse again: coercion and
        // clamping are idempotent.
        let reserialized = json!(first
            .iter()
            .map(|question| {
                json!({
                    "id": "q",
                    "text": question.text,
                    "probability": question.probability,
                    "module": question.module,
                    "topic": question.topic,
                    "difficulty": question.difficulty.as_str(),
                    "marks": question.marks,
                    "reasoning": question.reasoning
                })
            })
            .collect::<Vec<_>>())
        .to_string();
        let second = parse_predictions(&reserialized).expect("second parse");

        assert_eq!(first, second);
    }

    #[test]
    fn mean_confidence_is_the_exact_mean() {
        let questions = parse_predictions(
            &json!([
                wire_question("Q1", 0.9),
                wire_question("Q2", 0.5),
                wire_question("Q3", 0.7)
            ])
            .to_string(),
        )
        .expect("three questions");

        assert!((mean_confidence(&questions) - 0.7).abs() < 1e-12);
    }
}
