//! Strict decode and shape validation of engine output.
//!
//! The engine's text is untrusted. It is decoded into a `serde_json::Value` and each
//! field is checked against its contract in a fixed order; the first violation aborts.
//! An `EvaluationResult` is only built once every field has passed.

use serde_json::{Map, Value};

use crate::evaluation::error::EvaluationError;
use crate::evaluation::models::EvaluationResult;
use crate::llm_client::strip_json_fences;

pub const FIT_SCORE: &str = "fitScore";
pub const ANALYSIS: &str = "analysis";
pub const STRENGTHS: &str = "strengths";
pub const MISSING: &str = "missing";

const MAX_FIT_SCORE: i64 = 100;

/// Decodes generated text into a JSON object.
///
/// If the first decode fails and `strip_fences` is set, a surrounding code fence is
/// removed (only when both the opening and closing markers are present) and the
/// decode is retried exactly once.
pub fn decode_generation(
    raw: &str,
    strip_fences: bool,
) -> Result<Map<String, Value>, EvaluationError> {
    let first_error = match decode_object(raw) {
        Ok(object) => return Ok(object),
        Err(e) => e,
    };

    if strip_fences {
        if let Some(inner) = strip_json_fences(raw) {
            return decode_object(inner).map_err(EvaluationError::MalformedResponse);
        }
    }

    Err(EvaluationError::MalformedResponse(first_error))
}

fn decode_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Checks `fitScore`, `analysis`, `strengths`, `missing` in that order.
/// Extra fields are ignored.
pub fn validate_shape(object: &Map<String, Value>) -> Result<EvaluationResult, EvaluationError> {
    let fit_score = validate_fit_score(object.get(FIT_SCORE))?;
    let analysis = validate_analysis(object.get(ANALYSIS))?;
    let strengths = validate_string_list(STRENGTHS, object.get(STRENGTHS))?;
    let missing = validate_string_list(MISSING, object.get(MISSING))?;

    Ok(EvaluationResult::new(fit_score, analysis, strengths, missing))
}

/// Integral JSON numbers in [0, 100]. `82.0` is accepted as 82; `82.5` and `"82"` are not.
fn validate_fit_score(value: Option<&Value>) -> Result<u8, EvaluationError> {
    let number = match value {
        Some(Value::Number(n)) => n,
        Some(other) => {
            return Err(EvaluationError::shape(
                FIT_SCORE,
                format!("expected an integer, got {}", type_name(other)),
            ))
        }
        None => return Err(EvaluationError::shape(FIT_SCORE, "field is missing")),
    };

    let score = match number.as_i64() {
        Some(i) => i,
        None => match number.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() <= i64::MAX as f64 => f as i64,
            _ => {
                return Err(EvaluationError::shape(
                    FIT_SCORE,
                    format!("{number} is not an integer"),
                ))
            }
        },
    };

    if !(0..=MAX_FIT_SCORE).contains(&score) {
        return Err(EvaluationError::shape(
            FIT_SCORE,
            format!("{score} is outside 0..={MAX_FIT_SCORE}"),
        ));
    }

    Ok(score as u8)
}

fn validate_analysis(value: Option<&Value>) -> Result<String, EvaluationError> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) => Err(EvaluationError::shape(ANALYSIS, "must not be blank")),
        Some(other) => Err(EvaluationError::shape(
            ANALYSIS,
            format!("expected a string, got {}", type_name(other)),
        )),
        None => Err(EvaluationError::shape(ANALYSIS, "field is missing")),
    }
}

/// An array of non-blank strings. An empty array is valid.
fn validate_string_list(
    field: &'static str,
    value: Option<&Value>,
) -> Result<Vec<String>, EvaluationError> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(EvaluationError::shape(
                field,
                format!("expected an array, got {}", type_name(other)),
            ))
        }
        None => return Err(EvaluationError::shape(field, "field is missing")),
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
            Value::String(_) => Err(EvaluationError::shape(field, format!("entry {i} is blank"))),
            other => Err(EvaluationError::shape(
                field,
                format!("entry {i} is {}, expected a string", type_name(other)),
            )),
        })
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
