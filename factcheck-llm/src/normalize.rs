//! Turns free-form model output into a [`VerificationResult`].
//!
//! Models are told to answer with bare JSON but regularly wrap it in code
//! fences or add a sentence before or after. [`normalize`] recovers what it can
//! and never fails: when nothing usable is found it returns a
//! [`Normalized::Degraded`] result flagged with the cause.

use crate::verifier::VerificationResult;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Greedy: first `{` through last `}`.
static JSON_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\{.*\}").expect("static regex compiles")
});

const RAW_EXCERPT_CHARS: usize = 200;

pub const DEFAULT_CONFIDENCE: u8 = 50;
const DEFAULT_REASONING: &str = "No reasoning provided.";
const DEFAULT_SUGGESTIONS: &str = "No suggestions provided.";
const RETRY_SUGGESTION: &str = "Please try rephrasing your input or try again.";

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// A JSON object was found and mapped.
    Parsed(VerificationResult),
    /// Nothing usable; `result` holds the synthesized fallback.
    Degraded {
        result: VerificationResult,
        cause: String,
    },
}

impl Normalized {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Normalized::Degraded { .. })
    }

    pub fn into_result(self) -> VerificationResult {
        match self {
            Normalized::Parsed(result) | Normalized::Degraded { result, .. } => result,
        }
    }
}

/// Recover a [`VerificationResult`] from raw model text.
pub fn normalize(raw: &str) -> Normalized {
    match parse(raw) {
        Ok(result) => Normalized::Parsed(result),
        Err(cause) => Normalized::Degraded {
            result: fallback(raw, &cause),
            cause,
        },
    }
}

fn parse(raw: &str) -> Result<VerificationResult, String> {
    let cleaned = strip_fences(raw.trim());
    let candidate = JSON_SPAN
        .find(cleaned)
        .map(|m| m.as_str())
        .unwrap_or(cleaned);

    let value: Value = serde_json::from_str(candidate).map_err(|e| e.to_string())?;
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", kind_of(&value)))?;

    Ok(VerificationResult {
        is_correct: read_bool(obj, "is_correct")?,
        confidence: read_confidence(obj)?,
        reasoning: read_text(obj, &["explanation", "reasoning"], DEFAULT_REASONING),
        suggestions: read_text(obj, &["correction", "suggestions"], DEFAULT_SUGGESTIONS),
    })
}

fn strip_fences(s: &str) -> &str {
    let s = s.strip_prefix("```json").unwrap_or(s);
    let s = s.strip_prefix("```").unwrap_or(s);
    s.strip_suffix("```").unwrap_or(s)
}

/// `null` is treated the same as a missing key.
fn field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn read_bool(obj: &Map<String, Value>, key: &str) -> Result<bool, String> {
    match field(obj, key) {
        None => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(Value::Number(n)) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" | "" => Ok(false),
            other => Err(format!("invalid {key} value: {other:?}")),
        },
        Some(other) => Err(format!("invalid {key} value: {other}")),
    }
}

fn read_confidence(obj: &Map<String, Value>) -> Result<u8, String> {
    let value = match field(obj, "confidence") {
        None => return Ok(DEFAULT_CONFIDENCE),
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| format!("invalid confidence value: {n}"))?,
        Some(Value::String(s)) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .map_err(|_| format!("invalid confidence value: {s:?}"))?,
        Some(other) => return Err(format!("invalid confidence value: {other}")),
    };
    if !value.is_finite() {
        return Err(format!("invalid confidence value: {value}"));
    }
    Ok(value.trunc().clamp(0.0, 100.0) as u8)
}

/// First present key wins; non-string values are kept as compact JSON.
fn read_text(obj: &Map<String, Value>, keys: &[&str], default: &str) -> String {
    keys.iter()
        .find_map(|k| field(obj, k))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| default.to_string())
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn fallback(raw: &str, cause: &str) -> VerificationResult {
    let excerpt: String = raw.chars().take(RAW_EXCERPT_CHARS).collect();
    VerificationResult {
        is_correct: false,
        confidence: DEFAULT_CONFIDENCE,
        reasoning: format!("Could not parse AI response: {cause}. Raw response: {excerpt}..."),
        suggestions: RETRY_SUGGESTION.to_string(),
    }
}
