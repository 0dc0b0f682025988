//! Tolerant parsing of the model's JSON verdict.
//!
//! Models asked for "JSON only" still wrap it in code fences, prefix it
//! with prose, leave trailing commas, switch to camelCase, or quote their
//! numbers. This module extracts the first usable JSON object and
//! normalizes it into an [`AnalysisResult`].

use serde_json::{Map, Value};

use redflag_types::analysis::{AnalysisResult, ContentCategory, RedFlag, RiskLevel, Severity};
use redflag_types::error::ParseError;

const SCORE_KEYS: &[&str] = &["risk_score", "riskScore", "score", "risk"];
const LEVEL_KEYS: &[&str] = &["risk_level", "riskLevel", "level"];
const CATEGORY_KEYS: &[&str] = &["category", "content_category", "contentCategory", "type"];
const SUMMARY_KEYS: &[&str] = &["summary", "overview", "verdict"];
const FLAG_KEYS: &[&str] = &["red_flags", "redFlags", "flags", "warnings"];
const GREEN_KEYS: &[&str] = &["green_flags", "greenFlags", "positive_signals", "positiveSignals", "positives"];
const RECOMMENDATION_KEYS: &[&str] = &["recommendations", "advice", "next_steps", "nextSteps"];

/// Parse raw model output into a validated analysis.
///
/// `fallback_category` is used when the model omits the category or
/// names one that does not exist.
pub fn parse_analysis(
    raw: &str,
    fallback_category: ContentCategory,
) -> Result<AnalysisResult, ParseError> {
    let value = extract_json(raw)?;
    let obj = value.as_object().ok_or(ParseError::InvalidField {
        field: "root",
        reason: "expected a JSON object".to_string(),
    })?;

    let level_hint = match field(obj, LEVEL_KEYS) {
        Some(Value::String(s)) => s.parse::<RiskLevel>().ok(),
        _ => None,
    };

    let risk_score = match field(obj, SCORE_KEYS) {
        Some(v) => parse_score(v)?,
        None => match level_hint {
            Some(level) => level.representative_score(),
            None => return Err(ParseError::MissingField("risk_score")),
        },
    };

    let category = match field(obj, CATEGORY_KEYS) {
        Some(Value::String(s)) => s.parse().unwrap_or(fallback_category),
        _ => fallback_category,
    };

    let summary = match field(obj, SUMMARY_KEYS) {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };

    let red_flags = match field(obj, FLAG_KEYS) {
        Some(Value::Array(items)) => items.iter().filter_map(parse_flag).collect(),
        Some(_) => {
            return Err(ParseError::InvalidField {
                field: "red_flags",
                reason: "expected an array".to_string(),
            });
        }
        None => Vec::new(),
    };

    Ok(AnalysisResult {
        category,
        risk_score,
        risk_level: RiskLevel::from_score(risk_score),
        summary,
        red_flags,
        green_flags: string_list(field(obj, GREEN_KEYS)),
        recommendations: string_list(field(obj, RECOMMENDATION_KEYS)),
    })
}

/// Find and parse the JSON object in `raw`.
pub fn extract_json(raw: &str) -> Result<Value, ParseError> {
    let trimmed = strip_code_fences(raw.trim());

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        match value {
            Value::Object(_) => return Ok(value),
            // A model that JSON-encoded its JSON answer.
            Value::String(inner) if inner.trim_start().starts_with('{') => {
                return extract_json(&inner);
            }
            _ => {}
        }
    }

    let mut last_error = ParseError::NoJson;
    for (start, _) in trimmed.match_indices('{') {
        let Some(candidate) = balanced_object(&trimmed[start..]) else {
            last_error = ParseError::InvalidJson("unterminated JSON object".to_string());
            continue;
        };
        match serde_json::from_str::<Value>(candidate)
            .or_else(|_| serde_json::from_str::<Value>(&strip_trailing_commas(candidate)))
        {
            Ok(value @ Value::Object(_)) => return Ok(value),
            Ok(_) => {}
            Err(e) => last_error = ParseError::InvalidJson(e.to_string()),
        }
    }
    Err(last_error)
}

fn strip_code_fences(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    // Drop the info string line (```json).
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Return the slice from the opening `{` to its matching `}`, honouring
/// strings and escapes. `None` if the object never closes.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Remove commas directly followed (modulo whitespace) by `}` or `]`
/// outside of strings.
fn strip_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn parse_score(value: &Value) -> Result<u8, ParseError> {
    let invalid = |reason: String| ParseError::InvalidField {
        field: "risk_score",
        reason,
    };

    let number = match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(format!("{n} is not representable")))?,
        Value::String(s) => {
            let cleaned = s.trim().trim_end_matches('%');
            let cleaned = cleaned.split('/').next().unwrap_or(cleaned).trim();
            cleaned
                .parse::<f64>()
                .map_err(|_| invalid(format!("'{s}' is not a number")))?
        }
        other => return Err(invalid(format!("unexpected {}", type_name(other)))),
    };

    if !number.is_finite() {
        return Err(invalid("not a finite number".to_string()));
    }
    Ok(number.round().clamp(0.0, 100.0) as u8)
}

fn parse_flag(value: &Value) -> Option<RedFlag> {
    match value {
        Value::String(s) => {
            let title = s.trim();
            (!title.is_empty()).then(|| RedFlag {
                title: title.to_string(),
                description: String::new(),
                severity: Severity::Medium,
                evidence: None,
            })
        }
        Value::Object(obj) => {
            let title = text_of(field(obj, &["title", "name", "flag"]))?;
            let description = text_of(field(obj, &["description", "details", "explanation", "reason"]))
                .unwrap_or_default();
            let severity = match field(obj, &["severity", "level"]) {
                Some(Value::String(s)) => s.parse().unwrap_or(Severity::Medium),
                Some(Value::Number(n)) => match n.as_f64().unwrap_or(2.0).round() as i64 {
                    i64::MIN..=1 => Severity::Low,
                    2 => Severity::Medium,
                    _ => Severity::High,
                },
                _ => Severity::Medium,
            };
            let evidence = text_of(field(obj, &["evidence", "quote", "example"]));
            Some(RedFlag {
                title,
                description,
                severity,
                evidence,
            })
        }
        _ => None,
    }
}

/// Trimmed non-empty string content.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::Object(obj) => {
                    let title = text_of(field(obj, &["title", "name", "text"]));
                    let desc = text_of(field(obj, &["description", "details"]));
                    match (title, desc) {
                        (Some(t), Some(d)) => Some(format!("{t}: {d}")),
                        (Some(t), None) => Some(t),
                        (None, d) => d,
                    }
                }
                other => text_of(Some(other)),
            })
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
