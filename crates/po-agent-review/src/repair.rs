//! Recovers a review payload from agent output that is not clean JSON.
//!
//! Stages run in order and the first success wins:
//! 1. strict decode of the whole payload;
//! 2. strip a BOM and any code fence, cut out the first balanced object and
//!    decode that strictly;
//! 3. pull `total_entries` and each issue's fields out independently, which
//!    tolerates missing colons, trailing commas and missing fields.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::ReviewError;
use crate::model::{ReviewIssue, ReviewJsonResult};

const BOM: char = '\u{feff}';
const FENCE: &str = "```";

static TOTAL_ENTRIES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""total_entries"\s*:?\s*"?(-?\d+)"#).expect("valid total_entries regex")
});
static ISSUES_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""issues"\s*:?\s*\["#).expect("valid issues regex"));
static STRING_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"(msgid|msgstr|description|suggestion)"\s*:?\s*"((?:[^"\\]|\\.)*)""#)
        .expect("valid string field regex")
});
static SCORE_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""score"\s*:?\s*"?(-?\d+)"#).expect("valid score regex"));

/// Parses a review payload produced by an agent.
pub fn parse_review_json(raw: &str) -> Result<ReviewJsonResult, ReviewError> {
    let strict_error = match serde_json::from_str::<ReviewJsonResult>(raw) {
        Ok(result) => return Ok(result),
        Err(err) => err,
    };

    let unwrapped = unwrap_payload(raw);
    if let Some(object) = balanced_object(unwrapped) {
        match serde_json::from_str::<ReviewJsonResult>(object) {
            Ok(result) => {
                debug!("review JSON recovered after normalization");
                return Ok(result);
            }
            Err(err) => debug!(error = %err, "normalized review JSON still invalid"),
        }
    }

    if let Some(result) = lenient_extract(unwrapped) {
        debug!(
            total_entries = result.total_entries,
            issues = result.issues.len(),
            "review JSON recovered by field extraction"
        );
        return Ok(result);
    }

    debug!(payload = %raw, "unrecoverable review payload");
    Err(ReviewError::Unrecoverable {
        reason: likely_cause(unwrapped, &strict_error),
    })
}

/// Strips a leading BOM and surrounding whitespace, and returns the interior
/// of the code fence wrapping the payload if there is one.
fn unwrap_payload(raw: &str) -> &str {
    let text = raw.trim_start_matches(BOM).trim();
    match fenced_interior(text).map(str::trim) {
        Some(body) if !body.is_empty() => body,
        _ => text,
    }
}

/// Interior of a fence that opens before the first `{`. Backticks after that
/// belong to string values or trailing prose.
fn fenced_interior(text: &str) -> Option<&str> {
    let open = text.find(FENCE)?;
    if text.find('{').is_some_and(|brace| brace < open) {
        return None;
    }
    let after_fence = &text[open + FENCE.len()..];
    // Skip the info string (```json).
    let body_start = after_fence.find('\n').map_or(after_fence.len(), |i| i + 1);
    let body = &after_fence[body_start..];
    Some(match body.find(FENCE) {
        Some(close) => &body[..close],
        None => body,
    })
}

/// Returns the first `{...}` span whose braces balance, ignoring braces that
/// appear inside JSON strings.
fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits the body of the `issues` array into per-object spans.
///
/// An object left open at the end of the input (truncated output) is still
/// returned so its complete fields can be used.
fn issue_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(idx);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0
                    && let Some(begin) = start.take()
                {
                    spans.push(&text[begin..=idx]);
                }
            }
            ']' if depth == 0 => break,
            _ => {}
        }
    }
    if let Some(begin) = start {
        spans.push(&text[begin..]);
    }
    spans
}

fn unescape(captured: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{captured}\""))
        .unwrap_or_else(|_| captured.to_string())
}

fn extract_issue(span: &str) -> Option<ReviewIssue> {
    let score = SCORE_FIELD
        .captures(span)
        .and_then(|caps| caps[1].parse::<i64>().ok())?;
    let mut issue = ReviewIssue {
        score,
        ..ReviewIssue::default()
    };
    let mut seen = [false; 4];
    for caps in STRING_FIELD.captures_iter(span) {
        let (slot, target) = match &caps[1] {
            "msgid" => (0, &mut issue.msgid),
            "msgstr" => (1, &mut issue.msgstr),
            "description" => (2, &mut issue.description),
            _ => (3, &mut issue.suggestion),
        };
        if !seen[slot] {
            seen[slot] = true;
            *target = unescape(&caps[2]);
        }
    }
    Some(issue)
}

fn lenient_extract(text: &str) -> Option<ReviewJsonResult> {
    let total_entries = TOTAL_ENTRIES
        .captures(text)
        .and_then(|caps| caps[1].parse::<i64>().ok())
        .unwrap_or(0);
    let Some(issues_at) = ISSUES_KEY.find(text) else {
        return (total_entries != 0).then(|| ReviewJsonResult::new(total_entries, Vec::new()));
    };
    let issues = issue_spans(&text[issues_at.end()..])
        .into_iter()
        .filter_map(extract_issue)
        .collect();
    Some(ReviewJsonResult::new(total_entries, issues))
}

fn likely_cause(text: &str, strict_error: &serde_json::Error) -> String {
    if text.is_empty() {
        return "agent output is empty".to_string();
    }
    if !text.contains('{') {
        return "agent output contains no JSON object".to_string();
    }
    if balanced_object(text).is_none() {
        return "JSON object is never closed; the agent output looks truncated".to_string();
    }
    format!(
        "no `total_entries` or `issues` field could be recovered (strict parse failed at line {}, column {})",
        strict_error.line(),
        strict_error.column()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> (String, ReviewJsonResult) {
        let value = json!({
            "total_entries": 12,
            "issues": [
                {"msgid": "Open file", "msgstr": "Abrir archivo", "score": 2,
                 "description": "Prefer \"fichero\" in es_ES", "suggestion": "Abrir fichero"},
                {"msgid": "Quit", "msgstr": "", "score": 0,
                 "description": "Missing translation", "suggestion": "Salir"}
            ]
        });
        let expected: ReviewJsonResult = serde_json::from_value(value.clone()).expect("sample");
        (value.to_string(), expected)
    }

    #[test]
    fn clean_payload_decodes_strictly() {
        let (payload, expected) = sample();
        assert_eq!(parse_review_json(&payload).expect("parse"), expected);
    }

    #[test]
    fn bom_and_fence_wrapped_payload_matches_bare_payload() {
        let (payload, expected) = sample();
        let wrapped = format!("\u{feff}```json\n{payload}\n```\n");
        assert_eq!(parse_review_json(&wrapped).expect("parse"), expected);
    }

    #[test]
    fn backticks_inside_string_values_are_not_a_fence() {
        let bare = r#"{"total_entries":2,"issues":[{"msgid":"Code","msgstr":"Code","score":2,"description":"wrap in ```code```","suggestion":""}]}"#;
        let expected = parse_review_json(bare).expect("bare payload");
        assert_eq!(expected.issues[0].description, "wrap in ```code```");
        let with_bom = format!("\u{feff}{bare}");
        assert_eq!(parse_review_json(&with_bom).expect("bom payload"), expected);
    }

    #[test]
    fn backticks_in_trailing_prose_are_not_a_fence() {
        let text = "{\"total_entries\":4,\"issues\":[]}\nTip: run ```msgfmt -c``` before committing.";
        assert_eq!(
            parse_review_json(text).expect("parse"),
            ReviewJsonResult::new(4, Vec::new())
        );
    }

    #[test]
    fn empty_fence_falls_back_to_the_whole_text() {
        let text = "```\n```\n{\"total_entries\":3,\"issues\":[]}";
        assert_eq!(
            parse_review_json(text).expect("parse"),
            ReviewJsonResult::new(3, Vec::new())
        );
    }

    #[test]
    fn surrounding_prose_is_stripped() {
        let (payload, expected) = sample();
        let chatty = format!("Here is my review {{as requested}}:\n{payload}\nLet me know!");
        // The first balanced span is the prose braces, so field extraction
        // has to take over.
        assert_eq!(parse_review_json(&chatty).expect("parse"), expected);

        let polite = format!("Review follows.\n{payload}\nThanks.");
        assert_eq!(parse_review_json(&polite).expect("parse"), expected);
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_the_scanner() {
        let text = r#"noise {"a": "}{", "b": {"c": 1}} tail"#;
        assert_eq!(balanced_object(text), Some(r#"{"a": "}{", "b": {"c": 1}}"#));
    }

    #[test]
    fn missing_colons_and_trailing_commas_are_tolerated() {
        let broken = r#"{
            "total_entries" 5,
            "issues": [
                {"msgid" "Cancel", "msgstr": "Anuler", "score": 1, "description": "Typo",},
                {"msgid": "Help", "score": 3,},
            ],
        }"#;
        let result = parse_review_json(broken).expect("lenient parse");
        assert_eq!(result.total_entries, 5);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].msgid, "Cancel");
        assert_eq!(result.issues[0].msgstr, "Anuler");
        assert_eq!(result.issues[0].description, "Typo");
        assert_eq!(result.issues[1].score, 3);
    }

    #[test]
    fn truncated_payload_keeps_complete_fields() {
        let truncated = r#"{"total_entries": 8, "issues": [{"msgid": "Edit", "score": 1, "description": "Wrong ver"#;
        let result = parse_review_json(truncated).expect("partial result");
        assert_eq!(result.total_entries, 8);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].msgid, "Edit");
        assert_eq!(result.issues[0].description, "");
    }

    #[test]
    fn entries_without_issues_field_is_a_partial_result() {
        let result = parse_review_json(r#"{"total_entries": 40"#).expect("partial");
        assert_eq!(result, ReviewJsonResult::new(40, Vec::new()));
    }

    #[test]
    fn escaped_strings_are_unescaped() {
        let broken = r#"{"total_entries": 1 "issues": [{"msgid": "Say \"hi\"\n", "score": 2}]}"#;
        let result = parse_review_json(broken).expect("lenient parse");
        assert_eq!(result.issues[0].msgid, "Say \"hi\"\n");
    }

    #[test]
    fn hopeless_payload_names_the_cause_without_echoing_it() {
        let err = parse_review_json("I could not finish the review, sorry.").expect_err("fails");
        let message = err.to_string();
        assert!(message.contains("no JSON object"), "{message}");
        assert!(!message.contains("sorry"));

        let err = parse_review_json(r#"{"verdict": "fine"}"#).expect_err("fails");
        assert!(err.to_string().contains("total_entries"));

        let err = parse_review_json("").expect_err("fails");
        assert!(err.to_string().contains("empty"));
    }
}
