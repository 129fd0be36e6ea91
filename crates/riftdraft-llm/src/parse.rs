// Turning raw model text into typed values.
//
// Models wrap JSON in prose or markdown fences often enough that a plain
// `serde_json::from_str` is not sufficient. Candidates are tried in order:
// the whole trimmed text, the contents of the first fenced block, then the
// span from the first `{` to the last `}`.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

use crate::error::AiError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("response was empty")]
    EmptyResponse,

    #[error("response was not valid JSON: {reason}")]
    InvalidFormat { reason: String },
}

impl From<ParseError> for AiError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::EmptyResponse => AiError::EmptyResponse,
            ParseError::InvalidFormat { reason } => AiError::InvalidFormat { reason },
        }
    }
}

/// Semantic checks on a decoded response, beyond what its type enforces.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Decode `raw` as `T`.
pub fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T, ParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!("AI response was empty");
        return Err(ParseError::EmptyResponse);
    }

    let mut last_error = None;
    for candidate in candidates(trimmed) {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    let reason = last_error.unwrap_or_else(|| "no JSON found".to_string());
    warn!(%reason, raw = %raw, "AI response could not be decoded");
    Err(ParseError::InvalidFormat { reason })
}

/// Decode and validate. A validation failure is reported as
/// `AiError::Validation`.
pub fn parse_validated<T: DeserializeOwned + Validate>(raw: &str) -> Result<T, AiError> {
    let value: T = parse_json(raw)?;
    value.validate().map_err(|reason| {
        warn!(%reason, raw = %raw, "AI response failed validation");
        AiError::Validation(reason)
    })?;
    Ok(value)
}

fn candidates(trimmed: &str) -> Vec<&str> {
    let mut out = vec![trimmed];
    if let Some(fenced) = fenced_block(trimmed) {
        out.push(fenced);
    }
    if let Some(span) = brace_span(trimmed) {
        out.push(span);
    }
    out.dedup();
    out
}

/// Contents of the first ```` ``` ```` block, with any language tag dropped.
/// An unterminated fence runs to the end of the text.
fn fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_fence = &text[open + 3..];
    // Skip the info string (`json`, `JSON`, ...) up to the end of the line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let body = match body.find("```") {
        Some(close) => &body[..close],
        None => body,
    };
    let body = body.trim();
    (!body.is_empty()).then_some(body)
}

fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Pick {
        champion: String,
    }

    impl Validate for Pick {
        fn validate(&self) -> Result<(), String> {
            if self.champion.trim().is_empty() {
                return Err("champion must not be blank".into());
            }
            Ok(())
        }
    }

    fn ahri() -> Pick {
        Pick {
            champion: "Ahri".into(),
        }
    }

    #[test]
    fn raw_json() {
        assert_eq!(parse_json::<Pick>(r#"{"champion":"Ahri"}"#), Ok(ahri()));
        assert_eq!(parse_json::<Pick>("  \n{\"champion\":\"Ahri\"}\n"), Ok(ahri()));
    }

    #[test]
    fn fenced_json() {
        let raw = "```json\n{\"champion\":\"Ahri\"}\n```";
        assert_eq!(parse_json::<Pick>(raw), Ok(ahri()));

        let raw = "Here you go:\n```\n{\"champion\":\"Ahri\"}\n```\nGood luck!";
        assert_eq!(parse_json::<Pick>(raw), Ok(ahri()));
    }

    #[test]
    fn json_embedded_in_prose() {
        let raw = "I would pick {\"champion\":\"Ahri\"} because of her mobility.";
        assert_eq!(parse_json::<Pick>(raw), Ok(ahri()));
    }

    #[test]
    fn unterminated_fence() {
        let raw = "```json\n{\"champion\":\"Ahri\"}";
        assert_eq!(parse_json::<Pick>(raw), Ok(ahri()));
    }

    #[test]
    fn empty_and_whitespace_are_empty_response() {
        assert_eq!(parse_json::<Pick>(""), Err(ParseError::EmptyResponse));
        assert_eq!(parse_json::<Pick>("  \n\t "), Err(ParseError::EmptyResponse));
    }

    #[test]
    fn prose_is_invalid_format() {
        let err = parse_json::<Pick>("not json at all").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat { .. }), "{err:?}");
    }

    #[test]
    fn wrong_shape_is_invalid_format() {
        let err = parse_json::<Pick>(r#"{"hero":"Ahri"}"#).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat { .. }), "{err:?}");
    }

    #[test]
    fn validation_failure_is_reported_separately() {
        let err = parse_validated::<Pick>(r#"{"champion":"  "}"#).unwrap_err();
        assert!(matches!(err, AiError::Validation(_)), "{err:?}");
        assert_eq!(parse_validated::<Pick>(r#"{"champion":"Ahri"}"#), Ok(ahri()));
    }

    #[test]
    fn parse_errors_map_to_ai_errors() {
        assert_eq!(AiError::from(ParseError::EmptyResponse), AiError::EmptyResponse);
        assert!(matches!(
            AiError::from(ParseError::InvalidFormat { reason: "x".into() }),
            AiError::InvalidFormat { .. }
        ));
    }
}
