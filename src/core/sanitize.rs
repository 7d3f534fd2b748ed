use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

pub const TITLE_MAX_CHARS: usize = 200;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;
pub const KEYWORDS_MAX_CHARS: usize = 500;
const DEFAULT_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum SanitizeError {
    /// No `{...}` span was found in the input.
    Extraction,
    /// The extracted span is not syntactically valid JSON.
    Parse(String),
    /// The decoded value is not a plain JSON object.
    NotAnObject,
    /// The key set is not exactly Title/Description/Keywords.
    WrongKeySet,
    /// A required field holds a non-string value.
    NonStringField(String),
}

impl fmt::Display for SanitizeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction => write!(f, "no JSON object found in model output"),
            Self::Parse(message) => write!(f, "model output is not valid JSON: {message}"),
            Self::NotAnObject => write!(f, "model output is not a plain JSON object"),
            Self::WrongKeySet => {
                write!(f, "model output must contain exactly Title, Description, Keywords")
            }
            Self::NonStringField(key) => write!(f, "field {key} is not a string"),
        }
    }
}

impl std::error::Error for SanitizeError {}

pub type Result<T> = std::result::Result<T, SanitizeError>;

/// Validated, sanitized metadata suggestion. Plain owned strings only.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AiMetadata {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Keywords")]
    pub keywords: String,
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("hard-coded pattern compiles"))
}

fn whitespace_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s+").expect("hard-coded pattern compiles"))
}

/// Extracts, validates, and sanitizes a metadata suggestion embedded in raw
/// model output. Both stages must succeed; there is no partial result.
pub fn sanitize_ai_response(raw: &str) -> Result<AiMetadata> {
    let span = extract_object_span(raw)?;

    let value: Value =
        serde_json::from_str(span).map_err(|err| SanitizeError::Parse(err.to_string()))?;
    let object = match value {
        Value::Object(map) => map,
        _ => return Err(SanitizeError::NotAnObject),
    };

    // Exact key set: extra keys (including pollution-shaped ones like
    // "__proto__") and missing keys both fail.
    const REQUIRED: [&str; 3] = ["Title", "Description", "Keywords"];
    if object.len() != REQUIRED.len() || REQUIRED.iter().any(|key| !object.contains_key(*key)) {
        return Err(SanitizeError::WrongKeySet);
    }

    let field = |key: &str| -> Result<String> {
        match object.get(key) {
            Some(Value::String(text)) => Ok(sanitize_field(key, text)),
            _ => Err(SanitizeError::NonStringField(key.to_string())),
        }
    };

    Ok(AiMetadata {
        title: field("Title")?,
        description: field("Description")?,
        keywords: field("Keywords")?,
    })
}

/// Strips surrounding markdown fences, then takes the span from the first
/// `{` to the last `}`.
fn extract_object_span(raw: &str) -> Result<&str> {
    let mut text = raw.trim();

    if let Some(rest) = text.strip_prefix("```") {
        // Drop the fence line itself ("```" or "```json").
        text = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    let text = text.trim();

    let start = text.find('{').ok_or(SanitizeError::Extraction)?;
    let end = text.rfind('}').ok_or(SanitizeError::Extraction)?;
    if end < start {
        return Err(SanitizeError::Extraction);
    }

    Ok(&text[start..=end])
}

/// Sanitization pipeline shared by the AI-response path and write-back:
/// NFC normalize, strip C0 controls and DEL, strip tag-like spans, collapse
/// whitespace, trim, cap to the field's length limit.
pub fn sanitize_field(name: &str, value: &str) -> String {
    let normalized: String = value.nfc().collect();
    let without_controls: String = normalized
        .chars()
        .filter(|ch| !matches!(ch, '\u{00}'..='\u{1f}' | '\u{7f}'))
        .collect();
    let without_tags = tag_pattern().replace_all(&without_controls, "");
    let collapsed = whitespace_pattern().replace_all(&without_tags, " ");
    let trimmed = collapsed.trim();

    let limit = field_char_limit(name);
    if trimmed.chars().count() > limit {
        trimmed.chars().take(limit).collect()
    } else {
        trimmed.to_string()
    }
}

pub fn field_char_limit(name: &str) -> usize {
    match name {
        "Title" => TITLE_MAX_CHARS,
        "Description" => DESCRIPTION_MAX_CHARS,
        "Keywords" => KEYWORDS_MAX_CHARS,
        _ => DEFAULT_MAX_CHARS,
    }
}
