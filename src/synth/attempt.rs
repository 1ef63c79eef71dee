use crate::plan::validate::Diagnostics;

/// Why one attempt did not produce an accepted plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptFailure {
    /// The model call failed or its response carried no text.
    NoText,
    /// No parseable JSON block was found in the text.
    NoJson,
    /// A recovered block could not be decoded.
    ParseFailed,
    /// The validator reported hard errors.
    Invalid,
}

/// One line item of the attempt log.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt index.
    pub attempt: u32,
    pub temp: f64,
    /// Leading characters of the raw model text.
    pub raw_sample: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diag: Option<Diagnostics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<AttemptFailure>,
    /// Transport error text, when the model call itself failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Everything recorded about one synthesis request; serialized as one JSON line.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AttemptLog {
    pub query: String,
    pub attempts: Vec<AttemptRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_path: Option<String>,
    /// Request-level failure that stopped synthesis before any attempt ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AttemptLog {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn raw_sample(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_owned(),
        None => text.to_owned(),
    }
}
