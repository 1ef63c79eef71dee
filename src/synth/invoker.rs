//! Boundary to the external text-generation service.
//!
//! [`TextModel`] is the transport seam: one request, one raw JSON response. [`ModelInvoker`]
//! sits on top of it, reduces the many response shapes to a single string, and turns every
//! failure into a value so nothing propagates past it.

use serde_json::{Value, json};

use crate::foundation::config::{GeminiConfig, normalize_model_id};

/// Sampling parameters for one generation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub max_output_tokens: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum InvokeError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("missing api key")]
    MissingApiKey,
}

/// A text-generation backend.
pub trait TextModel {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Value, InvokeError>;
}

impl<T: TextModel + ?Sized> TextModel for &T {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Value, InvokeError> {
        (**self).generate(model, prompt, params)
    }
}

impl<T: TextModel + ?Sized> TextModel for Box<T> {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Value, InvokeError> {
        (**self).generate(model, prompt, params)
    }
}

/// What one invocation produced.
#[derive(Debug)]
pub enum InvokeOutcome {
    Text(String),
    /// The service answered, but no extractor found any text.
    Empty,
    Failed(InvokeError),
}

impl InvokeOutcome {
    /// The extracted text, or `""` for the empty and failed outcomes.
    pub fn text(&self) -> &str {
        match self {
            InvokeOutcome::Text(t) => t,
            InvokeOutcome::Empty | InvokeOutcome::Failed(_) => "",
        }
    }
}

type Extractor = fn(&Value) -> Option<String>;

/// Extraction strategies in priority order; the first non-empty result wins.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("bare_string", from_bare_string),
    ("top_level_field", from_top_level_field),
    ("gemini_parts", from_gemini_parts),
    ("first_candidate", from_first_candidate),
];

const TEXT_FIELDS: [&str; 5] = ["text", "content", "generated_text", "output", "result"];
const CANDIDATE_LISTS: [&str; 3] = ["candidates", "outputs", "choices"];

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    (!t.is_empty()).then(|| t.to_owned())
}

fn from_bare_string(resp: &Value) -> Option<String> {
    resp.as_str().and_then(non_blank)
}

fn from_top_level_field(resp: &Value) -> Option<String> {
    TEXT_FIELDS
        .iter()
        .find_map(|k| resp.get(*k).and_then(Value::as_str).and_then(non_blank))
}

fn from_gemini_parts(resp: &Value) -> Option<String> {
    let parts = resp
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    non_blank(&texts.join("\n"))
}

fn from_first_candidate(resp: &Value) -> Option<String> {
    let first = CANDIDATE_LISTS
        .iter()
        .find_map(|k| resp.get(*k).and_then(|list| list.get(0)))?;
    if let Some(s) = first.as_str() {
        return non_blank(s);
    }
    ["content", "text"]
        .iter()
        .find_map(|k| first.get(*k).and_then(Value::as_str).and_then(non_blank))
        .or_else(|| {
            first
                .get("message")
                .and_then(|m| m.get("content"))
                .and_then(Value::as_str)
                .and_then(non_blank)
        })
}

/// Runs the text extractors over a raw service response.
pub fn extract_text(resp: &Value) -> Option<String> {
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let text = extract(resp)?;
        tracing::debug!(extractor = name, chars = text.len(), "extracted response text");
        Some(text)
    })
}

/// Sends prompts to a [`TextModel`] and reduces responses to plain text.
pub struct ModelInvoker<M> {
    model: M,
    model_id: String,
    max_output_tokens: u32,
}

impl<M: TextModel> ModelInvoker<M> {
    pub fn new(model: M, model_id: &str, max_output_tokens: u32) -> Self {
        Self {
            model,
            model_id: normalize_model_id(model_id),
            max_output_tokens,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn invoke(&self, prompt: &str, temperature: f64) -> InvokeOutcome {
        let params = SamplingParams {
            temperature,
            max_output_tokens: self.max_output_tokens,
        };
        match self.model.generate(&self.model_id, prompt, &params) {
            Ok(resp) => match extract_text(&resp) {
                Some(text) => InvokeOutcome::Text(text),
                None => InvokeOutcome::Empty,
            },
            Err(err) => {
                tracing::warn!(model = %self.model_id, error = %err, "model call failed");
                InvokeOutcome::Failed(err)
            }
        }
    }
}

/// Request URLs and error text must never contain the api key; it goes in this header.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Blocking client for the Gemini `generateContent` REST endpoint.
pub struct GeminiModel {
    client: reqwest::blocking::Client,
    config: GeminiConfig,
}

impl GeminiModel {
    pub fn new(config: GeminiConfig) -> Result<Self, InvokeError> {
        if config.api_key.trim().is_empty() {
            return Err(InvokeError::MissingApiKey);
        }
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("sceneplan/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| InvokeError::Transport(format!("client error: {e}")))?;
        Ok(Self { client, config })
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.config.endpoint.trim_end_matches('/')
        )
    }
}

pub(crate) fn gemini_request_body(prompt: &str, params: &SamplingParams) -> Value {
    json!({
        "contents": [
            {"role": "user", "parts": [{"text": prompt}]}
        ],
        "generationConfig": {
            "temperature": params.temperature,
            "maxOutputTokens": params.max_output_tokens,
        }
    })
}

impl TextModel for GeminiModel {
    fn generate(
        &self,
        model: &str,
        prompt: &str,
        params: &SamplingParams,
    ) -> Result<Value, InvokeError> {
        let response = self
            .client
            .post(self.url(model))
            .header(API_KEY_HEADER, self.config.api_key.as_str())
            .json(&gemini_request_body(prompt, params))
            .send()
            .map_err(|e| InvokeError::Transport(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        let body = response.text().map_err(|e| {
            InvokeError::Transport(format!("failed to read body: {}", e.without_url()))
        })?;
        if !status.is_success() {
            return Err(InvokeError::Status {
                code: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        serde_json::from_str(&body).map_err(|e| InvokeError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn gemini_parts_are_joined() {
        let resp = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}]}}]
        });
        assert_eq!(extract_text(&resp).unwrap(), "{\"a\":\n1}");
    }

    #[test]
    fn top_level_text_field() {
        assert_eq!(extract_text(&json!({"generated_text": "  hi "})).unwrap(), "hi");
    }

    #[test]
    fn bare_string_response() {
        assert_eq!(extract_text(&json!("plain")).unwrap(), "plain");
    }

    #[test]
    fn openai_style_choices() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]});
        assert_eq!(extract_text(&resp).unwrap(), "ok");
    }

    #[test]
    fn candidate_list_of_strings() {
        assert_eq!(extract_text(&json!({"outputs": ["first", "second"]})).unwrap(), "first");
    }

    #[test]
    fn extractor_order_prefers_top_level_field() {
        let resp = json!({
            "text": "top",
            "candidates": [{"content": {"parts": [{"text": "nested"}]}}]
        });
        assert_eq!(extract_text(&resp).unwrap(), "top");
    }

    #[test]
    fn blank_and_unknown_shapes_yield_none() {
        assert!(extract_text(&json!({"text": "   "})).is_none());
        assert!(extract_text(&json!({"foo": 1})).is_none());
        assert!(extract_text(&Value::Null).is_none());
    }

    #[test]
    fn request_body_carries_sampling_params() {
        let body = gemini_request_body(
            "p",
            &SamplingParams {
                temperature: 0.35,
                max_output_tokens: 99,
            },
        );
        assert_eq!(body["contents"][0]["parts"][0]["text"], "p");
        assert_eq!(body["generationConfig"]["temperature"], 0.35);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 99);
    }

    struct Recording {
        calls: RefCell<Vec<(String, f64)>>,
        reply: fn() -> Result<Value, InvokeError>,
    }

    impl TextModel for Recording {
        fn generate(
            &self,
            model: &str,
            _prompt: &str,
            params: &SamplingParams,
        ) -> Result<Value, InvokeError> {
            self.calls
                .borrow_mut()
                .push((model.to_owned(), params.temperature));
            (self.reply)()
        }
    }

    #[test]
    fn invoker_turns_errors_into_values() {
        let model = Recording {
            calls: RefCell::new(Vec::new()),
            reply: || Err(InvokeError::Transport("down".to_owned())),
        };
        let invoker = ModelInvoker::new(&model, "text-bison-001", 100);
        let out = invoker.invoke("p", 0.1);
        assert!(matches!(out, InvokeOutcome::Failed(_)));
        assert_eq!(out.text(), "");
        assert_eq!(model.calls.borrow()[0], ("gemini-2.0-flash".to_owned(), 0.1));
    }

    #[test]
    fn invoker_reports_empty_responses() {
        let model = Recording {
            calls: RefCell::new(Vec::new()),
            reply: || Ok(json!({"candidates": []})),
        };
        let out = ModelInvoker::new(&model, "gemini-2.0-flash", 100).invoke("p", 0.5);
        assert!(matches!(out, InvokeOutcome::Empty));
    }

    #[test]
    fn transport_errors_do_not_carry_the_api_key() {
        let key = "SUPER-SECRET-KEY-123";
        let mut cfg = GeminiConfig::new(key);
        cfg.endpoint = "http://127.0.0.1:1".to_owned();
        cfg.timeout = std::time::Duration::from_secs(5);
        let model = GeminiModel::new(cfg).unwrap();

        let err = model
            .generate(
                "gemini-2.0-flash",
                "p",
                &SamplingParams {
                    temperature: 0.1,
                    max_output_tokens: 10,
                },
            )
            .unwrap_err();
        assert!(matches!(err, InvokeError::Transport(_)));
        let text = err.to_string();
        assert!(!text.contains(key), "{text}");
        assert!(!text.contains("127.0.0.1"), "{text}");
    }

    #[test]
    fn gemini_requires_api_key() {
        assert!(matches!(
            GeminiModel::new(GeminiConfig::new("")),
            Err(InvokeError::MissingApiKey)
        ));
    }
}
