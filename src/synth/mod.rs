//! The retry-driven synthesis loop and the stages it drives.

pub mod attempt;
pub mod invoker;
pub mod prompt;
pub mod recover;
pub mod retry;

use serde_json::Value;

use crate::foundation::config::{GeminiConfig, SynthConfig};
use crate::foundation::error::SynthResult;
use crate::persist::sink::{FileSink, PlanSink};
use crate::synth::attempt::AttemptLog;
use crate::synth::invoker::GeminiModel;
use crate::synth::retry::{Synthesis, Synthesizer};

/// One-shot synthesis against Gemini with default settings.
///
/// Returns the plan JSON, or `{}` when synthesis fails for any reason. The attempt log goes to
/// `outputs/enhancer_log.jsonl` either way.
pub fn synthesize_plan(user_text: &str, model_id: &str, max_attempts: u32) -> Value {
    let config = SynthConfig {
        model: model_id.to_owned(),
        max_attempts,
        ..SynthConfig::default()
    };
    synthesize_with_gemini(user_text, config, GeminiConfig::from_env()).plan_json()
}

/// Runs one request against Gemini, writing to a [`FileSink`] under `config.output_dir`.
///
/// A missing key, a bad config or a client that cannot be built still appends exactly one log
/// line, with `error` set and no attempts.
pub fn synthesize_with_gemini(
    user_text: &str,
    config: SynthConfig,
    gemini: SynthResult<GeminiConfig>,
) -> Synthesis {
    let sink = FileSink::new(config.log_path(), config.plan_dir());

    let model = gemini
        .map_err(|e| e.to_string())
        .and_then(|cfg| GeminiModel::new(cfg).map_err(|e| e.to_string()));
    let synth = model.and_then(|m| Synthesizer::new(m, &sink, config).map_err(|e| e.to_string()));

    match synth {
        Ok(synth) => synth.synthesize(user_text),
        Err(err) => {
            tracing::warn!(error = %err, "synthesis could not start");
            let mut log = AttemptLog::new(user_text);
            log.error = Some(err);
            if let Err(e) = sink.append_log(&log) {
                tracing::warn!(error = %e, "failed to append attempt log");
            }
            Synthesis { plan: None, log }
        }
    }
}
