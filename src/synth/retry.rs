use serde_json::{Value, json};

use crate::foundation::config::SynthConfig;
use crate::foundation::error::SynthResult;
use crate::persist::sink::PlanSink;
use crate::plan::model::Plan;
use crate::plan::validate::validate_and_fill;
use crate::synth::attempt::{AttemptFailure, AttemptLog, AttemptRecord, raw_sample};
use crate::synth::invoker::{InvokeOutcome, ModelInvoker, TextModel};
use crate::synth::prompt::build_prompt;
use crate::synth::recover::recover_json_block;

/// Result of one synthesis request.
#[derive(Debug, Clone)]
pub struct Synthesis {
    /// The accepted plan; `None` once every attempt has failed.
    pub plan: Option<Plan>,
    /// The attempt log exactly as handed to the sink.
    pub log: AttemptLog,
}

impl Synthesis {
    pub fn is_success(&self) -> bool {
        self.plan.is_some()
    }

    /// The plan as JSON, or the empty object `{}` on exhaustion.
    pub fn plan_json(&self) -> Value {
        self.plan
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or_else(|| json!({}))
    }
}

/// Drives prompt, model, recovery and validation until a plan is accepted or attempts run out.
pub struct Synthesizer<M, S> {
    invoker: ModelInvoker<M>,
    sink: S,
    config: SynthConfig,
}

enum Step {
    Accepted(Plan),
    Failed(AttemptFailure),
}

impl<M: TextModel, S: PlanSink> Synthesizer<M, S> {
    pub fn new(model: M, sink: S, config: SynthConfig) -> SynthResult<Self> {
        config.validate()?;
        Ok(Self {
            invoker: ModelInvoker::new(model, &config.model, config.max_output_tokens),
            sink,
            config,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Runs one request to a terminal state and flushes its attempt log exactly once.
    ///
    /// Never returns an error: failures end up in the log and as `plan: None`.
    #[tracing::instrument(skip(self), fields(model = %self.invoker.model_id()))]
    pub fn synthesize(&self, request: &str) -> Synthesis {
        let mut log = AttemptLog::new(request);

        let prompt = match build_prompt(request) {
            Ok(p) => p,
            Err(err) => {
                tracing::warn!(error = %err, "request rejected before any attempt");
                log.error = Some(err.to_string());
                self.flush(&log);
                return Synthesis { plan: None, log };
            }
        };

        let mut accepted = None;
        for attempt in 1..=self.config.max_attempts {
            let temp = self.config.temperature_for(attempt);
            tracing::info!(attempt, temp, "synthesis attempt");

            let mut record = AttemptRecord {
                attempt,
                temp,
                raw_sample: String::new(),
                diag: None,
                failure: None,
                error: None,
            };
            let step = self.attempt(&prompt, temp, &mut record);
            log.attempts.push(record);

            match step {
                Step::Accepted(plan) => {
                    accepted = Some(plan);
                    break;
                }
                Step::Failed(failure) => {
                    tracing::debug!(attempt, ?failure, "attempt failed");
                }
            }
        }

        match &accepted {
            Some(plan) => {
                tracing::info!(
                    attempts = log.attempts.len(),
                    confidence = ?plan.meta.confidence,
                    "plan accepted"
                );
                if self.config.save_plans {
                    match self.sink.save_plan(plan, request) {
                        Ok(path) => log.saved_path = Some(path.display().to_string()),
                        Err(err) => tracing::warn!(error = %err, "failed to save plan"),
                    }
                }
            }
            None => {
                tracing::warn!(attempts = log.attempts.len(), "synthesis exhausted");
            }
        }

        self.flush(&log);
        Synthesis {
            plan: accepted,
            log,
        }
    }

    fn attempt(&self, prompt: &str, temp: f64, record: &mut AttemptRecord) -> Step {
        let failed = |record: &mut AttemptRecord, failure| {
            record.failure = Some(failure);
            Step::Failed(failure)
        };

        let text = match self.invoker.invoke(prompt, temp) {
            InvokeOutcome::Text(text) => text,
            InvokeOutcome::Empty => return failed(record, AttemptFailure::NoText),
            InvokeOutcome::Failed(err) => {
                record.error = Some(err.to_string());
                return failed(record, AttemptFailure::NoText);
            }
        };
        record.raw_sample = raw_sample(&text, self.config.raw_sample_chars);

        let Some(block) = recover_json_block(&text) else {
            return failed(record, AttemptFailure::NoJson);
        };
        let value: Value = match serde_json::from_str(&block) {
            Ok(v) => v,
            Err(err) => {
                record.error = Some(err.to_string());
                return failed(record, AttemptFailure::ParseFailed);
            }
        };

        let validation = validate_and_fill(value);
        record.diag = Some(validation.diagnostics.clone());
        if !validation.is_success() {
            return failed(record, AttemptFailure::Invalid);
        }
        match validation.into_plan() {
            Ok(plan) => Step::Accepted(plan),
            Err(err) => {
                record.error = Some(err.to_string());
                failed(record, AttemptFailure::Invalid)
            }
        }
    }

    fn flush(&self, log: &AttemptLog) {
        if let Err(err) = self.sink.append_log(log) {
            tracing::warn!(error = %err, "failed to append attempt log");
        }
    }
}
