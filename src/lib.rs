//! sceneplan turns short natural-language requests into validated animation scene plans.
//!
//! The pipeline is synchronous and retry-driven:
//!
//! - build an instruction prompt for the request
//! - call a [`TextModel`] and reduce its response to text
//! - recover the first parseable JSON block
//! - validate, repair and score the plan
//! - retry with a higher temperature until a plan is accepted or attempts run out
//!
//! Every request ends with exactly one attempt-log record in a [`PlanSink`].
#![forbid(unsafe_code)]

pub mod foundation;
pub mod persist;
pub mod plan;
pub mod render;
pub mod synth;

pub use crate::foundation::config::{GeminiConfig, SynthConfig, normalize_model_id};
pub use crate::foundation::error::{SynthError, SynthResult};
pub use crate::persist::sink::{FileSink, InMemorySink, PlanSink};
pub use crate::plan::model::{
    Action, ActionKind, Confidence, ObjectKind, Params, Plan, PlanMeta, Scene, SceneObject,
};
pub use crate::plan::validate::{Diagnostics, Validation, validate_and_fill};
pub use crate::render::{ManimScriptRenderer, Renderer, generate_manim_code};
pub use crate::synth::attempt::{AttemptFailure, AttemptLog, AttemptRecord};
pub use crate::synth::invoker::{
    GeminiModel, InvokeError, InvokeOutcome, ModelInvoker, SamplingParams, TextModel,
};
pub use crate::synth::prompt::build_prompt;
pub use crate::synth::recover::recover_json_block;
pub use crate::synth::retry::{Synthesis, Synthesizer};
pub use crate::synth::{synthesize_plan, synthesize_with_gemini};
