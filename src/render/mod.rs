//! Turning accepted plans into renderable artifacts.

use std::path::PathBuf;

use crate::foundation::error::SynthResult;
use crate::plan::model::Plan;

pub mod manim;

pub use manim::{ManimScriptRenderer, generate_manim_code};

/// Consumes a validated plan and produces an output artifact.
pub trait Renderer {
    /// Renders `plan` and returns the path of what was written.
    fn render(&self, plan: &Plan) -> SynthResult<PathBuf>;
}
