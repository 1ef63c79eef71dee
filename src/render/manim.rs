//! Manim CE script generation from a validated [`Plan`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::foundation::error::{SynthError, SynthResult};
use crate::plan::model::{ActionKind, ObjectKind, Params, Plan, Scene, SceneObject};
use crate::plan::physics::{
    DEFAULT_ANGLE_DEGREES, DEFAULT_G, DEFAULT_V0, ProjectilePath, projectile_path,
};
use crate::render::Renderer;

pub const FALLBACK_CLASS_NAME: &str = "GeneratedAnimation";
pub const DEFAULT_ACTION_DURATION: f64 = 0.8;

const INDENT: &str = "        ";

/// Python class name for a plan title.
///
/// Title-cases each word, keeps alphanumerics only, prefixes `Scene` when the result does not
/// start with a letter.
pub fn class_name(title: &str) -> String {
    let mut out = String::new();
    let mut word_start = true;
    for ch in title.chars() {
        if ch.is_alphabetic() {
            if word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            word_start = false;
        } else {
            if ch.is_numeric() {
                out.push(ch);
            }
            word_start = true;
        }
    }
    if out.is_empty() {
        return FALLBACK_CLASS_NAME.to_owned();
    }
    if !out.starts_with(|c: char| c.is_alphabetic()) {
        out.insert_str(0, "Scene");
    }
    out
}

/// Python identifier for an object id.
pub fn object_var(id: &str) -> String {
    let body: String = id
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("obj_{body}")
}

/// Object variables for one scene, aligned with `scene.objects`.
///
/// Ids that sanitize to the same identifier get `_2`, `_3`, ... suffixes in declaration order.
/// Actions resolve through the first object declared with a given id.
struct SceneVars<'a> {
    vars: Vec<String>,
    by_id: BTreeMap<&'a str, usize>,
}

impl<'a> SceneVars<'a> {
    fn new(scene: &'a Scene) -> Self {
        let mut used = BTreeSet::new();
        let mut vars = Vec::with_capacity(scene.objects.len());
        let mut by_id = BTreeMap::new();
        for (i, obj) in scene.objects.iter().enumerate() {
            let base = object_var(&obj.id);
            let mut var = base.clone();
            let mut n = 2;
            while used.contains(&var) {
                var = format!("{base}_{n}");
                n += 1;
            }
            used.insert(var.clone());
            vars.push(var);
            by_id.entry(obj.id.as_str()).or_insert(i);
        }
        Self { vars, by_id }
    }

    fn for_target(&self, id: &str) -> Option<&str> {
        self.by_id.get(id).map(|&i| self.vars[i].as_str())
    }
}

/// File stem for a script: alphanumerics and `_`, at most 30 chars.
pub fn slug(title: &str) -> String {
    let base: String = title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(30)
        .collect();
    let base = base.trim_matches('_');
    if base.is_empty() {
        "animation".to_owned()
    } else {
        base.to_ascii_lowercase()
    }
}

fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Python literal for a JSON value.
fn py_literal(v: &Value) -> String {
    match v {
        Value::Null => "None".to_owned(),
        Value::Bool(true) => "True".to_owned(),
        Value::Bool(false) => "False".to_owned(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => py_str(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(py_literal).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", py_str(k), py_literal(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
    }
}

fn param_literal(params: &Params, key: &str, default: &str) -> String {
    params
        .get(key)
        .map(py_literal)
        .unwrap_or_else(|| default.to_owned())
}

/// Manim color constants (`YELLOW`) are emitted bare, anything else as a string.
fn color_literal(params: &Params) -> String {
    match params.get("color") {
        None => "WHITE".to_owned(),
        Some(Value::String(s))
            if !s.is_empty()
                && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') =>
        {
            s.clone()
        }
        Some(other) => py_literal(other),
    }
}

/// Python source held in a string param, or `default` when absent.
fn code_param<'a>(params: &'a Params, key: &str, default: &'a str) -> &'a str {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default)
}

fn number(params: &Params, key: &str) -> Option<f64> {
    params.get(key).and_then(Value::as_f64)
}

fn emit_object(out: &mut String, obj: &SceneObject, var: &str) {
    let p = &obj.params;
    let ctor = match obj.kind {
        ObjectKind::Dot => format!("Dot(color={})", color_literal(p)),
        ObjectKind::Text => format!("Text({})", param_literal(p, "text", "''")),
        ObjectKind::Circle => format!("Circle(radius={})", param_literal(p, "radius", "0.7")),
        ObjectKind::Square => {
            format!("Square(side_length={})", param_literal(p, "side", "1.0"))
        }
        ObjectKind::Axes => format!(
            "Axes(x_range={}, y_range={})",
            param_literal(p, "x_range", "[0, 10]"),
            param_literal(p, "y_range", "[0, 5]")
        ),
        ObjectKind::ParametricFunction => format!(
            "ParametricFunction({}, t_range={})",
            code_param(p, "expr", "lambda t: np.array([t, 0, 0])"),
            param_literal(p, "t_range", "[0, 1]")
        ),
        ObjectKind::Vector => {
            format!("Vector({})", param_literal(p, "direction", "[1, 1]"))
        }
    };
    let _ = writeln!(out, "{INDENT}{var} = {ctor}");
    if obj.kind == ObjectKind::Axes {
        let _ = writeln!(out, "{INDENT}self.play(Create({var}), run_time=0.5)");
    }
}

fn scene_projectile(scene: &Scene) -> ProjectilePath {
    let physics = scene.params.get("physics").and_then(Value::as_object);
    let get = |key: &str, default: f64| {
        physics
            .and_then(|p| number(p, key))
            .unwrap_or(default)
    };
    projectile_path(
        get("v0", DEFAULT_V0),
        get("angle_degrees", DEFAULT_ANGLE_DEGREES),
        get("g", DEFAULT_G),
    )
}

fn emit_projectile(out: &mut String, path: &ProjectilePath) {
    let half_g = 0.5 * path.g;
    let _ = writeln!(
        out,
        "{INDENT}traj = ParametricFunction(lambda t: np.array([{:.4}*t, {:.4}*t - {half_g:.4}*t**2, 0]), t_range=[0, {:.4}])",
        path.vx, path.vy, path.t_end
    );
    let _ = writeln!(out, "{INDENT}ball = Dot(color=YELLOW)");
    let _ = writeln!(out, "{INDENT}self.play(FadeIn(ball))");
    let _ = writeln!(
        out,
        "{INDENT}self.play(MoveAlongPath(ball, traj), run_time={:.4})",
        path.t_end
    );
    let _ = writeln!(out, "{INDENT}self.wait(0.3)");
}

fn emit_actions(out: &mut String, scene: &Scene, vars: &SceneVars<'_>) {
    for action in &scene.actions {
        let Some(var) = vars.for_target(&action.target) else {
            tracing::debug!(
                scene = %scene.id,
                target = %action.target,
                "skipping action with unknown target"
            );
            continue;
        };
        let dur = number(&action.params, "duration").unwrap_or(DEFAULT_ACTION_DURATION);
        match action.kind {
            ActionKind::FadeIn | ActionKind::Create | ActionKind::FadeOut => {
                let _ = writeln!(
                    out,
                    "{INDENT}self.play({}({var}), run_time={dur})",
                    action.kind.as_str()
                );
            }
            ActionKind::MoveAlongPath => {
                let Some(path) = action
                    .params
                    .get("path")
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
                else {
                    continue;
                };
                let _ = writeln!(out, "{INDENT}p_{var} = {path}");
                let _ = writeln!(
                    out,
                    "{INDENT}self.play(MoveAlongPath({var}, p_{var}), run_time={dur})"
                );
            }
            ActionKind::Animate => {
                let _ = writeln!(out, "{INDENT}self.play(Indicate({var}), run_time={dur})");
            }
        }
    }
    let _ = writeln!(out, "{INDENT}self.wait(0.5)");
}

/// Generates a Manim CE script for `plan`; returns `(source, class_name)`.
pub fn generate_manim_code(plan: &Plan) -> (String, String) {
    let class = class_name(&plan.title);
    let mut out = String::new();
    out.push_str("from manim import *\nimport numpy as np\n\n");
    let _ = writeln!(out, "class {class}(Scene):");
    out.push_str("    def construct(self):\n");

    for scene in &plan.scenes {
        let vars = SceneVars::new(scene);
        for (obj, var) in scene.objects.iter().zip(&vars.vars) {
            emit_object(&mut out, obj, var);
        }
        if scene.is_projectile() {
            emit_projectile(&mut out, &scene_projectile(scene));
        } else {
            emit_actions(&mut out, scene, &vars);
        }
    }
    if plan.scenes.is_empty() {
        let _ = writeln!(out, "{INDENT}self.wait(0.5)");
    }
    (out, class)
}

/// Writes Manim scripts into a directory.
#[derive(Debug, Clone)]
pub struct ManimScriptRenderer {
    out_dir: PathBuf,
}

impl ManimScriptRenderer {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

impl Renderer for ManimScriptRenderer {
    fn render(&self, plan: &Plan) -> SynthResult<PathBuf> {
        let (code, class) = generate_manim_code(plan);
        fs::create_dir_all(&self.out_dir).map_err(|e| {
            SynthError::render(format!("create dir '{}': {e}", self.out_dir.display()))
        })?;
        let path = self.out_dir.join(format!("{}.py", slug(&plan.title)));
        fs::write(&path, code)
            .map_err(|e| SynthError::render(format!("write '{}': {e}", path.display())))?;
        tracing::info!(path = %path.display(), class = %class, "wrote manim script");
        Ok(path)
    }
}
