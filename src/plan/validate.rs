//! Structural validation and normalization of recovered plan JSON.
//!
//! Works on arbitrary `serde_json::Value` input. Hard errors (non-object root, missing or
//! mistyped top-level keys, empty scene list) reject the plan; everything else is repaired
//! in place and reported as a warning or info line, with `auto_filled` set.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value, json};

use crate::foundation::error::{SynthError, SynthResult};
use crate::plan::dictionary;
use crate::plan::model::{ActionKind, Confidence, ObjectKind, Plan};
use crate::plan::physics::{PHYSICS_DEFAULTS, hint_requests_physics};

pub const REQUIRED_TOP_LEVEL: [&str; 3] = ["title", "description", "scenes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathElem {
    Field(&'static str),
    Index(usize),
}

fn format_path(path: &[PathElem]) -> String {
    let mut s = String::from("$");
    for p in path {
        match *p {
            PathElem::Field(name) => {
                s.push('.');
                s.push_str(name);
            }
            PathElem::Index(i) => {
                s.push('[');
                s.push_str(&i.to_string());
                s.push(']');
            }
        }
    }
    s
}

fn at(path: &[PathElem], msg: impl fmt::Display) -> String {
    format!("{}: {msg}", format_path(path))
}

/// Outcome record of one validation pass.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostics {
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub info: Vec<String>,
    pub auto_filled: bool,
    pub confidence: Confidence,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            success: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            info: Vec::new(),
            auto_filled: false,
            confidence: Confidence::High,
        }
    }
}

impl Diagnostics {
    fn error(&mut self, msg: String) {
        self.errors.push(msg);
    }

    /// Records a degraded guess. Always marks the plan as auto-filled.
    fn warn_filled(&mut self, msg: String) {
        self.warnings.push(msg);
        self.auto_filled = true;
    }

    /// Records a structural repair. Always marks the plan as auto-filled.
    fn info_filled(&mut self, msg: String) {
        self.info.push(msg);
        self.auto_filled = true;
    }

    fn finish(mut self) -> Self {
        self.success = self.errors.is_empty();
        self.confidence = Confidence::from_auto_filled(self.auto_filled);
        self
    }
}

/// Normalized plan JSON plus the diagnostics that produced it.
#[derive(Debug, Clone)]
pub struct Validation {
    /// The normalized document, or the untouched input when a hard error stopped the pass.
    pub plan: Value,
    pub diagnostics: Diagnostics,
}

impl Validation {
    pub fn is_success(&self) -> bool {
        self.diagnostics.success
    }

    /// Converts an accepted document into a typed [`Plan`], stamping `meta.confidence`.
    pub fn into_plan(self) -> SynthResult<Plan> {
        if !self.diagnostics.success {
            return Err(SynthError::validation(self.diagnostics.errors.join("; ")));
        }
        let Value::Object(mut root) = self.plan else {
            return Err(SynthError::validation("plan is not a JSON object"));
        };

        let confidence = serde_json::to_value(self.diagnostics.confidence)?;
        match root.get_mut("meta") {
            Some(Value::Object(meta)) => {
                meta.insert("confidence".to_owned(), confidence);
            }
            _ => {
                root.insert("meta".to_owned(), json!({ "confidence": confidence }));
            }
        }

        serde_json::from_value(Value::Object(root)).map_err(|e| {
            SynthError::validation(format!("normalized plan does not match schema: {e}"))
        })
    }
}

/// Validates `plan`, repairs what can be repaired, and reports what was done.
pub fn validate_and_fill(plan: Value) -> Validation {
    let mut diag = Diagnostics::default();

    let mut root = match plan {
        Value::Object(map) => map,
        other => {
            diag.error("plan is not a JSON object".to_owned());
            return Validation {
                plan: other,
                diagnostics: diag.finish(),
            };
        }
    };

    for key in REQUIRED_TOP_LEVEL {
        if !root.contains_key(key) {
            diag.error(format!("missing top-level key: {key}"));
        }
    }
    for key in ["title", "description"] {
        if let Some(v) = root.get(key)
            && !v.is_string()
        {
            diag.error(format!("top-level key '{key}' must be a string"));
        }
    }
    if diag.errors.is_empty() {
        match root.get("scenes") {
            Some(Value::Array(scenes)) if !scenes.is_empty() => {}
            _ => diag.error("plan.scenes must be a non-empty list".to_owned()),
        }
    }
    if !diag.errors.is_empty() {
        tracing::debug!(errors = diag.errors.len(), "plan rejected");
        return Validation {
            plan: Value::Object(root),
            diagnostics: diag.finish(),
        };
    }

    if let Some(Value::Array(scenes)) = root.get_mut("scenes") {
        let mut scene_ids = HashSet::<String>::new();
        for (i, scene) in scenes.iter_mut().enumerate() {
            let mut path = vec![PathElem::Field("scenes"), PathElem::Index(i)];
            normalize_scene(scene, i, &mut path, &mut scene_ids, &mut diag);
        }
    }

    let diagnostics = diag.finish();
    tracing::debug!(
        warnings = diagnostics.warnings.len(),
        auto_filled = diagnostics.auto_filled,
        "plan accepted"
    );
    Validation {
        plan: Value::Object(root),
        diagnostics,
    }
}

fn non_empty_str(v: Option<&Value>) -> Option<&str> {
    v.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// Returns `base`, or `base_<n>` for the smallest n >= 2 not yet taken, and reserves it.
fn reserve_unique(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_owned()) {
        return base.to_owned();
    }
    let mut n = 2usize;
    loop {
        let candidate = format!("{base}_{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn empty_scene(id: &str) -> Value {
    json!({
        "id": id,
        "title": id,
        "hint": "",
        "objects": [],
        "actions": [],
        "params": {},
        "narration": "",
    })
}

fn normalize_scene(
    scene: &mut Value,
    index: usize,
    path: &mut Vec<PathElem>,
    taken_ids: &mut HashSet<String>,
    diag: &mut Diagnostics,
) {
    if !scene.is_object() {
        let id = reserve_unique(&format!("scene_{index}"), taken_ids);
        diag.warn_filled(at(
            path,
            format!("scene is not an object; replaced with empty scene '{id}'"),
        ));
        *scene = empty_scene(&id);
        return;
    }
    let Value::Object(map) = scene else {
        return;
    };

    // id <-> title
    let id = match non_empty_str(map.get("id")) {
        Some(id) => id.to_owned(),
        None => {
            let derived = match non_empty_str(map.get("title")) {
                Some(title) => title.trim().to_lowercase().replace(' ', "_"),
                None => format!("scene_{index}"),
            };
            diag.info_filled(at(path, format!("synthesized scene id '{derived}'")));
            derived
        }
    };
    let unique = reserve_unique(&id, taken_ids);
    if unique != id {
        diag.warn_filled(at(path, format!("duplicate scene id '{id}' renamed to '{unique}'")));
    }
    if map.get("id").and_then(Value::as_str) != Some(unique.as_str()) {
        map.insert("id".to_owned(), Value::String(unique.clone()));
    }
    if non_empty_str(map.get("title")).is_none() {
        map.insert("title".to_owned(), Value::String(unique.clone()));
        diag.info_filled(at(path, "title defaulted to scene id"));
    }

    for key in ["hint", "narration"] {
        if !map.get(key).is_some_and(Value::is_string) {
            map.insert(key.to_owned(), Value::String(String::new()));
            diag.info_filled(at(path, format!("{key} defaulted to \"\"")));
        }
    }
    if !map.get("params").is_some_and(Value::is_object) {
        map.insert("params".to_owned(), Value::Object(Map::new()));
        diag.info_filled(at(path, "params defaulted to {}"));
    }
    for key in ["objects", "actions"] {
        if !map.get(key).is_some_and(Value::is_array) {
            map.insert(key.to_owned(), Value::Array(Vec::new()));
            diag.info_filled(at(path, format!("{key} defaulted to []")));
        }
    }

    if let Some(Value::Array(objects)) = map.get_mut("objects") {
        let mut object_ids = HashSet::<String>::new();
        for (j, obj) in objects.iter_mut().enumerate() {
            path.push(PathElem::Field("objects"));
            path.push(PathElem::Index(j));
            normalize_object(obj, j, path, &mut object_ids, diag);
            path.pop();
            path.pop();
        }
    }

    if let Some(Value::Array(actions)) = map.get_mut("actions") {
        normalize_actions(actions, path, diag);
    }

    fill_physics(map, path, diag);
}

fn normalize_object(
    obj: &mut Value,
    index: usize,
    path: &[PathElem],
    taken_ids: &mut HashSet<String>,
    diag: &mut Diagnostics,
) {
    if !obj.is_object() {
        let id = reserve_unique(&format!("obj_{index}"), taken_ids);
        diag.warn_filled(at(
            path,
            format!("object is not an object; replaced with Dot '{id}'"),
        ));
        *obj = json!({ "id": id, "type": ObjectKind::PRIMITIVE.as_str(), "params": {} });
        return;
    }
    let Value::Object(map) = obj else {
        return;
    };

    let id = match non_empty_str(map.get("id")) {
        Some(id) => id.to_owned(),
        None => {
            let synthesized = format!("obj_{index}");
            diag.info_filled(at(path, format!("synthesized object id '{synthesized}'")));
            synthesized
        }
    };
    let unique = reserve_unique(&id, taken_ids);
    if unique != id {
        diag.warn_filled(at(path, format!("duplicate object id '{id}' renamed to '{unique}'")));
    }
    if map.get("id").and_then(Value::as_str) != Some(unique.as_str()) {
        map.insert("id".to_owned(), Value::String(unique.clone()));
    }

    if !map.get("params").is_some_and(Value::is_object) {
        map.insert("params".to_owned(), Value::Object(Map::new()));
        diag.info_filled(at(path, "params defaulted to {}"));
    }

    let requested = map
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    let resolved = resolve_object_type(&requested, &unique, path, diag);
    if map.get("type").and_then(Value::as_str) != Some(resolved.kind.as_str()) {
        map.insert(
            "type".to_owned(),
            Value::String(resolved.kind.as_str().to_owned()),
        );
        diag.auto_filled = true;
    }

    if let Some(Value::Object(params)) = map.get_mut("params") {
        for (k, v) in resolved.defaults {
            params.entry(k).or_insert(v);
        }
    }
}

struct ResolvedType {
    kind: ObjectKind,
    defaults: Map<String, Value>,
}

impl ResolvedType {
    fn bare(kind: ObjectKind) -> Self {
        Self {
            kind,
            defaults: Map::new(),
        }
    }
}

fn resolve_object_type(
    requested: &str,
    object_id: &str,
    path: &[PathElem],
    diag: &mut Diagnostics,
) -> ResolvedType {
    let primitive = ObjectKind::PRIMITIVE.as_str();
    if requested.is_empty() {
        diag.warn_filled(at(
            path,
            format!("object '{object_id}' missing type; defaulting to {primitive}"),
        ));
        return ResolvedType::bare(ObjectKind::PRIMITIVE);
    }
    if let Some(kind) = ObjectKind::from_concrete(requested) {
        return ResolvedType::bare(kind);
    }

    let entry = dictionary::lookup_exact(requested).or_else(|| dictionary::lookup_contained(requested));
    match entry {
        Some(entry) => {
            diag.info.push(at(
                path,
                format!(
                    "mapped semantic '{requested}' -> '{}' for object '{object_id}'",
                    entry.kind.as_str()
                ),
            ));
            ResolvedType {
                kind: entry.kind,
                defaults: entry.defaults(),
            }
        }
        None => {
            diag.warn_filled(at(
                path,
                format!(
                    "unsupported object type '{requested}' -> defaulting to {primitive} for object '{object_id}'"
                ),
            ));
            ResolvedType::bare(ObjectKind::PRIMITIVE)
        }
    }
}

fn normalize_actions(actions: &mut Vec<Value>, scene_path: &[PathElem], diag: &mut Diagnostics) {
    let before = actions.len();
    actions.retain(Value::is_object);
    if actions.len() != before {
        diag.warn_filled(at(
            scene_path,
            format!("dropped {} non-object action(s)", before - actions.len()),
        ));
    }

    for (k, action) in actions.iter_mut().enumerate() {
        let Value::Object(map) = action else {
            continue;
        };
        let path = [scene_path, &[PathElem::Field("actions"), PathElem::Index(k)]].concat();

        let requested = map.get("type").and_then(Value::as_str).unwrap_or_default();
        let kind = match ActionKind::parse_loose(requested) {
            Some(kind) => {
                if requested != kind.as_str() {
                    diag.info_filled(at(
                        &path,
                        format!("action type '{requested}' normalized to '{}'", kind.as_str()),
                    ));
                }
                kind
            }
            None => {
                diag.warn_filled(at(
                    &path,
                    format!("unsupported action type '{requested}' -> defaulting to Animate"),
                ));
                ActionKind::Animate
            }
        };
        map.insert("type".to_owned(), Value::String(kind.as_str().to_owned()));

        match map.get("target") {
            Some(Value::String(_)) => {}
            Some(Value::Number(n)) => {
                let target = n.to_string();
                diag.info_filled(at(&path, format!("numeric action target {target} stringified")));
                map.insert("target".to_owned(), Value::String(target));
            }
            _ => {
                map.insert("target".to_owned(), Value::String(String::new()));
                diag.warn_filled(at(&path, "action target missing; defaulted to \"\""));
            }
        }
        if !map.get("params").is_some_and(Value::is_object) {
            map.insert("params".to_owned(), Value::Object(Map::new()));
            diag.info_filled(at(&path, "params defaulted to {}"));
        }
    }
}

fn fill_physics(scene: &mut Map<String, Value>, path: &[PathElem], diag: &mut Diagnostics) {
    let hint = scene.get("hint").and_then(Value::as_str).unwrap_or_default();
    if !hint_requests_physics(hint) {
        return;
    }
    let title = scene
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned();

    let Some(Value::Object(params)) = scene.get_mut("params") else {
        return;
    };
    let physics = params
        .entry("physics")
        .or_insert_with(|| Value::Object(Map::new()));
    if !physics.is_object() {
        diag.warn_filled(at(path, "params.physics is not an object; replaced"));
        *physics = Value::Object(Map::new());
    }
    let Value::Object(physics) = physics else {
        return;
    };

    for (key, default) in PHYSICS_DEFAULTS {
        match physics.get(key) {
            Some(v) if v.is_number() => {}
            Some(v) => {
                diag.warn_filled(at(
                    path,
                    format!("non-numeric {key}={v} replaced with {default:?} for scene '{title}'"),
                ));
                physics.insert(key.to_owned(), json!(default));
            }
            None => {
                diag.warn_filled(at(
                    path,
                    format!("auto-filled {key}={default:?} for scene '{title}'"),
                ));
                physics.insert(key.to_owned(), json!(default));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_ok() -> Value {
        json!({
            "title": "Orbit",
            "description": "a planet orbits",
            "scenes": [{
                "id": "s1",
                "title": "Intro",
                "hint": "",
                "objects": [{"id": "p", "type": "Circle", "params": {"radius": 1.0}}],
                "actions": [{"type": "FadeIn", "target": "p", "params": {}}],
                "params": {},
                "narration": "hello"
            }]
        })
    }

    #[test]
    fn complete_plan_is_high_confidence() {
        let v = validate_and_fill(minimal_ok());
        assert!(v.diagnostics.success);
        assert!(!v.diagnostics.auto_filled);
        assert_eq!(v.diagnostics.confidence, Confidence::High);
        assert_eq!(v.plan, minimal_ok());
    }

    #[test]
    fn rejects_non_object_root() {
        let v = validate_and_fill(json!([1, 2]));
        assert!(!v.diagnostics.success);
        assert_eq!(v.diagnostics.errors, vec!["plan is not a JSON object"]);
        assert_eq!(v.plan, json!([1, 2]));
    }

    #[test]
    fn rejects_each_missing_top_level_key() {
        for key in REQUIRED_TOP_LEVEL {
            let mut plan = minimal_ok();
            plan.as_object_mut().unwrap().remove(key);
            let v = validate_and_fill(plan);
            assert!(!v.diagnostics.success, "{key}");
            assert!(
                v.diagnostics
                    .errors
                    .iter()
                    .any(|e| e.contains(&format!("missing top-level key: {key}")))
            );
        }
    }

    #[test]
    fn rejects_empty_or_mistyped_scenes() {
        for scenes in [json!([]), json!({}), json!("scene")] {
            let mut plan = minimal_ok();
            plan["scenes"] = scenes;
            let v = validate_and_fill(plan);
            assert!(!v.diagnostics.success);
            assert!(v.diagnostics.errors[0].contains("non-empty list"));
        }
    }

    #[test]
    fn rejects_non_string_title() {
        let mut plan = minimal_ok();
        plan["title"] = json!(42);
        let v = validate_and_fill(plan);
        assert!(!v.diagnostics.success);
    }

    #[test]
    fn scene_shape_is_synthesized() {
        let plan = json!({
            "title": "t",
            "description": "d",
            "scenes": [{"title": "Free Fall", "objects": "nope"}]
        });
        let v = validate_and_fill(plan);
        assert!(v.diagnostics.success);
        assert!(v.diagnostics.auto_filled);
        let scene = &v.plan["scenes"][0];
        assert_eq!(scene["id"], "free_fall");
        assert_eq!(scene["objects"], json!([]));
        assert_eq!(scene["actions"], json!([]));
        assert_eq!(scene["params"], json!({}));
        assert_eq!(scene["hint"], "");
        assert_eq!(scene["narration"], "");
    }

    #[test]
    fn title_defaults_to_id() {
        let plan = json!({"title": "t", "description": "d", "scenes": [{"id": "only"}]});
        let v = validate_and_fill(plan);
        assert_eq!(v.plan["scenes"][0]["title"], "only");
    }

    #[test]
    fn non_object_scene_is_replaced() {
        let plan = json!({"title": "t", "description": "d", "scenes": [7]});
        let v = validate_and_fill(plan);
        assert!(v.diagnostics.success);
        assert_eq!(v.plan["scenes"][0]["id"], "scene_0");
        assert_eq!(v.diagnostics.warnings.len(), 1);
    }

    #[test]
    fn duplicate_scene_ids_get_suffixes() {
        let plan = json!({
            "title": "t",
            "description": "d",
            "scenes": [{"id": "a"}, {"id": "a"}, {"id": "a"}]
        });
        let v = validate_and_fill(plan);
        let ids: Vec<_> = v.plan["scenes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(ids, vec!["a", "a_2", "a_3"]);
    }

    #[test]
    fn object_ids_are_synthesized_by_index() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([{"type": "Dot"}, {"type": "Square"}]);
        let v = validate_and_fill(plan);
        assert_eq!(v.plan["scenes"][0]["objects"][0]["id"], "obj_0");
        assert_eq!(v.plan["scenes"][0]["objects"][1]["id"], "obj_1");
        assert!(v.diagnostics.auto_filled);
    }

    #[test]
    fn semantic_type_maps_and_keeps_caller_params() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([
            {"id": "p", "type": "planet", "params": {"radius": 2.0}},
            {"id": "b", "type": "BALL"}
        ]);
        let v = validate_and_fill(plan);
        let objects = &v.plan["scenes"][0]["objects"];
        assert_eq!(objects[0]["type"], "Circle");
        assert_eq!(objects[0]["params"]["radius"], 2.0);
        assert_eq!(objects[1]["type"], "Dot");
        assert_eq!(objects[1]["params"]["color"], "YELLOW");
        assert_eq!(v.diagnostics.info.iter().filter(|m| m.contains("mapped semantic")).count(), 2);
        assert!(v.diagnostics.warnings.is_empty());
    }

    #[test]
    fn semantic_type_by_containment() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([{"id": "x", "type": "red bouncing ball"}]);
        let v = validate_and_fill(plan);
        assert_eq!(v.plan["scenes"][0]["objects"][0]["type"], "Dot");
    }

    #[test]
    fn unknown_type_degrades_to_dot_with_warning() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([{"id": "x", "type": "spaceship"}]);
        let v = validate_and_fill(plan);
        assert!(v.diagnostics.success);
        assert_eq!(v.plan["scenes"][0]["objects"][0]["type"], "Dot");
        assert!(v.diagnostics.errors.is_empty());
        assert!(v.diagnostics.warnings[0].contains("unsupported object type 'spaceship'"));
        assert_eq!(v.diagnostics.confidence, Confidence::Low);
    }

    #[test]
    fn missing_type_degrades_to_dot_with_warning() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([{"id": "x"}]);
        let v = validate_and_fill(plan);
        assert_eq!(v.plan["scenes"][0]["objects"][0]["type"], "Dot");
        assert!(v.diagnostics.warnings[0].contains("missing type"));
    }

    #[test]
    fn warnings_carry_json_paths() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([{"id": "a", "type": "Dot"}, {"id": "x"}]);
        let v = validate_and_fill(plan);
        assert!(v.diagnostics.warnings[0].starts_with("$.scenes[0].objects[1]:"));
    }

    #[test]
    fn actions_are_normalized() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["actions"] = json!([
            {"type": "fade-in", "target": "p"},
            {"type": "explode", "target": "p", "params": {}},
            "garbage",
            {"type": "FadeOut"}
        ]);
        let v = validate_and_fill(plan);
        let actions = v.plan["scenes"][0]["actions"].as_array().unwrap();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0]["type"], "FadeIn");
        assert_eq!(actions[0]["params"], json!({}));
        assert_eq!(actions[1]["type"], "Animate");
        assert_eq!(actions[2]["target"], "");
        assert!(v.diagnostics.success);
    }

    #[test]
    fn numeric_action_target_is_stringified() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["objects"] = json!([{"id": "3", "type": "Dot", "params": {}}]);
        plan["scenes"][0]["actions"] = json!([{"type": "FadeIn", "target": 3, "params": {}}]);
        let v = validate_and_fill(plan);
        assert!(v.diagnostics.success);
        assert!(v.diagnostics.auto_filled);
        assert_eq!(v.plan["scenes"][0]["actions"][0]["target"], "3");

        let again = validate_and_fill(v.plan.clone());
        assert!(!again.diagnostics.auto_filled);
    }

    #[test]
    fn action_target_is_not_resolved() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["actions"] = json!([{"type": "Create", "target": "ghost", "params": {}}]);
        let v = validate_and_fill(plan);
        assert!(v.diagnostics.success);
        assert!(!v.diagnostics.auto_filled);
    }

    #[test]
    fn projectile_hint_fills_physics() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["hint"] = json!("projectile motion");
        let v = validate_and_fill(plan);
        let physics = &v.plan["scenes"][0]["params"]["physics"];
        assert_eq!(physics["v0"], 12.0);
        assert_eq!(physics["angle_degrees"], 45.0);
        assert_eq!(physics["g"], 9.81);
        assert!(v.diagnostics.auto_filled);
        assert_eq!(v.diagnostics.warnings.len(), 3);
    }

    #[test]
    fn supplied_physics_is_kept() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["hint"] = json!("launch");
        plan["scenes"][0]["params"] = json!({"physics": {"v0": 20.0, "angle_degrees": 30.0, "g": 1.62}});
        let v = validate_and_fill(plan);
        assert_eq!(v.plan["scenes"][0]["params"]["physics"]["v0"], 20.0);
        assert!(!v.diagnostics.auto_filled);
    }

    #[test]
    fn non_numeric_physics_is_replaced() {
        let mut plan = minimal_ok();
        plan["scenes"][0]["hint"] = json!("parabola");
        plan["scenes"][0]["params"] = json!({"physics": {"v0": "fast", "angle_degrees": 30, "g": 9.8}});
        let v = validate_and_fill(plan);
        assert_eq!(v.plan["scenes"][0]["params"]["physics"]["v0"], 12.0);
        assert_eq!(v.diagnostics.warnings.len(), 1);
    }

    #[test]
    fn validation_is_idempotent() {
        let messy = json!({
            "title": "t",
            "description": "d",
            "scenes": [
                {"title": "Throw", "hint": "projectile", "objects": [{"type": "ball"}, {"id": "x", "type": "???"}],
                 "actions": [{"type": "create", "target": "obj_0"}]},
                {"id": "throw"}
            ]
        });
        let first = validate_and_fill(messy);
        assert!(first.diagnostics.auto_filled);
        let second = validate_and_fill(first.plan.clone());
        assert!(second.diagnostics.success);
        assert!(!second.diagnostics.auto_filled);
        assert!(second.diagnostics.warnings.is_empty());
        assert_eq!(second.plan, first.plan);
    }

    #[test]
    fn into_plan_stamps_confidence() {
        let mut plan = minimal_ok();
        plan["meta"] = json!({"confidence": "certain", "model": "m"});
        plan["scenes"][0]["objects"][0]["type"] = json!("planet");
        let typed = validate_and_fill(plan).into_plan().unwrap();
        assert_eq!(typed.meta.confidence, Confidence::Low);
        assert_eq!(typed.meta.extra["model"], "m");
        assert_eq!(typed.scenes[0].objects[0].kind, ObjectKind::Circle);
    }

    #[test]
    fn into_plan_rejects_failed_validation() {
        let err = validate_and_fill(json!({"title": "t"})).into_plan().unwrap_err();
        assert!(err.to_string().contains("missing top-level key: description"));
    }
}
