use crate::foundation::error::{SynthError, SynthResult};
use crate::plan::model::{ActionKind, ObjectKind};

/// Builds the full instruction prompt for `request`.
///
/// Deterministic: the same request always yields the same prompt.
pub fn build_prompt(request: &str) -> SynthResult<String> {
    let request = request.trim();
    if request.is_empty() {
        return Err(SynthError::prompt("request text is empty"));
    }
    Ok(format!("{}\n\nUser request:\n{request}", instruction()))
}

fn quoted_list(names: impl IntoIterator<Item = &'static str>) -> String {
    names
        .into_iter()
        .map(|n| format!("\"{n}\""))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn instruction() -> String {
    let object_types = quoted_list(ObjectKind::ALL.map(ObjectKind::as_str));
    let action_types = quoted_list(ActionKind::ALL.map(ActionKind::as_str));
    format!(
        r#"You MUST output ONLY valid JSON. No markdown, no comments, no surrounding text.
Produce a scene-by-scene animation plan that can be converted automatically into Manim CE code.

Schema:
{{
  "title": "string",
  "description": "string",
  "scenes": [
    {{
      "id": "string",
      "title": "string",
      "hint": "string",
      "objects": [
        {{
          "id": "string",
          "type": {object_types},
          "params": {{}}
        }}
      ],
      "actions": [
        {{
          "type": {action_types},
          "target": "<object id>",
          "params": {{}}
        }}
      ],
      "params": {{}},
      "narration": "string"
    }}
  ]
}}

Constraints:
- "title", "description" and a non-empty "scenes" list are required.
- Object ids are unique within a scene; every action "target" names one of them.
- For physics scenes (hint mentions projectile, trajectory or parabola) include
  "params": {{"physics": {{"v0": <float m/s>, "angle_degrees": <float>, "g": <float, default 9.81>}}}}.
- Put the JSON answer first.

If you cannot produce valid JSON, output: {{}}"#
    )
}
