use serde_json::{Map, Value};

/// Free-form parameter mapping carried by scenes, objects and actions.
pub type Params = Map<String, Value>;

/// Root of a normalized scene plan.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Plan {
    pub title: String,
    pub description: String,
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub meta: PlanMeta,
    /// Top-level keys outside the schema, kept verbatim.
    #[serde(flatten)]
    pub extra: Params,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanMeta {
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(flatten)]
    pub extra: Params,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Scene {
    pub id: String,
    pub title: String,
    pub hint: String,
    pub objects: Vec<SceneObject>,
    pub actions: Vec<Action>,
    pub params: Params,
    pub narration: String,
    #[serde(flatten)]
    pub extra: Params,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SceneObject {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub params: Params,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    /// Id of a [`SceneObject`] in the same scene. Not checked during validation.
    pub target: String,
    pub params: Params,
}

/// Concrete renderer object types. Extending this set is a schema change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ObjectKind {
    Axes,
    Dot,
    Circle,
    Square,
    ParametricFunction,
    Text,
    Vector,
}

impl ObjectKind {
    pub const ALL: [ObjectKind; 7] = [
        ObjectKind::Axes,
        ObjectKind::Circle,
        ObjectKind::Dot,
        ObjectKind::ParametricFunction,
        ObjectKind::Square,
        ObjectKind::Text,
        ObjectKind::Vector,
    ];

    /// The primitive placeholder used when a type cannot be resolved.
    pub const PRIMITIVE: ObjectKind = ObjectKind::Dot;

    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Axes => "Axes",
            ObjectKind::Dot => "Dot",
            ObjectKind::Circle => "Circle",
            ObjectKind::Square => "Square",
            ObjectKind::ParametricFunction => "ParametricFunction",
            ObjectKind::Text => "Text",
            ObjectKind::Vector => "Vector",
        }
    }

    /// Exact (case-sensitive) match against the concrete type names.
    pub fn from_concrete(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ActionKind {
    FadeIn,
    Create,
    MoveAlongPath,
    FadeOut,
    /// Generic animate.
    Animate,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        ActionKind::FadeIn,
        ActionKind::Create,
        ActionKind::MoveAlongPath,
        ActionKind::FadeOut,
        ActionKind::Animate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::FadeIn => "FadeIn",
            ActionKind::Create => "Create",
            ActionKind::MoveAlongPath => "MoveAlongPath",
            ActionKind::FadeOut => "FadeOut",
            ActionKind::Animate => "Animate",
        }
    }

    /// Loose match: case-insensitive, ignoring `-`, `_` and whitespace.
    pub fn parse_loose(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str().to_ascii_lowercase() == folded)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    High,
    Low,
}

impl Confidence {
    pub fn from_auto_filled(auto_filled: bool) -> Self {
        if auto_filled {
            Confidence::Low
        } else {
            Confidence::High
        }
    }
}

impl Scene {
    /// True when the hint names projectile-style motion.
    pub fn is_projectile(&self) -> bool {
        crate::plan::physics::hint_requests_physics(&self.hint)
    }
}
