//! Semantic dictionary: free-text object names mapped onto concrete renderer types.
//!
//! Entry order matters: substring resolution walks the table top to bottom and takes the
//! first key contained in the requested type.

use serde_json::{Value, json};

use crate::plan::model::{ObjectKind, Params};

#[derive(Debug, Clone, Copy)]
pub struct SemanticEntry {
    pub word: &'static str,
    pub kind: ObjectKind,
    defaults: fn() -> Params,
}

impl SemanticEntry {
    /// Default params merged into a resolved object (existing keys win).
    pub fn defaults(&self) -> Params {
        (self.defaults)()
    }
}

fn no_defaults() -> Params {
    Params::new()
}

fn planet_defaults() -> Params {
    params_of(json!({"radius": 0.25}))
}

fn ball_defaults() -> Params {
    params_of(json!({"color": "YELLOW"}))
}

fn params_of(v: Value) -> Params {
    match v {
        Value::Object(map) => map,
        _ => Params::new(),
    }
}

const ENTRIES: &[SemanticEntry] = &[
    SemanticEntry {
        word: "planet",
        kind: ObjectKind::Circle,
        defaults: planet_defaults,
    },
    SemanticEntry {
        word: "ball",
        kind: ObjectKind::Dot,
        defaults: ball_defaults,
    },
    SemanticEntry {
        word: "dot",
        kind: ObjectKind::Dot,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "point",
        kind: ObjectKind::Dot,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "trajectory",
        kind: ObjectKind::ParametricFunction,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "path",
        kind: ObjectKind::ParametricFunction,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "curve",
        kind: ObjectKind::ParametricFunction,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "graph",
        kind: ObjectKind::Axes,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "axes",
        kind: ObjectKind::Axes,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "label",
        kind: ObjectKind::Text,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "arrow",
        kind: ObjectKind::Vector,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "vector",
        kind: ObjectKind::Vector,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "circle",
        kind: ObjectKind::Circle,
        defaults: no_defaults,
    },
    SemanticEntry {
        word: "square",
        kind: ObjectKind::Square,
        defaults: no_defaults,
    },
];

pub fn entries() -> &'static [SemanticEntry] {
    ENTRIES
}

/// Case-insensitive exact lookup.
pub fn lookup_exact(word: &str) -> Option<&'static SemanticEntry> {
    let key = word.trim().to_lowercase();
    ENTRIES.iter().find(|e| e.word == key)
}

/// First entry (in table order) whose word occurs inside `word`, case-insensitively.
pub fn lookup_contained(word: &str) -> Option<&'static SemanticEntry> {
    let key = word.trim().to_lowercase();
    ENTRIES.iter().find(|e| key.contains(e.word))
}
