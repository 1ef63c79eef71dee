/// Hint keywords that mark a scene as projectile motion.
pub const MOTION_KEYWORDS: [&str; 5] = ["projectile", "trajectory", "parabolic", "parabola", "launch"];

pub const DEFAULT_V0: f64 = 12.0;
pub const DEFAULT_ANGLE_DEGREES: f64 = 45.0;
pub const DEFAULT_G: f64 = 9.81;

/// `(key, default)` pairs filled into `params.physics`, in fill order.
pub const PHYSICS_DEFAULTS: [(&str, f64); 3] = [
    ("v0", DEFAULT_V0),
    ("angle_degrees", DEFAULT_ANGLE_DEGREES),
    ("g", DEFAULT_G),
];

pub fn hint_requests_physics(hint: &str) -> bool {
    let hint = hint.to_lowercase();
    MOTION_KEYWORDS.iter().any(|k| hint.contains(k))
}

/// Closed-form projectile motion sampled by renderers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectilePath {
    pub vx: f64,
    pub vy: f64,
    pub g: f64,
    /// Flight time until the projectile returns to launch height (>= 0.5).
    pub t_end: f64,
}

impl ProjectilePath {
    /// Position at time `t`: `x = vx*t`, `y = vy*t - g*t^2/2`.
    pub fn at(&self, t: f64) -> (f64, f64) {
        (self.vx * t, self.vy * t - 0.5 * self.g * t * t)
    }
}

pub fn projectile_path(v0: f64, angle_degrees: f64, g: f64) -> ProjectilePath {
    let theta = angle_degrees.to_radians();
    let vx = v0 * theta.cos();
    let vy = v0 * theta.sin();
    let t_end = if g != 0.0 { 2.0 * vy / g } else { 3.0 };
    ProjectilePath {
        vx,
        vy,
        g,
        t_end: t_end.max(0.5),
    }
}
