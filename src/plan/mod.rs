//! Scene plan schema, semantic dictionary and the validator/normalizer.

pub mod dictionary;
pub mod model;
pub mod physics;
pub mod validate;
