//! Attempt-log and plan persistence.

pub mod sink;

pub use sink::{FileSink, InMemorySink, PlanSink};
