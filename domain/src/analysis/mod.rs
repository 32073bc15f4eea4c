//! Expert analysis subdomain: effort levels and analysis inputs/outputs.

pub mod effort;
pub mod value_objects;

pub use effort::{EffortLevel, EffortResolution, EffortSource};
pub use value_objects::{AnalysisContext, AnalysisResult};
