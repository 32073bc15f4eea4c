//! Outcome scorers

mod heuristic;

pub use heuristic::{EFFORT_FALLBACK, EMPTY_PAYLOAD, HeuristicScorer, NEAR_DEADLINE};
