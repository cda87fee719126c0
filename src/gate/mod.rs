//! Release gate evaluation.
//!
//! A team's gate for a release is open while its open-bug backlog stays within
//! thresholds derived from the team's headcount.

pub mod evaluator;
mod team;

pub use team::{load_team_gate, TeamGate};
