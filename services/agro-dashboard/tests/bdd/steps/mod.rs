//! BDD step definitions for the agro dashboard

pub mod gating_steps;
pub mod lifecycle_steps;
