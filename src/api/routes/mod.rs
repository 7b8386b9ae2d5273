//! API Routes

pub mod chart;
pub mod health;
