//! Command implementations

pub mod agent;
pub mod serve;
