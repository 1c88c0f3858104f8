//! Command implementations.

pub mod audit;
pub mod worker;
