//! API handlers module

pub mod crypto;
pub mod health;
