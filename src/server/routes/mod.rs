//! Route handlers module.

pub mod activities;
pub mod control;
pub mod health;
pub mod settings;
pub mod stats;
