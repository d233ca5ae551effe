//! Database entities

pub mod fazenda;
pub mod seed_control;
