// src/scoring/mod.rs

pub mod aggregate;
pub mod battle;
pub mod week;
