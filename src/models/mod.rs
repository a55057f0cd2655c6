// src/models/mod.rs

pub mod exam;
pub mod practice_log;
pub mod report;
pub mod student;
