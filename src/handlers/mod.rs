// src/handlers/mod.rs

pub mod auth;
pub mod exams;
pub mod practice;
pub mod reports;
pub mod students;
