// src/utils/mod.rs

pub mod access;
pub mod hash;
pub mod html;
pub mod session;
