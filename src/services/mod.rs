// src/services/mod.rs

pub mod attempt;
