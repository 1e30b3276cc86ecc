//! Core domain types and logic.

pub mod config_validation;
pub mod engine;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod merger;
pub mod portfolio;
pub mod position;
pub mod price_series;
pub mod quote;
pub mod signal;
pub mod strategy;
pub mod universe;
