//! Core domain types and logic.

pub mod bar;
pub mod condition;
pub mod condition_eval;
pub mod condition_parser;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod scanner;
pub mod simulator;
pub mod strategy;
pub mod summary;
pub mod symbol;
pub mod trade;
