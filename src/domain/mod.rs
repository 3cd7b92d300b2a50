//! Core domain types and logic.

pub mod bar;
pub mod signal;
pub mod position;
pub mod ledger;
pub mod execution;
pub mod portfolio;
pub mod backtest;
pub mod indicator_helpers;
pub mod squeeze;
pub mod strategy;
pub mod synthetic;
pub mod monte_carlo;
pub mod metrics;
pub mod config_validation;
pub mod error;
