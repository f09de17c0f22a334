//! Payroll contribution batch engine.
//!
//! This crate runs the payroll pipeline of a defined-contribution
//! retirement plan: participant eligibility, contribution calculation and
//! deduction registration with a benefits provider, plus a separate job
//! synchronizing participants from an HR directory. Eligibility and
//! calculation logic lives in YAML rule definitions compiled by a
//! hot-reloadable rule engine.

#![warn(missing_docs)]

pub mod batch;
pub mod config;
pub mod error;
pub mod external;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod stages;
pub mod storage;
