//! Rule-based matching engine for clinical trials and approved treatments.
//!
//! The crate compares a structured subject profile (patient or researcher
//! trial) against catalog records and produces ranked, explained results:
//! per-criterion score contributions, an eligibility tier, and competitive
//! similarity with market-level aggregates. Free-text parsing, criteria
//! extraction, and catalog persistence belong to external collaborators and
//! enter only through the traits in [`matching::repository`].

pub mod config;
pub mod error;
pub mod matching;
pub mod telemetry;
