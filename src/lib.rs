//! Allocation and eligibility engine for BTO housing projects, exposed as a
//! small HTTP service with a CLI wrapper.

pub mod allocation;
pub mod config;
pub mod error;
pub mod telemetry;
