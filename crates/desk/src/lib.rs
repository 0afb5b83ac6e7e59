//! `circulate-desk`
//!
//! **Responsibility:** the circulation desk — the application service a front
//! end (GUI, CLI, tests) calls into.
//!
//! This crate provides:
//! - [`Desk`]: owns the catalog, member registry and loan ledger, and drives
//!   the loan lifecycle end to end
//! - the observation channel wiring (event bus + tracing)
//! - the sample library fixture and a small demo binary
//!
//! The desk is a **thin orchestrator**: all decisions live in the domain
//! crates; the desk resolves lookups, commits events, and reports.

pub mod desk;
pub mod seed;

pub use desk::{Desk, FeeLine, ReturnReceipt};
