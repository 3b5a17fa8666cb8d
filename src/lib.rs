//! personasplit - split an agent configuration tree into core and persona
//!
//! Walks a `.claude`-style directory (agents, skills, rules, styles, the root
//! directive and settings files), classifies every file and section against a
//! rule registry, and produces a brand-neutral core corpus plus a persona
//! manifest and slot registry describing everything that was cut out.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod manifest;
pub mod orchestrator;
pub mod parser;
pub mod rules;
pub mod slotifier;
pub mod slots;

pub use error::{Result, SplitError};
