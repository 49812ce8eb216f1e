//! turtle: dual-system trend-following decision engine.
//!
//! Hexagonal architecture: the engine and its value types live in [`domain`], port traits in
//! [`ports`], concrete collaborators (CSV data, INI config, paper fills) in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
