//! Sketchforge - Arduino-style multi-vendor toolchain manager and builder
//!
//! This library keeps a catalog of installable hardware platforms and tools,
//! tracks the user's board selection, resolves library dependencies from
//! `#include` directives and plans incremental builds from platform recipes.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`cli`] - Command-line interface parsing and output formatting
//! - [`core`] - Business logic (catalogs, selection, resolver, planner)
//! - [`infra`] - Infrastructure layer (network, archives, filesystem, processes)
//! - [`runtime`] - Task queues, state actor and background pollers
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod infra;
pub mod runtime;

#[cfg(test)]
pub mod test_utils;
