//! Core business logic module
//!
//! Catalogs, selection, dependency resolution and build planning. Apart from
//! reading definition files and sketch sources, nothing here performs I/O;
//! downloads, archives and processes belong in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`properties`] - `key=value` documents and `{placeholder}` expansion
//! - [`version`] - Version ordering
//! - [`catalog`] - Index catalog of installable packages
//! - [`installed`] - Installed catalog scanned from the toolchain root
//! - [`boards`] - Board and programmer definitions
//! - [`selection`] - Selection slots and self-repair
//! - [`tooldeps`] - Host matching and tool dependency checks
//! - [`workspace`] - Selection state machine
//! - [`view`] - Render-ready snapshot of the workspace
//! - [`headers`] - Header index and include scanning
//! - [`resolver`] - Header-driven dependency closure
//! - [`project`] - Sketch and plain projects
//! - [`build_env`] - Build properties of the active toolchain
//! - [`recipe`] - Recipe expansion
//! - [`last_build`] - Last-build record
//! - [`planner`] - Incremental build plan
//! - [`size`] - Size report
//! - [`ide_import`] - Bundled IDE import

pub mod boards;
pub mod build_env;
pub mod catalog;
pub mod headers;
pub mod ide_import;
pub mod installed;
pub mod last_build;
pub mod planner;
pub mod project;
pub mod properties;
pub mod recipe;
pub mod resolver;
pub mod selection;
pub mod size;
pub mod tooldeps;
pub mod version;
pub mod view;
pub mod workspace;
