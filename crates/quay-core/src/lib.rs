#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

//! Core engine for quay, a minimal npm-style package manager.
//!
//! The interesting work lives under [`pkg`]: specifier resolution against
//! a registry, a flat-tree package installer, structural validation of
//! installed packages, and the graph walker that ties them together.

pub mod config;
pub mod pkg;

pub use config::Config;

/// Crate version, reported by `quay --version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
