//! Core modules for scout's store layer.
//!
//! Errors, configuration, logging, path normalization and the store
//! connector live here. The index repositories in [`crate::index`] build on
//! top of them.

pub mod config;
pub mod connector;
pub mod error;
pub mod logging;
pub mod model;
pub mod paths;
pub mod schemas;
pub mod time;
