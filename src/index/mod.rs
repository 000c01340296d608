//! The index proper: directory hierarchy and file metadata, plus a facade
//! owning the connector both repositories borrow.

pub mod dirs;
pub mod files;
pub mod manager;
