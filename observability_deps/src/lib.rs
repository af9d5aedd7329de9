//! This crate exists to manage dependencies around observability crates such as `tracing`,
//! ensuring that it is kept consistent across workspace member crates and that related crates
//! (and upgrades) are done in exactly one place rather than scattered across every crate that
//! wants to log something.
//!
//! Code in this crate should be limited to re-exports and thin wrappers.

pub use tracing;
