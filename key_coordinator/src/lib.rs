//! The Key Coordinator: conflict resolution, the input consumer loop, the processing loop, and
//! the output producer.
//!
//! [`coordinator::KeyCoordinator`] is the public entrypoint; it wires the pieces in this crate
//! together with a [`kv_store::ContextStore`] and a [`log_client`] input/output log pair.
#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]
#![warn(missing_debug_implementations, clippy::clone_on_ref_ptr)]

mod config;
mod consumer;
mod coordinator;
mod error;
mod lifecycle;
mod processor;
mod resolver;

pub use config::ProcessingConfig;
pub use coordinator::KeyCoordinator;
pub use error::CoordinatorError;
pub use lifecycle::{RunState, ShutdownHandle};
pub use resolver::{ConflictResolver, TimestampThenOffsetResolver};
