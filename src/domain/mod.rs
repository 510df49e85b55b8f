//! Domain types for a single render run.

pub mod artifacts;
