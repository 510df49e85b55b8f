//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod guard;
pub mod http;
pub mod storage;
pub mod telemetry;
