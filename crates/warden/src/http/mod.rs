//! HTTP facade for the executor and notifier.

pub mod route;

pub use route::{router, ApiState};
