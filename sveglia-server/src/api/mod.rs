//! HTTP API for the alarm registry.

pub mod server;
pub mod v0;

pub use server::{SharedState, serve};
