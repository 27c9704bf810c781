//! Sveglia: a server-resident daily alarm clock.
//!
//! The daemon keeps an in-memory alarm registry, polls the wall clock to
//! fire due alarms through a best-effort notification chain, and exposes
//! the registry over a small HTTP API. A keep-alive loop asserts activity
//! to the host so aggressive power management (Termux/Android in
//! particular) does not starve the scheduler.

pub mod api;
pub mod api_client;
pub mod clock;
pub mod config;
pub mod error;
mod host;
pub mod notify;
pub mod registry;
pub mod scheduler;
pub mod storage;
pub mod tracing;
pub mod wake;
