//! Adapter for the desktop terminal's local API proxy.
//!
//! The proxy speaks JSON over HTTP on localhost: a readiness check at `/api/status`
//! and a single data endpoint at `/api/v1/data` that dispatches on the `E`
//! ("direction") member of the request envelope.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::UdfProvider;
