//! # CrowdShield Core
//!
//! Domain types and the risk classification logic shared by the
//! CrowdShield backend. This crate is pure: no I/O, no async, no
//! shared state. The API crate wires these types into the HTTP and
//! websocket surface.

pub mod error;
pub mod risk;
pub mod types;

pub use error::{Error, Result};
pub use risk::{compute_risk, RiskAssessment};
pub use types::*;
