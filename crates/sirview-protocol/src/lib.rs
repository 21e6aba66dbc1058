//! SIRVIEW Protocol - Core types and message definitions
//!
//! Describes what the remote SIR simulation service produces (frames of
//! agents and aggregate S/I/R samples) and what the viewer sends it (a
//! parameter snapshot), plus the integrity checks applied before any decoded
//! payload reaches the rest of the client.

pub mod constants;
pub mod error;
pub mod integrity;
pub mod messages;
pub mod types;

pub use constants::*;
pub use error::*;
pub use integrity::{check_run_result, check_sample};
pub use messages::*;
pub use types::*;
