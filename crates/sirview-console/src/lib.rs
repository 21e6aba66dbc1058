//! Terminal front end for the SIR simulation service.
//!
//! The interactive console draws the agent canvas and the S/I/R chart and
//! takes slash commands; the headless commands print to stdout for scripts.

pub mod cli;
pub mod config;
pub mod console;
pub mod headless;
pub mod logging;
pub mod render;
pub mod session;

pub use config::{ConfigError, ViewerConfig};
pub use session::{ParamError, Session, SessionSettings};
