#[macro_use]
extern crate lazy_static;
extern crate tracing;

pub mod cli;
pub mod controls;
pub mod helper;
pub mod logger;
pub mod settings;
pub mod telemetry;
pub mod wifi;
