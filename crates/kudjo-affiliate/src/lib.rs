pub mod affiliate;
pub mod config;
pub mod error;
pub mod telemetry;
