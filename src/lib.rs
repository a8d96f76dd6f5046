//! # Surplus Charge - solar surplus driven charging for Tesla vehicles
//!
//! Turns a household power surplus reading into a charge-current command
//! for the car, so that it soaks up excess production without drawing from
//! the grid.
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `transport`: HTTP transport and status classification
//! - `persistence`: Token, vehicle identity and home location storage
//! - `geo`: Home geofence distance
//! - `auth`: OAuth2 PKCE login, token refresh and the authenticated client
//! - `vehicle`: Owner API telemetry and commands
//! - `controls`: Charging control algorithm
//!
//! Each invocation makes one decision against one surplus reading; the
//! caller re-runs it periodically.

pub mod auth;
pub mod config;
pub mod controls;
pub mod error;
pub mod geo;
pub mod logging;
pub mod persistence;
pub mod transport;
pub mod vehicle;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, SurplusError};
