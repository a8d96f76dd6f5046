//! Vehicle API integration
//!
//! The controller only sees the two traits below. [`TeslaVehicle`] implements
//! both against the owner API.

pub mod tesla;
pub mod types;

pub use tesla::TeslaVehicle;
pub use types::{
    ChargeState, ChargingState, CommandResult, DriveState, VehicleData, VehicleSummary,
};

use crate::error::Result;

/// Read side of the vehicle
#[async_trait::async_trait]
pub trait VehicleTelemetry: Send + Sync {
    async fn charge_state(&self) -> Result<ChargeState>;

    /// Latest position report, `None` when the car does not provide one
    async fn drive_state(&self) -> Result<Option<DriveState>>;
}

/// Write side of the vehicle.
///
/// A rejected command is `Ok(CommandResult::Failed(reason))`; `Err` is kept
/// for transport and authentication problems.
#[async_trait::async_trait]
pub trait VehicleCommands: Send + Sync {
    async fn start_charging(&self) -> Result<CommandResult>;

    async fn stop_charging(&self) -> Result<CommandResult>;

    async fn set_charging_amps(&self, amps: u32) -> Result<CommandResult>;

    async fn set_charge_limit(&self, percent: u32) -> Result<CommandResult>;

    async fn open_charge_port(&self) -> Result<CommandResult>;

    async fn close_charge_port(&self) -> Result<CommandResult>;

    /// True once the car reports itself online
    async fn wake_up(&self) -> Result<bool>;
}
