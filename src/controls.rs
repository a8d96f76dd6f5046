//! Surplus-driven charge control
//!
//! One call turns a single surplus reading and a fresh charge telemetry
//! snapshot into at most one class of command: stop, set amps (plus start
//! when the car is stopped), or nothing. The controller keeps no state
//! between calls.

use crate::config::{ControlsConfig, PROTOCOL_MAX_AMPS, RoundingMode};
use crate::error::Result;
use crate::geo::{GeoPoint, distance_miles};
use crate::logging::{StructuredLogger, get_logger};
use crate::vehicle::{ChargeState, ChargingState, CommandResult, VehicleCommands, VehicleTelemetry};

/// Watts per amp assumed when phase or voltage telemetry is implausible
pub const FALLBACK_POWER_PER_AMP: i64 = 3 * 220;

/// Lowest voltage accepted as real telemetry
const MIN_PLAUSIBLE_VOLTAGE: i32 = 100;

/// Watts drawn per amp of charging current
pub fn power_per_amp(state: &ChargeState) -> i64 {
    if state.charger_phases > 0 && state.charger_voltage >= MIN_PLAUSIBLE_VOLTAGE {
        i64::from(state.charger_phases) * i64::from(state.charger_voltage)
    } else {
        FALLBACK_POWER_PER_AMP
    }
}

/// Command class chosen for one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeAction {
    /// Not enough surplus and the car is charging
    Stop,
    /// Not enough surplus, nothing to stop
    AlreadyStopped,
    /// Request `amps`, followed by a start when the car is stopped
    SetAmps { amps: u32, start: bool },
    /// The car already charges at `amps`
    NoChange { amps: u32 },
}

/// Result of the pure calculation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChargePlan {
    pub action: ChargeAction,
    pub power_per_amp: i64,
    /// Surplus as if the car drew nothing
    pub net_surplus: i64,
    /// Watts the plan commits to the car
    pub committed_watts: i64,
}

/// A command the vehicle refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub command: &'static str,
    pub reason: String,
}

/// Plan plus the outcome of the commands issued for it
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeReport {
    pub plan: ChargePlan,
    pub failures: Vec<CommandFailure>,
}

impl ChargeReport {
    pub fn committed_watts(&self) -> i64 {
        self.plan.committed_watts
    }
}

/// Outcome of [`ChargingController::adapt_charging`]
#[derive(Debug, Clone, PartialEq)]
pub enum AdaptOutcome {
    /// The car is further than the home radius away
    NotHome { distance_miles: f64 },
    /// No cable plugged in
    NotConnected,
    Applied(ChargeReport),
}

/// Decision engine
pub struct ChargingController {
    config: ControlsConfig,
    logger: StructuredLogger,
}

impl ChargingController {
    pub fn new(config: ControlsConfig) -> Self {
        Self {
            config,
            logger: get_logger("controls"),
        }
    }

    fn max_amps(&self) -> u32 {
        self.config.max_amps.clamp(1, PROTOCOL_MAX_AMPS)
    }

    fn min_amps(&self) -> u32 {
        self.config.min_amps.clamp(1, self.max_amps())
    }

    fn round(&self, amps: f64) -> f64 {
        match self.config.rounding {
            RoundingMode::Nearest => amps.round(),
            RoundingMode::Truncate => amps.trunc(),
        }
    }

    /// Pure calculation; `None` when the car is not plugged in
    pub fn plan(&self, surplus_watts: i64, state: &ChargeState) -> Option<ChargePlan> {
        if state.charging_state == ChargingState::Disconnected {
            return None;
        }

        let power_per_amp = power_per_amp(state);
        let power_of_car =
            power_per_amp.saturating_mul(i64::from(state.charger_actual_current.max(0)));
        let net_surplus = surplus_watts.saturating_add(power_of_car);
        let charging = state.charging_state == ChargingState::Charging;

        let min_amps = self.min_amps();
        let threshold = (f64::from(min_amps) - self.config.stop_margin_amps) * power_per_amp as f64;
        if net_surplus <= 0 || net_surplus as f64 - threshold <= 0.0 {
            let action = if charging {
                ChargeAction::Stop
            } else {
                ChargeAction::AlreadyStopped
            };
            return Some(ChargePlan {
                action,
                power_per_amp,
                net_surplus,
                committed_watts: 0,
            });
        }

        let raw = self.round(net_surplus as f64 / power_per_amp as f64);
        let amps = (raw.max(0.0) as u32).clamp(min_amps, self.max_amps());

        let unchanged = i64::from(amps) == i64::from(state.charger_actual_current);
        let action = if unchanged && charging {
            ChargeAction::NoChange { amps }
        } else {
            ChargeAction::SetAmps {
                amps,
                start: state.charging_state == ChargingState::Stopped,
            }
        };

        Some(ChargePlan {
            action,
            power_per_amp,
            net_surplus,
            committed_watts: i64::from(amps) * power_per_amp,
        })
    }

    /// Issue the commands for `plan`; refused commands are collected, not fatal
    pub async fn apply(
        &self,
        plan: ChargePlan,
        commands: &dyn VehicleCommands,
    ) -> Result<ChargeReport> {
        let mut failures = Vec::new();

        match plan.action {
            ChargeAction::Stop => {
                self.logger.info("Surplus too low, stopping charge");
                record(&mut failures, "charge_stop", commands.stop_charging().await?);
            }
            ChargeAction::AlreadyStopped => {
                self.logger.info("Surplus too low, car is not charging");
            }
            ChargeAction::SetAmps { amps, start } => {
                self.logger.info(&format!("Charging with {} amps", amps));
                record(
                    &mut failures,
                    "set_charging_amps",
                    commands.set_charging_amps(amps).await?,
                );
                if start {
                    record(&mut failures, "charge_start", commands.start_charging().await?);
                }
            }
            ChargeAction::NoChange { amps } => {
                self.logger
                    .info(&format!("Already charging with {} amps, no change", amps));
            }
        }

        for failure in &failures {
            self.logger.warn(&format!(
                "Command {} failed: {}",
                failure.command, failure.reason
            ));
        }

        Ok(ChargeReport { plan, failures })
    }

    /// Home geofence; `Some(distance)` when the car is outside the radius.
    ///
    /// No home configured or no position reported lets the decision proceed.
    pub async fn check_geofence(
        &self,
        home: Option<GeoPoint>,
        telemetry: &dyn VehicleTelemetry,
    ) -> Result<Option<f64>> {
        let Some(home) = home else {
            return Ok(None);
        };
        let Some(position) = telemetry.drive_state().await?.and_then(|d| d.position()) else {
            self.logger.debug("No position reported, skipping geofence");
            return Ok(None);
        };

        let distance = distance_miles(home, position);
        self.logger
            .debug(&format!("Vehicle is {:.2} miles from home", distance));
        if distance > self.config.home_radius_miles {
            Ok(Some(distance))
        } else {
            Ok(None)
        }
    }

    /// Full decision: geofence, fresh telemetry, plan, commands
    pub async fn adapt_charging<V>(
        &self,
        surplus_watts: i64,
        home: Option<GeoPoint>,
        vehicle: &V,
    ) -> Result<AdaptOutcome>
    where
        V: VehicleTelemetry + VehicleCommands,
    {
        if let Some(distance_miles) = self.check_geofence(home, vehicle).await? {
            self.logger.info(&format!(
                "Vehicle is {:.1} miles from home, not adapting charge",
                distance_miles
            ));
            return Ok(AdaptOutcome::NotHome { distance_miles });
        }

        let state = vehicle.charge_state().await?;
        let Some(plan) = self.plan(surplus_watts, &state) else {
            self.logger.info("Vehicle is not connected to a charger");
            return Ok(AdaptOutcome::NotConnected);
        };

        self.logger.info(&format!(
            "Car draws {} W, surplus without car {} W ({} W per amp)",
            plan.power_per_amp
                .saturating_mul(i64::from(state.charger_actual_current.max(0))),
            plan.net_surplus,
            plan.power_per_amp
        ));

        Ok(AdaptOutcome::Applied(self.apply(plan, vehicle).await?))
    }
}

fn record(failures: &mut Vec<CommandFailure>, command: &'static str, result: CommandResult) {
    if let CommandResult::Failed(reason) = result {
        failures.push(CommandFailure { command, reason });
    }
}
