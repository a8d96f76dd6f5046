//! Tesla owner API client

use super::types::{
    ChargeState, CommandReply, CommandResult, DriveState, Envelope, VehicleData, VehicleSummary,
};
use super::{VehicleCommands, VehicleTelemetry};
use crate::auth::AuthenticatedClient;
use crate::error::{Result, SurplusError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::persistence::{TokenStore, VehicleIdentity};
use crate::transport::{HttpRequest, RequestBody};
use serde_json::json;
use std::sync::Arc;

pub const API_BASE: &str = "https://owner-api.teslamotors.com";

/// One vehicle on the account
pub struct TeslaVehicle {
    client: Arc<AuthenticatedClient>,
    identity: VehicleIdentity,
    base_url: String,
    logger: StructuredLogger,
}

impl TeslaVehicle {
    /// Vehicle with a known identity
    pub fn new(client: Arc<AuthenticatedClient>, identity: VehicleIdentity) -> Self {
        Self::with_base_url(client, identity, API_BASE)
    }

    pub fn with_base_url(
        client: Arc<AuthenticatedClient>,
        identity: VehicleIdentity,
        base_url: &str,
    ) -> Self {
        let vehicle_id = identity.vehicle_id.clone().unwrap_or_default();
        Self {
            client,
            identity,
            base_url: base_url.trim_end_matches('/').to_string(),
            logger: get_logger_with_context(LogContext::new("vehicle").with_vehicle_id(vehicle_id)),
        }
    }

    /// Resolve the vehicle from the store, asking the API when the stored
    /// identity is incomplete
    pub async fn connect(client: Arc<AuthenticatedClient>, store: &dyn TokenStore) -> Result<Self> {
        Self::connect_at(client, store, API_BASE).await
    }

    pub async fn connect_at(
        client: Arc<AuthenticatedClient>,
        store: &dyn TokenStore,
        base_url: &str,
    ) -> Result<Self> {
        let stored = store.read_identity()?;
        if stored.is_resolved() {
            return Ok(Self::with_base_url(client, stored, base_url));
        }

        let url = format!("{}/api/1/vehicles", base_url.trim_end_matches('/'));
        let listing: Envelope<Vec<VehicleSummary>> = client.get_json(&url).await?;
        let vehicles = listing.response.unwrap_or_default();

        let matched = match_vehicle(&vehicles, stored.vin.as_deref()).ok_or_else(|| {
            SurplusError::api(match stored.vin.as_deref() {
                Some(vin) if !vin.is_empty() => format!("No vehicle with VIN {} on the account", vin),
                _ => format!(
                    "Cannot pick a vehicle: account lists {} and no VIN is configured",
                    vehicles.len()
                ),
            })
        })?;

        let identity = VehicleIdentity {
            vin: matched.vin.clone(),
            vehicle_id: matched.id_s.clone(),
            display_name: matched.display_name.clone().or(stored.display_name),
        };
        store.write_identity(&identity)?;

        let vehicle = Self::with_base_url(client, identity, base_url);
        vehicle.logger.info(&format!(
            "Using vehicle {}",
            vehicle.identity.display_name.as_deref().unwrap_or("(unnamed)")
        ));
        Ok(vehicle)
    }

    pub fn identity(&self) -> &VehicleIdentity {
        &self.identity
    }

    fn vehicle_url(&self, path: &str) -> Result<String> {
        let id = self
            .identity
            .vehicle_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| SurplusError::config("Vehicle id is not resolved"))?;
        Ok(format!("{}/api/1/vehicles/{}{}", self.base_url, id, path))
    }

    /// Full data snapshot
    pub async fn vehicle_data(&self) -> Result<Option<VehicleData>> {
        let url = self.vehicle_url("/vehicle_data")?;
        let envelope: Option<Envelope<VehicleData>> = self.client.get_json(&url).await?;
        Ok(envelope.and_then(|e| e.response))
    }

    async fn command(&self, name: &str, body: Option<serde_json::Value>) -> Result<CommandResult> {
        let url = self.vehicle_url(&format!("/command/{}", name))?;
        let request = match body {
            Some(body) => HttpRequest::post_json(url, body),
            None => HttpRequest::post(url, RequestBody::Empty),
        };

        let raw = self.client.execute(request).await?;
        let envelope: Option<Envelope<CommandReply>> = serde_json::from_str(&raw)?;
        let result = CommandResult::from_envelope(envelope);

        match result.failure_reason() {
            None => self.logger.debug(&format!("Command {} succeeded", name)),
            Some(reason) => self
                .logger
                .warn(&format!("Command {} failed: {}", name, reason)),
        }
        Ok(result)
    }
}

/// Sole vehicle when no VIN is configured, otherwise the one with that VIN
pub fn match_vehicle<'a>(
    vehicles: &'a [VehicleSummary],
    vin: Option<&str>,
) -> Option<&'a VehicleSummary> {
    match vin.filter(|v| !v.is_empty()) {
        None if vehicles.len() == 1 => vehicles.first().filter(|v| v.id_s.is_some()),
        None => None,
        Some(vin) => vehicles
            .iter()
            .find(|v| v.id_s.is_some() && v.vin.as_deref() == Some(vin)),
    }
}

#[async_trait::async_trait]
impl VehicleTelemetry for TeslaVehicle {
    async fn charge_state(&self) -> Result<ChargeState> {
        let url = self.vehicle_url("/data_request/charge_state")?;
        let envelope: Option<Envelope<ChargeState>> = self.client.get_json(&url).await?;
        envelope
            .and_then(|e| e.response)
            .ok_or_else(|| SurplusError::api("Charge state response is empty"))
    }

    async fn drive_state(&self) -> Result<Option<DriveState>> {
        Ok(self.vehicle_data().await?.and_then(|data| data.drive_state))
    }
}

#[async_trait::async_trait]
impl VehicleCommands for TeslaVehicle {
    async fn start_charging(&self) -> Result<CommandResult> {
        self.command("charge_start", None).await
    }

    async fn stop_charging(&self) -> Result<CommandResult> {
        self.command("charge_stop", None).await
    }

    async fn set_charging_amps(&self, amps: u32) -> Result<CommandResult> {
        self.command("set_charging_amps", Some(json!({ "charging_amps": amps })))
            .await
    }

    async fn set_charge_limit(&self, percent: u32) -> Result<CommandResult> {
        self.command("set_charge_limit", Some(json!({ "percent": percent })))
            .await
    }

    async fn open_charge_port(&self) -> Result<CommandResult> {
        self.command("charge_port_door_open", None).await
    }

    async fn close_charge_port(&self) -> Result<CommandResult> {
        self.command("charge_port_door_close", None).await
    }

    async fn wake_up(&self) -> Result<bool> {
        self.logger.debug("Waking vehicle");
        let url = self.vehicle_url("/wake_up")?;
        let raw = self
            .client
            .execute(HttpRequest::post(url, RequestBody::Empty))
            .await?;
        let envelope: Option<Envelope<VehicleSummary>> = serde_json::from_str(&raw)?;
        Ok(envelope
            .and_then(|e| e.response)
            .and_then(|v| v.state)
            .is_some_and(|state| state == "online"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, vin: &str) -> VehicleSummary {
        VehicleSummary {
            id_s: Some(id.to_string()),
            vin: Some(vin.to_string()),
            display_name: None,
            state: None,
        }
    }

    #[test]
    fn test_match_single_vehicle_without_vin() {
        let list = vec![summary("1", "VIN1")];
        assert_eq!(match_vehicle(&list, None).unwrap().id_s.as_deref(), Some("1"));
        assert_eq!(match_vehicle(&list, Some("")).unwrap().id_s.as_deref(), Some("1"));
    }

    #[test]
    fn test_match_requires_vin_with_several_vehicles() {
        let list = vec![summary("1", "VIN1"), summary("2", "VIN2")];
        assert!(match_vehicle(&list, None).is_none());
        assert_eq!(match_vehicle(&list, Some("VIN2")).unwrap().id_s.as_deref(), Some("2"));
        assert!(match_vehicle(&list, Some("VIN3")).is_none());
    }
}
