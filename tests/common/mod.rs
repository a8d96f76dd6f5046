#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;
use surplus_charge::Result;
use surplus_charge::geo::GeoPoint;
use surplus_charge::persistence::{PersistentState, TokenPair, TokenStore, VehicleIdentity};
use surplus_charge::transport::{HttpRequest, Transport, classify_status};
use surplus_charge::vehicle::{
    ChargeState, ChargingState, CommandResult, DriveState, VehicleCommands, VehicleTelemetry,
};

/// Canned answer of the scripted transport
pub enum Reply {
    Ok(String),
    Status(u16),
}

/// Transport answering from a script, in order, and recording every request
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count_to(&self, url_part: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.url.contains(url_part))
            .count()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Reply::Ok(body)) => Ok(body),
            Some(Reply::Status(code)) => Err(classify_status(code, "scripted")),
            None => panic!("unexpected request to {}", request.url),
        }
    }
}

pub fn token_body(access: &str, refresh: &str) -> Reply {
    Reply::Ok(format!(
        r#"{{"access_token":"{}","refresh_token":"{}","expires_in":28800,"token_type":"Bearer"}}"#,
        access, refresh
    ))
}

/// In-memory store counting token writes
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<PersistentState>,
    writes: Mutex<usize>,
}

impl MemoryStore {
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().tokens = Some(TokenPair::new(access, refresh));
        store
    }

    pub fn token_writes(&self) -> usize {
        *self.writes.lock().unwrap()
    }

    pub fn tokens(&self) -> Option<TokenPair> {
        self.state.lock().unwrap().tokens.clone()
    }
}

impl TokenStore for MemoryStore {
    fn read(&self) -> Result<Option<TokenPair>> {
        Ok(self.tokens())
    }

    fn write(&self, tokens: &TokenPair) -> Result<()> {
        *self.writes.lock().unwrap() += 1;
        self.state.lock().unwrap().tokens = Some(tokens.clone());
        Ok(())
    }

    fn read_identity(&self) -> Result<VehicleIdentity> {
        Ok(self.state.lock().unwrap().vehicle.clone())
    }

    fn write_identity(&self, identity: &VehicleIdentity) -> Result<()> {
        self.state.lock().unwrap().vehicle = identity.clone();
        Ok(())
    }

    fn read_home(&self) -> Result<Option<GeoPoint>> {
        Ok(self.state.lock().unwrap().home)
    }

    fn write_home(&self, home: GeoPoint) -> Result<()> {
        self.state.lock().unwrap().home = Some(home);
        Ok(())
    }
}

/// Vehicle double recording the commands it receives
pub struct FakeVehicle {
    pub charge: ChargeState,
    pub position: Option<GeoPoint>,
    pub fail_with: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeVehicle {
    pub fn new(state: ChargingState, actual_amps: i32, voltage: i32, phases: i32) -> Self {
        Self {
            charge: ChargeState {
                charging_state: state,
                charger_actual_current: actual_amps,
                charger_voltage: voltage,
                charger_phases: phases,
                ..Default::default()
            },
            position: None,
            fail_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.position = Some(GeoPoint::new(latitude, longitude));
        self
    }

    pub fn failing(mut self, reason: &str) -> Self {
        self.fail_with = Some(reason.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<CommandResult> {
        self.calls.lock().unwrap().push(call);
        Ok(match &self.fail_with {
            Some(reason) => CommandResult::Failed(reason.clone()),
            None => CommandResult::Success,
        })
    }
}

#[async_trait::async_trait]
impl VehicleTelemetry for FakeVehicle {
    async fn charge_state(&self) -> Result<ChargeState> {
        self.calls.lock().unwrap().push("charge_state".to_string());
        Ok(self.charge.clone())
    }

    async fn drive_state(&self) -> Result<Option<DriveState>> {
        self.calls.lock().unwrap().push("drive_state".to_string());
        Ok(self.position.map(|p| DriveState {
            latitude: Some(p.latitude),
            longitude: Some(p.longitude),
            ..Default::default()
        }))
    }
}

#[async_trait::async_trait]
impl VehicleCommands for FakeVehicle {
    async fn start_charging(&self) -> Result<CommandResult> {
        self.record("start".to_string())
    }

    async fn stop_charging(&self) -> Result<CommandResult> {
        self.record("stop".to_string())
    }

    async fn set_charging_amps(&self, amps: u32) -> Result<CommandResult> {
        self.record(format!("amps:{}", amps))
    }

    async fn set_charge_limit(&self, percent: u32) -> Result<CommandResult> {
        self.record(format!("limit:{}", percent))
    }

    async fn open_charge_port(&self) -> Result<CommandResult> {
        self.record("port_open".to_string())
    }

    async fn close_charge_port(&self) -> Result<CommandResult> {
        self.record("port_close".to_string())
    }

    async fn wake_up(&self) -> Result<bool> {
        self.record("wake_up".to_string())?;
        Ok(true)
    }
}
