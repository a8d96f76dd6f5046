use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use surplus_charge::auth::{
    AuthenticatedClient, HtmlLoginFormFetcher, PkceAuthFlow, PkceSession, TokenRefresher,
};
use surplus_charge::controls::{AdaptOutcome, ChargingController};
use surplus_charge::geo::GeoPoint;
use surplus_charge::logging::{get_logger, init_logging};
use surplus_charge::persistence::{FileTokenStore, TokenStore};
use surplus_charge::transport::{HttpTransport, Transport};
use surplus_charge::vehicle::{CommandResult, TeslaVehicle, VehicleCommands, VehicleTelemetry};
use surplus_charge::Config;

/// Adapt a Tesla's charging current to the household power surplus
#[derive(Parser, Debug)]
#[command(name = "surplus-charge", version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to surplus_charge.yaml or /etc/surplus-charge/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the login URL and the verifier needed for auth-step2
    AuthStep1 {
        /// Pre-fill the login page with this account
        #[arg(long)]
        email: Option<String>,
    },
    /// Exchange the code from the callback URL for tokens
    AuthStep2 {
        #[arg(long)]
        verifier: String,
        #[arg(long)]
        code: String,
    },
    /// Scripted variant of auth-step1 that also submits the identity
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Start or stop charging
    Charge {
        #[arg(value_enum)]
        action: ChargeSwitch,
    },
    /// Open or close the charge port door
    ChargePort {
        #[arg(value_enum)]
        action: PortAction,
    },
    /// Set the state-of-charge limit in percent
    ChargeLimit {
        #[arg(value_parser = clap::value_parser!(u32).range(30..=100))]
        percent: u32,
    },
    /// Set the charging current
    ChargingAmps {
        #[arg(value_parser = clap::value_parser!(u32).range(1..=32))]
        amps: u32,
    },
    /// Show the current charge state
    ChargeState,
    /// Show the reported vehicle position
    Location,
    /// Adapt the charging current to a surplus reading in watts
    Adapt {
        #[arg(allow_negative_numbers = true)]
        surplus_watts: i64,
    },
    /// Wake the vehicle
    WakeUp,
    /// Store the home location used by the geofence
    SetHome {
        #[arg(allow_negative_numbers = true)]
        latitude: f64,
        #[arg(allow_negative_numbers = true)]
        longitude: f64,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ChargeSwitch {
    Start,
    Stop,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PortAction {
    Open,
    Close,
}

struct App {
    config: Config,
    transport: Arc<dyn Transport>,
    store: Arc<dyn TokenStore>,
}

impl App {
    fn new(config: Config) -> Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&config.http)?);
        let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(&config.tesla.state_file));
        Ok(Self {
            config,
            transport,
            store,
        })
    }

    fn auth_flow(&self) -> PkceAuthFlow {
        PkceAuthFlow::new(
            self.transport.clone(),
            Box::new(HtmlLoginFormFetcher::new(self.transport.clone())),
        )
    }

    fn refresher(&self) -> Result<Arc<TokenRefresher>> {
        Ok(Arc::new(TokenRefresher::new(
            self.transport.clone(),
            self.store.clone(),
        )?))
    }

    async fn vehicle(&self) -> Result<TeslaVehicle> {
        let client = Arc::new(AuthenticatedClient::new(
            self.transport.clone(),
            self.refresher()?,
        ));
        Ok(TeslaVehicle::connect(client, self.store.as_ref()).await?)
    }

    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::AuthStep1 { email } => {
                let session = PkceSession::create_verifier();
                print_step2_instructions(&session, email.as_deref());
            }
            Command::AuthStep2 { verifier, code } => {
                let session = PkceSession::from_verifier(verifier);
                let tokens = self.auth_flow().exchange_code(&session, &code).await?;
                self.refresher()?.install(tokens).await?;
                println!("Tokens stored in {}", self.config.tesla.state_file);
            }
            Command::Login { email, password } => {
                let flow = self.auth_flow();
                let session = PkceSession::create_verifier();
                let fields = flow
                    .fetch_login_form(&session.authorize_url(Some(&email)))
                    .await?;
                flow.submit_credentials(&session, &email, &password, &fields)
                    .await?;
                print_step2_instructions(&session, Some(&email));
            }
            Command::Charge { action } => {
                let vehicle = self.vehicle().await?;
                match action {
                    ChargeSwitch::Start => report("Start charging", vehicle.start_charging().await?)?,
                    ChargeSwitch::Stop => report("Stop charging", vehicle.stop_charging().await?)?,
                }
            }
            Command::ChargePort { action } => {
                let vehicle = self.vehicle().await?;
                match action {
                    PortAction::Open => {
                        report("Open charge port", vehicle.open_charge_port().await?)?
                    }
                    PortAction::Close => {
                        report("Close charge port", vehicle.close_charge_port().await?)?
                    }
                }
            }
            Command::ChargeLimit { percent } => {
                let vehicle = self.vehicle().await?;
                report(
                    &format!("Set charge limit to {}%", percent),
                    vehicle.set_charge_limit(percent).await?,
                )?;
            }
            Command::ChargingAmps { amps } => {
                let vehicle = self.vehicle().await?;
                report(
                    &format!("Set charging amps to {}", amps),
                    vehicle.set_charging_amps(amps).await?,
                )?;
            }
            Command::ChargeState => {
                let state = self.vehicle().await?.charge_state().await?;
                println!("Charging state:   {}", state.charging_state);
                println!("Actual current:   {} A", state.charger_actual_current);
                println!("Voltage:          {} V", state.charger_voltage);
                println!("Phases:           {}", state.charger_phases);
                if let Some(level) = state.battery_level {
                    println!("Battery level:    {}%", level);
                }
                if let Some(limit) = state.charge_limit_soc {
                    println!("Charge limit:     {}%", limit);
                }
                if let Some(request) = state.charge_current_request {
                    println!(
                        "Requested:        {} A (max {} A)",
                        request,
                        state.charge_current_request_max.unwrap_or(request)
                    );
                }
                println!(
                    "Charge port door: {}",
                    if state.charge_port_door_open { "open" } else { "closed" }
                );
            }
            Command::Location => {
                let vehicle = self.vehicle().await?;
                let Some(position) = vehicle.drive_state().await?.filter(|d| d.position().is_some())
                else {
                    bail!("Vehicle did not report a position");
                };
                if let Some(point) = position.position() {
                    println!("Latitude:  {:.6}", point.latitude);
                    println!("Longitude: {:.6}", point.longitude);
                    if let Some(home) = self.store.read_home()? {
                        println!("Distance from home: {:.2} miles", home.distance_miles(&point));
                    }
                }
                if let Some(at) = position.recorded_at() {
                    println!("Recorded at: {}", at.to_rfc3339());
                }
            }
            Command::Adapt { surplus_watts } => {
                let vehicle = self.vehicle().await?;
                let controller = ChargingController::new(self.config.controls.clone());
                let home = self.store.read_home()?;
                match controller
                    .adapt_charging(surplus_watts, home, &vehicle)
                    .await?
                {
                    AdaptOutcome::NotHome { distance_miles } => {
                        bail!(
                            "Vehicle is {:.1} miles from home, charging not adapted",
                            distance_miles
                        );
                    }
                    AdaptOutcome::NotConnected => {
                        bail!("Vehicle is not connected to a charger");
                    }
                    AdaptOutcome::Applied(report) => {
                        for failure in &report.failures {
                            eprintln!("{} failed. Reason: {}", failure.command, failure.reason);
                        }
                        println!("Charging power (watts): {}", report.committed_watts());
                    }
                }
            }
            Command::WakeUp => {
                if self.vehicle().await?.wake_up().await? {
                    println!("Vehicle is online");
                } else {
                    bail!("Vehicle did not come online yet, try again shortly");
                }
            }
            Command::SetHome {
                latitude,
                longitude,
            } => {
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    bail!("Coordinates out of range: {}, {}", latitude, longitude);
                }
                self.store
                    .write_home(GeoPoint::new(latitude, longitude))?;
                println!("Home set to {:.6}, {:.6}", latitude, longitude);
            }
        }
        Ok(())
    }
}

fn print_step2_instructions(session: &PkceSession, email: Option<&str>) {
    println!("Open this URL in a browser and log in:");
    println!();
    println!("{}", session.authorize_url(email));
    println!();
    println!("The browser ends on a 'page not found' URL. Copy its 'code' parameter and run:");
    println!();
    println!(
        "surplus-charge auth-step2 --verifier {} --code <code>",
        session.code_verifier
    );
}

fn report(what: &str, result: CommandResult) -> Result<()> {
    match result {
        CommandResult::Success => {
            println!("{}: done", what);
            Ok(())
        }
        CommandResult::Failed(reason) => Err(anyhow!("{} failed. Reason: {}", what, reason)),
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load()?,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;
    init_logging(&config.logging)?;

    let logger = get_logger("main");
    logger.debug(&format!("surplus-charge {} starting", env!("CARGO_PKG_VERSION")));

    let app = App::new(config)?;
    if let Err(e) = app.run(cli.command).await {
        logger.error(&format!("{:#}", e));
        return Err(e);
    }
    Ok(())
}
