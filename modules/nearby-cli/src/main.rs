use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nearby_common::{Coordinate, LocatorConfig};
use nearby_locator::{FixScript, LocationResolver, PromptAnswer, SimPlatform, SimPrompter};
use nearby_places::{PlacesBridge, PlacesResult, PlacesSession};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nearby", about = "Resolve the current location and rank nearby places")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one nearby-places query against a scripted location platform
    Resolve(SimArgs),
    /// Print the JSON schema of the result payload
    Schema,
}

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
struct SimArgs {
    /// Latitude the platform reports
    #[arg(long, default_value_t = 40.7128)]
    lat: f64,
    /// Longitude the platform reports
    #[arg(long, default_value_t = -74.0060)]
    lng: f64,

    /// Serve the location as a cached fix
    #[arg(long)]
    cached: bool,

    /// Deny the permission prompt
    #[arg(long)]
    deny_permission: bool,

    /// Report location services as switched off
    #[arg(long)]
    services_off: bool,

    /// Delay before the high-accuracy fix arrives
    #[arg(long, default_value_t = 1_000)]
    gps_delay_ms: u64,

    /// Delay before the low-power fix arrives
    #[arg(long, default_value_t = 500)]
    network_delay_ms: u64,

    /// High-accuracy requests never deliver
    #[arg(long)]
    no_gps: bool,

    /// Low-power requests never deliver
    #[arg(long)]
    no_network: bool,
}

impl SimArgs {
    fn platform(&self) -> SimPlatform {
        let location = Coordinate::new(self.lat, self.lng);
        let script = |silent: bool, delay_ms: u64| {
            if silent {
                FixScript::Silent
            } else {
                FixScript::Fix {
                    after: Duration::from_millis(delay_ms),
                    coordinate: location,
                }
            }
        };

        let mut platform = SimPlatform::new()
            .with_permission(false)
            .with_service_enabled(!self.services_off)
            .on_high_accuracy(script(self.no_gps, self.gps_delay_ms))
            .on_low_power(script(self.no_network, self.network_delay_ms));
        if self.cached {
            platform = platform.with_cached(location);
        }
        platform
    }

    fn prompt_answer(&self) -> PromptAnswer {
        if self.deny_permission {
            PromptAnswer::Deny
        } else {
            PromptAnswer::Grant
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("nearby=info".parse()?)
                .add_directive("nearby_places=info".parse()?)
                .add_directive("nearby_locator=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Schema => {
            let schema = schemars::schema_for!(PlacesResult);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve(args) => resolve(args).await,
    }
}

async fn resolve(args: SimArgs) -> Result<ExitCode> {
    let config = LocatorConfig::from_env()?;

    let platform = Arc::new(args.platform());
    let prompter = Arc::new(SimPrompter::new(platform.clone(), args.prompt_answer()));
    let session = PlacesSession::synthetic(LocationResolver::new(platform, config));
    let bridge = PlacesBridge::new(session, prompter);

    info!(session_id = %bridge.session().id(), lat = args.lat, lng = args.lng, "Resolving nearby places");

    let outcome = match bridge.request_permission().await {
        Ok(_) => bridge.get_nearby_places().await,
        Err(e) => Err(e),
    };
    bridge.invalidate();

    match outcome {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            info!(code = %e.code, message = e.message.as_str(), "Query rejected");
            println!("{}", e.code);
            Ok(ExitCode::FAILURE)
        }
    }
}
