//! codegate command-line activation client
//!
//! Exchanges an activation code for a proxy credential and stores it as a
//! profile, using the same flow as the app.
//!
//! Usage:
//!   codegate --endpoint https://auth.example.com/login activate CODE
//!   codegate status
//!   codegate device-id

use std::{path::PathBuf, sync::Arc};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use codegate_activation::{
    ActivationConfig, ActivationController, Activator, ControllerEvent, HttpTransport,
    JsonStatusStore, StatusStore, Submission,
};
use codegate_cli::{JsonProfileStore, UriLinkParser};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "codegate")]
#[command(about = "Activate this device and import its proxy profile")]
struct Args {
    /// Path to a JSON config file (defaults to <data-dir>/config.json if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding activation status and profiles
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Activation endpoint, overrides the config file
    #[arg(long, env = "CODEGATE_ENDPOINT")]
    endpoint: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exchange an activation code for a profile
    Activate {
        /// The activation code
        code: String,
    },
    /// Print the persisted activation status
    Status,
    /// Print this device's identity, creating it if needed
    DeviceId,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let data_dir = match &args.data_dir {
        Some(dir) => dir.clone(),
        None => JsonStatusStore::default_dir()
            .context("No data directory available, pass --data-dir")?,
    };
    debug!("Using data directory {:?}", data_dir);

    let status_store = Arc::new(JsonStatusStore::in_dir(&data_dir));

    match args.command {
        Command::Status => {
            let status = status_store.load()?;
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(())
        }
        Command::DeviceId => {
            let activator = build_activator(&args.config, args.endpoint, &data_dir, status_store)?;
            println!("{}", activator.device_id()?);
            Ok(())
        }
        Command::Activate { code } => {
            let activator = build_activator(&args.config, args.endpoint, &data_dir, status_store)?;
            run_activation(Arc::new(activator), &code).await
        }
    }
}

fn load_config(
    path: &Option<PathBuf>,
    endpoint: Option<String>,
    data_dir: &std::path::Path,
) -> Result<ActivationConfig> {
    let mut config = match path {
        Some(path) => ActivationConfig::load(path)?,
        None => {
            let default_path = data_dir.join("config.json");
            if default_path.exists() {
                ActivationConfig::load(&default_path)?
            } else {
                ActivationConfig::default()
            }
        }
    };
    if let Some(endpoint) = endpoint {
        config.endpoint = endpoint;
    }
    Ok(config)
}

fn build_activator(
    config_path: &Option<PathBuf>,
    endpoint: Option<String>,
    data_dir: &std::path::Path,
    status_store: Arc<JsonStatusStore>,
) -> Result<Activator> {
    let config = load_config(config_path, endpoint, data_dir)?;
    let transport = Arc::new(HttpTransport::new(config.timeouts)?);
    let activator = Activator::new(
        config,
        transport,
        Arc::new(UriLinkParser),
        Arc::new(JsonProfileStore::in_dir(data_dir)),
        status_store,
    )?;
    Ok(activator)
}

async fn run_activation(activator: Arc<Activator>, code: &str) -> Result<()> {
    let (controller, mut events) = ActivationController::open(activator);

    // An already activated device never contacts the endpoint, so only a
    // fresh activation needs a usable config.
    if !controller.is_finished() {
        controller.activator().config().validate()?;
        match controller.submit(code) {
            Submission::Started => info!("Activating..."),
            Submission::Ignored => {}
            Submission::Rejected(e) => bail!(e),
        }
    }

    while let Some(event) = events.recv().await {
        match event {
            ControllerEvent::Busy(busy) => debug!("Busy: {}", busy),
            ControllerEvent::Activated {
                profile_id,
                auto_connect,
            } => {
                if auto_connect {
                    println!("Activated. Profile {profile_id} is ready to connect.");
                } else {
                    println!("Already activated with profile {profile_id}.");
                }
                return Ok(());
            }
            ControllerEvent::Failed { message, .. } => bail!(message),
        }
    }

    bail!("activation ended without a result")
}
