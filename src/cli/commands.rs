use crate::cli::args::{Args, Command, ConfigArgs, ConfigCommand, ConnectArgs};
use crate::cli::console::ConsoleOperator;
use crate::cli::output::ConsoleWriter;
use crate::core::session::Session;
use crate::domain::config::{seconds, Endpoint, SerTermConfig, SessionConfig};
use crate::domain::error::{SerTermError, SerTermResult};
use crate::infrastructure::config::ConfigManager;
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::serial::list_ports;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Execute CLI command
pub async fn execute_command(args: Args) -> SerTermResult<()> {
    let writer = ConsoleWriter::new(args.output);

    let config_manager = ConfigManager::new();
    let config = match &args.config {
        Some(path) => ConfigManager::load_config_from_path(path)?,
        None => config_manager.load_config()?,
    };

    init_logging(&config.defaults.log_level, args.verbose)?;

    match args.command {
        Command::Connect(connect_args) => execute_connect(connect_args, &config).await,
        Command::Ports => {
            let ports = list_ports()?;
            writer.write_ports(&ports)?;
            Ok(())
        }
        Command::Config(config_args) => {
            execute_config_command(config_args, &writer, &config, &config_manager)
        }
    }
}

async fn execute_connect(args: ConnectArgs, config: &SerTermConfig) -> SerTermResult<()> {
    let session_config = resolve_session_config(&args, config)?;

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let operator = Box::new(ConsoleOperator::new());
    let mut session = tokio::select! {
        Some(()) = shutdown_rx.recv() => {
            info!("Interrupted while connecting");
            return Ok(());
        }
        session = Session::connect(session_config, operator) => session?,
    };

    let outcome = session.run(&mut shutdown_rx).await?;
    debug!("Session outcome: {}", outcome);
    Ok(())
}

/// Combine command line, device profile and configuration defaults into one
/// session configuration. Command line options win over the profile, the
/// profile wins over `[defaults]`.
pub fn resolve_session_config(
    args: &ConnectArgs,
    config: &SerTermConfig,
) -> SerTermResult<SessionConfig> {
    let profile = config.find_device(&args.device);
    let address = profile.map_or(args.device.as_str(), |p| p.address.as_str());
    if let Some(profile) = profile {
        debug!("Using device profile '{}' ({})", profile.name, profile.address);
    }

    let defaults = &config.defaults;
    let mut session = SessionConfig::new(Endpoint::parse(address)?);

    session.serial.baud_rate = args
        .baudrate
        .or(profile.and_then(|p| p.baud_rate))
        .unwrap_or(defaults.baud_rate);
    if let Some(data_bits) = args.data_bits {
        session.serial.data_bits = data_bits;
    }
    if let Some(stop_bits) = args.stop_bits {
        session.serial.stop_bits = stop_bits;
    }
    if let Some(parity) = args.parity {
        session.serial.parity = parity.into();
    }
    if let Some(flow_control) = args.flow_control {
        session.serial.flow_control = flow_control.into();
    }

    session.timeout = seconds(args.timeout.unwrap_or(defaults.timeout), "timeout")?;
    session.connect_timeout = seconds(
        args.connect_timeout.unwrap_or(defaults.connect_timeout),
        "connect timeout",
    )?;

    session.eol = args
        .eol
        .map(Into::into)
        .or(profile.and_then(|p| p.eol))
        .unwrap_or(defaults.eol);
    session.display = args
        .display
        .map(Into::into)
        .or(profile.and_then(|p| p.display))
        .unwrap_or(defaults.display);
    session.width = args
        .width
        .or(profile.and_then(|p| p.width))
        .unwrap_or(defaults.width);
    session.timestamps = if args.timestamp.is_empty() {
        defaults.timestamps.clone()
    } else {
        args.timestamp.iter().copied().map(Into::into).collect()
    };

    session.log_file = args
        .logfile
        .clone()
        .or_else(|| profile.and_then(|p| p.log_file.clone()));
    session.log_direction = !args.plain_log;
    session.quiet = args.quiet;

    session.commands = args.commands.clone();
    session.input_format = args.input_format.into();
    session.prompt = args.prompt.clone().unwrap_or_else(|| defaults.prompt.clone());
    session.prompt_command = args.prompt_cmd.clone();
    session.monitor = args.monitor;

    session.validate()?;
    Ok(session)
}

/// Check what loading alone does not: addresses and value ranges.
pub fn validate_config(config: &SerTermConfig) -> SerTermResult<()> {
    seconds(config.defaults.timeout, "timeout")?;
    seconds(config.defaults.connect_timeout, "connect timeout")?;
    if config.defaults.width == 0 {
        return Err(SerTermError::Config {
            message: "defaults: width must be at least 1".to_string(),
        });
    }

    for device in &config.devices {
        Endpoint::parse(&device.address).map_err(|e| SerTermError::Config {
            message: format!("device '{}': {}", device.name, e),
        })?;
        if device.width == Some(0) {
            return Err(SerTermError::Config {
                message: format!("device '{}': width must be at least 1", device.name),
            });
        }
        if device.baud_rate == Some(0) {
            return Err(SerTermError::Config {
                message: format!("device '{}': baud rate must be positive", device.name),
            });
        }
    }
    Ok(())
}

fn execute_config_command(
    args: ConfigArgs,
    writer: &ConsoleWriter,
    config: &SerTermConfig,
    config_manager: &ConfigManager,
) -> SerTermResult<()> {
    match args.command {
        ConfigCommand::Show => {
            writer.write_config(config)?;
            Ok(())
        }
        ConfigCommand::Validate { file } => {
            match file {
                Some(path) => {
                    let loaded = ConfigManager::load_config_from_path(&path)?;
                    validate_config(&loaded)?;
                    writer.write_message(&format!(
                        "Configuration file '{}' is valid",
                        path.display()
                    ))?;
                }
                None => {
                    validate_config(config)?;
                    writer.write_message("Current configuration is valid")?;
                }
            }
            Ok(())
        }
        ConfigCommand::Init { output, global } => {
            let path = if global {
                config_manager.init_global_config()?
            } else {
                let dir = match output {
                    Some(dir) => dir,
                    None => std::env::current_dir().map_err(|e| SerTermError::Config {
                        message: format!("Failed to get current directory: {}", e),
                    })?,
                };
                config_manager.init_project_config(&dir)?
            };
            writer.write_message(&format!("Configuration initialized at '{}'", path.display()))?;
            Ok(())
        }
    }
}
