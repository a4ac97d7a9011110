//! Network Speed Tester - Main CLI Application
//!
//! Runs one general or content speed test and prints its progress and report.

use clap::Parser;
use network_speed_tester::{
    cli::Cli,
    config::{display_config_summary, load_config},
    dns::HostResolver,
    error::Result,
    executor::{SpeedTestRunner, TestOrchestrator},
    logging::Logger,
    models::{Config, RunEvent},
    output::{OutputCoordinator, OutputFormatterFactory},
    types::{NetworkStatus, TransportClass},
    BUILD_TIME, GIT_COMMIT, PKG_NAME, VERSION,
};
use std::process;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();

    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(2);
    }

    let use_color = cli.use_colors();
    if let Err(e) = run_application(cli, use_color).await {
        eprintln!("{}", e.format_for_console(use_color));
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli, terminal_color: bool) -> Result<()> {
    if cli.debug {
        eprintln!("{} v{} ({}, built {}, {})", PKG_NAME, VERSION, GIT_COMMIT, BUILD_TIME, env!("TARGET_TRIPLE"));
    }

    let list_services = cli.list_services;
    let assume_offline = cli.assume_offline;
    let config = load_config(cli.clone())?;
    let formatter = OutputFormatterFactory::create_formatter(config.enable_color && terminal_color, config.verbose);

    if list_services {
        println!("{}", formatter.format_service_list(&config.services)?);
        return Ok(());
    }

    if config.debug {
        eprintln!("{}\n", display_config_summary(&config));
    }

    let mode = cli.test_mode(&config)?;
    let logger = Logger::with_config(PKG_NAME, &config);
    let network = if assume_offline {
        NetworkStatus::offline()
    } else {
        check_network(&config, &logger).await
    };

    let coordinator = OutputCoordinator::new(formatter, config.json_output);
    let orchestrator = TestOrchestrator::from_config(config, logger.clone())?;
    let mut runner = SpeedTestRunner::new(orchestrator);
    let mut handle = runner.start(mode, network);

    loop {
        let event = tokio::select! {
            event = handle.next_event() => event,
            _ = tokio::signal::ctrl_c() => {
                runner.cancel();
                logger.warn("Interrupted, run cancelled").log().await;
                return Ok(());
            }
        };

        match event {
            Some(event) => {
                let last = matches!(event, RunEvent::Report(_));
                if let Some(text) = coordinator.render_event(&event)? {
                    println!("{}", text);
                }
                if last {
                    break;
                }
            }
            None => break,
        }
    }

    Ok(())
}

/// Connectivity precondition: the reference host must resolve in time
async fn check_network(config: &Config, logger: &Logger) -> NetworkStatus {
    let resolver = HostResolver::new();
    match resolver.lookup_with_timeout(&config.reference_host, config.probe_timeout()).await {
        Ok(outcome) => {
            logger
                .debug("Network available")
                .field("host", &outcome.host)
                .field("addresses", outcome.addresses.len())
                .field("lookup_ms", outcome.duration.as_millis() as u64)
                .log()
                .await;
            NetworkStatus::online(TransportClass::Unknown)
        }
        Err(e) => {
            logger.warn("Network unavailable").error_info(&e).log().await;
            NetworkStatus::offline()
        }
    }
}
