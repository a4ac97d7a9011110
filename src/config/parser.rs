//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        EnvManager::load_env_file(self.cli.debug)?;
        self.build(|key| std::env::var(key).ok())
    }

    /// Build from defaults, `lookup` and CLI overrides, then validate
    pub fn build<F>(&self, lookup: F) -> Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        config.merge_from_lookup(lookup)?;
        self.apply_cli_overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) {
        if let Some(method) = self.cli.probe_method {
            config.probe_method = method;
        }

        if let Some(port) = self.cli.probe_port {
            config.probe_port = port;
        }

        if self.cli.from_service {
            config.content_download_from_service = true;
        }

        if self.cli.no_color || self.cli.json {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        // CLI-only settings
        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Reference host: {}", config.reference_host));
    summary.push(format!("Content download: {} (cap {} ms)", config.content_download_url, config.content_download_cap_ms));
    summary.push(format!("General download: {} (cap {} ms)", config.general_download_url, config.general_download_cap_ms));
    summary.push(format!("Upload: {} ({} / {} bytes)", config.upload_url, config.content_upload_bytes, config.general_upload_bytes));
    summary.push(format!("Probe: {:?} port {} timeout {} ms", config.probe_method, config.probe_port, config.probe_timeout_ms));
    summary.push(format!("Stage pause: {} ms", config.stage_pause_ms));
    summary.push(format!("Services: {}", config.services.len()));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
