//! Command-line interface of the `nst` shell

use crate::{
    error::Result,
    models::Config,
    types::{ProbeMethod, TestMode},
};
use clap::Parser;

/// Network Speed Tester - measures latency, jitter, download and upload speed
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Run a content test against a known service (see --list-services)
    #[arg(short, long, value_name = "NAME")]
    pub service: Option<String>,

    /// Run a content test against an arbitrary host
    #[arg(short, long, value_name = "HOST")]
    pub domain: Option<String>,

    /// Run a general test against the reference endpoint
    #[arg(short, long)]
    pub general: bool,

    /// List the services available for content tests and exit
    #[arg(long)]
    pub list_services: bool,

    /// How reachability is probed: tcp or http
    #[arg(long, value_name = "METHOD", value_parser = parse_probe_method)]
    pub probe_method: Option<ProbeMethod>,

    /// Port used by the TCP reachability probe
    #[arg(long, value_name = "PORT", value_parser = clap::value_parser!(u16).range(1..))]
    pub probe_port: Option<u16>,

    /// Download content tests from the service's own domain instead of the reference file
    #[arg(long)]
    pub from_service: bool,

    /// Treat the network as unavailable without checking
    #[arg(long)]
    pub assume_offline: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.list_services {
            return Ok(());
        }

        let selected = [self.service.is_some(), self.domain.is_some(), self.general]
            .iter()
            .filter(|&&flag| flag)
            .count();

        match selected {
            0 => Err("Must specify one of --service, --domain or --general".to_string()),
            1 => {
                if self.from_service && self.general {
                    return Err("--from-service only applies to content tests".to_string());
                }
                Ok(())
            }
            _ => Err("--service, --domain and --general are mutually exclusive".to_string()),
        }
    }

    /// Resolve the selected test mode against the service catalog
    pub fn test_mode(&self, config: &Config) -> Result<TestMode> {
        if let Some(ref name) = self.service {
            return TestMode::for_service(name, &config.services);
        }

        if let Some(ref domain) = self.domain {
            let domain = domain.trim();
            return Ok(TestMode::content(domain, domain));
        }

        Ok(TestMode::General)
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }
}

fn parse_probe_method(s: &str) -> std::result::Result<ProbeMethod, String> {
    s.parse::<ProbeMethod>().map_err(|e| e.to_string())
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    cfg!(unix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_service() {
        let cli = Cli::parse_from(["nst", "--service", "youtube", "--verbose"]);
        assert_eq!(cli.service.as_deref(), Some("youtube"));
        assert!(cli.verbose);
        assert!(cli.validate().is_ok());

        let mode = cli.test_mode(&Config::default()).unwrap();
        assert_eq!(mode, TestMode::content("YouTube", "googlevideo.com"));
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "nst",
            "--domain", "example.com",
            "--probe-method", "http",
            "--probe-port", "8443",
            "--from-service",
            "--json",
            "--no-color",
            "--debug",
        ]);

        assert_eq!(cli.probe_method, Some(ProbeMethod::HttpHead));
        assert_eq!(cli.probe_port, Some(8443));
        assert!(cli.from_service);
        assert!(cli.json);
        assert!(!cli.use_colors());
        assert!(cli.validate().is_ok());
        assert_eq!(
            cli.test_mode(&Config::default()).unwrap(),
            TestMode::content("example.com", "example.com")
        );
    }

    #[test]
    fn test_general_mode() {
        let cli = Cli::parse_from(["nst", "-g"]);
        assert!(cli.validate().is_ok());
        assert_eq!(cli.test_mode(&Config::default()).unwrap(), TestMode::General);
    }

    #[test]
    fn test_mode_selection_is_required_and_exclusive() {
        assert!(Cli::parse_from(["nst"]).validate().is_err());
        assert!(Cli::parse_from(["nst", "--general", "--service", "TikTok"]).validate().is_err());
        assert!(Cli::parse_from(["nst", "--general", "--from-service"]).validate().is_err());
        assert!(Cli::parse_from(["nst", "--list-services"]).validate().is_ok());
    }

    #[test]
    fn test_conflicting_color_flags() {
        let cli = Cli::parse_from(["nst", "--general", "--color", "--no-color"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_invalid_values_rejected_by_parser() {
        assert!(Cli::try_parse_from(["nst", "--general", "--probe-method", "icmp"]).is_err());
        assert!(Cli::try_parse_from(["nst", "--general", "--probe-port", "0"]).is_err());
    }

    #[test]
    fn test_unknown_service() {
        let cli = Cli::parse_from(["nst", "--service", "Myspace"]);
        assert!(cli.test_mode(&Config::default()).is_err());
    }
}
