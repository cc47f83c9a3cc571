//! hostsweep: run an installer once on every agent of a Mesos cluster.
//!
//! Registers a framework with the master, launches one installer task per
//! distinct agent hostname as offers arrive, and exits once every agent it
//! has seen reports the task finished.
//!
//! # Usage
//!
//! ```text
//! hostsweep 10.0.0.1 http://10.0.0.9/cni http://10.0.0.9/cni vsd.example:8443
//! hostsweep --config hostsweep.toml --launch-interval 0s master:5050 URL ARG1 ARG2
//! ```

mod install;

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use hostsweep_core::{InstallerConfig, Payload};
use hostsweep_scheduler::RunOutcome;

#[derive(Parser)]
#[command(name = "hostsweep", about = "Install a payload on every Mesos agent exactly once")]
struct Cli {
    /// Mesos master address (host, host:port or http://host:port).
    master: String,

    /// Base URL the installer script is fetched from.
    payload_url: String,

    /// First parameter forwarded verbatim to the installer.
    first_param: String,

    /// Second parameter forwarded verbatim to the installer.
    second_param: String,

    /// Optional hostsweep.toml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Framework name to register under.
    #[arg(long)]
    name: Option<String>,

    /// User tasks run as (empty lets the master decide).
    #[arg(long)]
    user: Option<String>,

    /// Installer script name under the payload URL.
    #[arg(long)]
    script: Option<String>,

    /// Minimum spacing between launches, e.g. "2s" or "0s".
    #[arg(long)]
    launch_interval: Option<String>,

    /// Warn after this long without progress, e.g. "5m".
    #[arg(long)]
    stall_timeout: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Load the config file (if any) and apply flag overrides on top.
    fn installer_config(&self) -> anyhow::Result<InstallerConfig> {
        let mut config = match &self.config {
            Some(path) => InstallerConfig::from_file(path)?,
            None => InstallerConfig::default(),
        };

        if let Some(name) = &self.name {
            config.framework.name = name.clone();
        }
        if let Some(user) = &self.user {
            config.framework.user = user.clone();
        }
        if let Some(script) = &self.script {
            config.launch.script = script.clone();
        }
        if let Some(interval) = &self.launch_interval {
            config.launch.interval = interval.clone();
        }
        if let Some(timeout) = &self.stall_timeout {
            config.watchdog.stall_timeout = timeout.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn payload(&self, config: &InstallerConfig) -> Payload {
        Payload::new(
            &self.payload_url,
            &config.launch.script,
            &config.launch.interpreter,
            [self.first_param.clone(), self.second_param.clone()],
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = cli.installer_config()?;
    let payload = cli.payload(&config);

    match install::run_install(cli.master.clone(), payload, &config).await? {
        RunOutcome::Completed { hosts } => {
            info!(hosts, "installation complete");
            Ok(())
        }
        RunOutcome::Disconnected { progress } => {
            error!(
                completed = progress.completed,
                known = progress.known,
                stalled = ?progress.stalled,
                "connection to master lost before installation completed"
            );
            anyhow::bail!(
                "installation incomplete: {}/{} hosts finished",
                progress.completed,
                progress.known
            )
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,hostsweep=debug"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["hostsweep"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn positional_arguments_build_payload() {
        let cli = parse(&["10.0.0.1", "http://repo/cni", "http://repo/cni", "vsd:8443"]);
        let config = cli.installer_config().unwrap();
        let payload = cli.payload(&config);

        assert_eq!(cli.master, "10.0.0.1");
        assert_eq!(payload.script_uri(), "http://repo/cni/install.py");
        assert_eq!(payload.params, ["http://repo/cni".to_string(), "vsd:8443".to_string()]);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&[
            "--name",
            "cni-rollout",
            "--launch-interval",
            "0s",
            "--script",
            "install_cni.py",
            "m",
            "u",
            "a",
            "b",
        ]);
        let config = cli.installer_config().unwrap();

        assert_eq!(config.framework.name, "cni-rollout");
        assert!(config.launch_interval().unwrap().is_zero());
        assert_eq!(cli.payload(&config).script_uri(), "u/install_cni.py");
    }

    #[test]
    fn invalid_override_is_rejected() {
        let cli = parse(&["--stall-timeout", "never", "m", "u", "a", "b"]);
        assert!(cli.installer_config().is_err());
    }

    #[test]
    fn missing_positional_is_an_error() {
        assert!(Cli::try_parse_from(["hostsweep", "m", "u", "a"]).is_err());
    }
}
