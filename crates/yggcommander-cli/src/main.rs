#![deny(unsafe_code)]

//! YggCommander CLI — manage a local Yggdrasil node from the shell.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use yggcommander_config::AppConfig;
use yggcommander_core::{Commander, CommanderError};

/// YggCommander — inspect and reconfigure a running Yggdrasil daemon.
#[derive(Parser)]
#[command(name = "yggcommander", version, about, long_about = None)]
struct Cli {
    /// Path to the YggCommander settings file.
    #[arg(short, long, default_value = "yggcommander.toml")]
    config: PathBuf,

    /// Admin socket path (overrides settings and YGGDRASIL_SOCKET).
    #[arg(long)]
    socket: Option<PathBuf>,

    /// Daemon config file path (overrides settings and YGGDRASIL_CONFIG).
    #[arg(long)]
    daemon_config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report whether the admin socket is present.
    Status,

    /// Show this node's address, key and subnet.
    #[command(name = "self")]
    SelfInfo,

    /// List connected peers.
    Peers,

    /// Print a peering string other nodes can use.
    Invite,

    /// Issue a raw admin RPC and print its result.
    Call {
        /// RPC method name, e.g. getSelf.
        method: String,

        /// Parameters as a JSON object.
        #[arg(long)]
        params: Option<String>,
    },

    /// Add public peers from the peer directory to the daemon config.
    Bootstrap {
        /// Preferred region substring (repeatable). Defaults to the settings file.
        #[arg(long = "region")]
        regions: Vec<String>,
    },

    /// Turn the exit-node role on or off.
    ExitNode {
        #[command(subcommand)]
        action: Toggle,
    },

    /// Edit the configured peer list.
    Peer {
        #[command(subcommand)]
        action: PeerAction,
    },

    /// Inspect configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum Toggle {
    Enable,
    Disable,
}

#[derive(Subcommand)]
enum PeerAction {
    /// Add a peering URI to the daemon config.
    Add { uri: String },
    /// Remove a peering URI from the daemon config.
    Remove { uri: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved settings.
    Show {
        /// Print the daemon's config document instead.
        #[arg(long)]
        daemon: bool,
    },
    /// Check that the settings file parses and validates.
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, found) = load_config(&cli.config).await?;
    let config = resolve(config, &cli, |key| std::env::var(key).ok());

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(filter_directive(cli.verbose, &config))),
        )
        .with_writer(std::io::stderr)
        .init();

    if !found {
        info!(path = %cli.config.display(), "settings file not found, using defaults");
    }

    let output = run(cli.command, &cli.config, found, &config).await?;
    println!("{output}");
    Ok(())
}

/// Execute one subcommand and render what it prints on stdout.
async fn run(
    command: Commands,
    config_path: &Path,
    found: bool,
    config: &AppConfig,
) -> Result<String> {
    let commander = || Commander::from_config(config).map_err(failure);
    match command {
        Commands::Status => render(&commander()?.status()),
        Commands::SelfInfo => render(&commander()?.node_info().await.map_err(failure)?),
        Commands::Peers => render(&commander()?.peers().await.map_err(failure)?),
        Commands::Invite => render(&commander()?.invite().await.map_err(failure)?),
        Commands::Call { method, params } => {
            let params = params.as_deref().map(parse_params).transpose()?;
            let result = commander()?.call_raw(&method, params).await;
            render(&result.map_err(failure)?)
        }
        Commands::Bootstrap { regions } => {
            let regions = region_overrides(regions)?;
            let mut commander = commander()?;
            if !regions.is_empty() {
                let mut settings = config.bootstrap.clone();
                settings.preferred_regions = regions;
                commander = commander.with_bootstrap_settings(settings);
            }
            render(&commander.bootstrap().await.map_err(failure)?)
        }
        Commands::ExitNode { action } => {
            let enabled = matches!(action, Toggle::Enable);
            render(&commander()?.set_exit_node(enabled).await.map_err(failure)?)
        }
        Commands::Peer { action } => {
            let commander = commander()?;
            let outcome = match action {
                PeerAction::Add { uri } => commander.add_configured_peer(&uri).await,
                PeerAction::Remove { uri } => commander.remove_configured_peer(&uri).await,
            };
            render(&outcome.map_err(failure)?)
        }
        Commands::Config { action } => cmd_config(action, config_path, found, config).await,
    }
}

async fn cmd_config(
    action: ConfigAction,
    config_path: &Path,
    found: bool,
    config: &AppConfig,
) -> Result<String> {
    match action {
        ConfigAction::Show { daemon: false } => {
            toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("TOML error: {e}"))
        }
        ConfigAction::Show { daemon: true } => {
            let store = yggcommander_config::ConfigStore::new(&config.daemon.config_path);
            let (document, source) = store.load_with_source().await?;
            info!(path = %store.path().display(), ?source, "daemon config loaded");
            Ok(document.to_pretty_json()?.trim_end().to_string())
        }
        ConfigAction::Validate if found => Ok(format!(
            "Configuration at '{}' is valid.",
            config_path.display()
        )),
        ConfigAction::Validate => Ok(format!(
            "No configuration at '{}'; defaults are valid.",
            config_path.display()
        )),
    }
}

async fn load_config(path: &Path) -> Result<(AppConfig, bool)> {
    if path.exists() {
        let config = AppConfig::load(path)
            .await
            .with_context(|| format!("loading {}", path.display()))?;
        Ok((config, true))
    } else {
        Ok((AppConfig::default(), false))
    }
}

/// Layer environment variables, then command-line flags, over the settings.
fn resolve<F>(mut config: AppConfig, cli: &Cli, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    config.apply_env_overrides(lookup);
    if let Some(socket) = &cli.socket {
        config.daemon.socket_path = socket.clone();
    }
    if let Some(path) = &cli.daemon_config {
        config.daemon.config_path = path.clone();
    }
    config
}

/// Log filter used when `RUST_LOG` is unset.
fn filter_directive(verbose: u8, config: &AppConfig) -> String {
    match verbose {
        0 => config.logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn parse_params(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("--params is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--params must be a JSON object, got {other}"),
    }
}

/// Trim `--region` values. A blank one would match every region, so it is
/// rejected rather than silently widening the pool.
fn region_overrides(regions: Vec<String>) -> Result<Vec<String>> {
    regions
        .into_iter()
        .map(|region| {
            let trimmed = region.trim();
            if trimmed.is_empty() {
                bail!("--region must not be blank");
            }
            Ok(trimmed.to_string())
        })
        .collect()
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn failure(err: CommanderError) -> anyhow::Error {
    debug!(kind = err.kind(), "operation failed");
    anyhow::anyhow!("{err} ({})", err.kind())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use yggcommander_test_utils::{MockAdminSocket, TempDaemonConfig, TestConfigBuilder};

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_parse_subcommands() {
        assert!(matches!(parse(&["yggcommander", "self"]).command, Commands::SelfInfo));
        assert!(matches!(
            parse(&["yggcommander", "exit-node", "enable"]).command,
            Commands::ExitNode { action: Toggle::Enable }
        ));
        let bootstrap = parse(&[
            "yggcommander",
            "bootstrap",
            "--region",
            "germany",
            "--region",
            "japan",
        ]);
        match bootstrap.command {
            Commands::Bootstrap { regions } => assert_eq!(regions, vec!["germany", "japan"]),
            _ => panic!("expected bootstrap"),
        }
        let bad_toggle = Cli::try_parse_from(["yggcommander", "exit-node", "maybe"]);
        assert!(bad_toggle.is_err());
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = parse(&["yggcommander", "--socket", "/tmp/flag.sock", "status"]);
        let config = resolve(AppConfig::default(), &cli, |key| match key {
            "YGGDRASIL_SOCKET" => Some("/tmp/env.sock".to_string()),
            "YGGDRASIL_CONFIG" => Some("/tmp/env.conf".to_string()),
            _ => None,
        });
        assert_eq!(config.daemon.socket_path, PathBuf::from("/tmp/flag.sock"));
        assert_eq!(config.daemon.config_path, PathBuf::from("/tmp/env.conf"));
    }

    #[test]
    fn test_filter_directive() {
        let mut config = AppConfig::default();
        config.logging.level = "warn".to_string();
        assert_eq!(filter_directive(0, &config), "warn");
        assert_eq!(filter_directive(1, &config), "debug");
        assert_eq!(filter_directive(3, &config), "trace");
    }

    #[test]
    fn test_parse_params() {
        assert_eq!(
            Value::Object(parse_params(r#"{"uri": "tcp://a:1"}"#).unwrap()),
            json!({"uri": "tcp://a:1"})
        );
        assert!(parse_params("[1]").is_err());
        assert!(parse_params("{").is_err());
    }

    fn owned(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_region_overrides_trim_and_reject_blank() {
        let trimmed = region_overrides(owned(&[" Germany ", "japan"])).unwrap();
        assert_eq!(trimmed, vec!["Germany", "japan"]);
        assert!(region_overrides(Vec::new()).unwrap().is_empty());
        assert!(region_overrides(owned(&["germany", "  "])).is_err());
        assert!(region_overrides(owned(&[""])).is_err());
    }

    #[tokio::test]
    async fn test_bootstrap_with_blank_region_fails_before_fetching() {
        let fixture = TempDaemonConfig::absent();
        let config = TestConfigBuilder::new().config_path(fixture.path()).build();

        let err = run(
            Commands::Bootstrap {
                regions: vec![String::new()],
            },
            Path::new("yggcommander.toml"),
            false,
            &config,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("--region"), "{err}");
        assert!(!fixture.exists());
    }

    #[tokio::test]
    async fn test_load_config_missing_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, found) = load_config(&dir.path().join("absent.toml")).await.unwrap();
        assert!(!found);
        assert_eq!(config.daemon.peering_port, 9001);
    }

    #[test_log::test(tokio::test)]
    async fn test_exit_node_enable_prints_outcome() {
        let fixture = TempDaemonConfig::absent();
        let config = TestConfigBuilder::new().config_path(fixture.path()).build();

        let out = run(
            Commands::ExitNode { action: Toggle::Enable },
            Path::new("yggcommander.toml"),
            false,
            &config,
        )
        .await
        .unwrap();

        let printed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(printed["enabled"], true);
        assert_eq!(printed["advertised_routes"], json!(["::/0"]));
        assert_eq!(printed["reload"]["success"], true);
        assert_eq!(fixture.read_json().await["TunnelRouting"]["Enable"], true);
    }

    #[tokio::test]
    async fn test_call_prints_raw_result() {
        let mock = MockAdminSocket::replying(json!({"routes": 3})).await;
        let config = TestConfigBuilder::new().socket_path(mock.path()).build();

        let out = run(
            Commands::Call {
                method: "getPaths".to_string(),
                params: None,
            },
            Path::new("yggcommander.toml"),
            false,
            &config,
        )
        .await
        .unwrap();

        assert_eq!(
            serde_json::from_str::<Value>(&out).unwrap(),
            json!({"routes": 3})
        );
    }

    #[tokio::test]
    async fn test_missing_socket_reports_kind() {
        let config = TestConfigBuilder::new()
            .socket_path("/nonexistent/yggdrasil.sock")
            .build();

        let err = run(
            Commands::Peers,
            Path::new("yggcommander.toml"),
            false,
            &config,
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("not_found"));
    }
}
