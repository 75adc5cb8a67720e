use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use shopfloor_ops::{
    alerts::{default_rules, evaluate_rules, AlertMatch, AlertThresholds, Snapshot},
    auth::RbacService,
    config,
    datasource::{fetch_snapshot, MockDataSource},
};
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Alerts(args) => handle_alerts_command(args, cli.json).await?,
        Commands::Capabilities(args) => handle_capabilities_command(args, cli.json)?,
        Commands::Roles => handle_roles_command(cli.json)?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    name = "shopfloor",
    about = "Evaluate alert rules and inspect role capabilities offline",
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the alert rules against a snapshot
    Alerts(AlertsArgs),
    /// List the capabilities a role grants
    Capabilities(CapabilitiesArgs),
    /// List the known roles
    Roles,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct AlertsArgs {
    #[arg(long, help = "JSON snapshot file (machines, workOrders, shippingOrders, ecos, events, asOf)")]
    snapshot: Option<PathBuf>,
    #[arg(long, action = ArgAction::SetTrue, help = "Use the built-in mock fixtures")]
    mock: bool,
}

#[derive(Args)]
struct CapabilitiesArgs {
    #[arg(help = "Role identifier, e.g. technician")]
    role: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleSummary {
    name: String,
    description: String,
    capabilities: Vec<String>,
}

async fn handle_alerts_command(args: AlertsArgs, json: bool) -> Result<()> {
    let snapshot = load_snapshot(&args).await?;
    let thresholds = configured_thresholds();
    let matches = evaluate_rules(default_rules(), &snapshot, &thresholds);

    let output = if json {
        to_json(&matches)?
    } else {
        render_matches(&matches)
    };
    println!("{}", output);
    Ok(())
}

fn handle_capabilities_command(args: CapabilitiesArgs, json: bool) -> Result<()> {
    let capabilities = capabilities_for(&args.role)?;
    let output = if json {
        to_json(&capabilities)?
    } else {
        capabilities.join("\n")
    };
    println!("{}", output);
    Ok(())
}

fn handle_roles_command(json: bool) -> Result<()> {
    let roles = role_summaries();
    let output = if json {
        to_json(&roles)?
    } else {
        render_roles(&roles)
    };
    println!("{}", output);
    Ok(())
}

async fn load_snapshot(args: &AlertsArgs) -> Result<Snapshot> {
    match (&args.snapshot, args.mock) {
        (Some(path), _) => read_snapshot(path),
        (None, true) => fetch_snapshot(&MockDataSource::seeded())
            .await
            .context("failed to read mock fixtures"),
        (None, false) => Err(anyhow!("pass either --snapshot <file> or --mock")),
    }
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot {}", path.display()))
}

/// Thresholds from the layered config when it loads, defaults otherwise
fn configured_thresholds() -> AlertThresholds {
    match config::load_config() {
        Ok(cfg) => cfg.alerts,
        Err(err) => {
            debug!(error = %err, "using default alert thresholds");
            AlertThresholds::default()
        }
    }
}

fn capabilities_for(role: &str) -> Result<Vec<String>> {
    let rbac = RbacService::new();
    if rbac.get_role(role).is_none() {
        return Err(anyhow!("unknown role '{}'", role));
    }
    Ok(rbac.effective_capabilities(role))
}

fn role_summaries() -> Vec<RoleSummary> {
    let rbac = RbacService::new();
    rbac.get_all_roles()
        .into_iter()
        .map(|role| RoleSummary {
            name: role.name.clone(),
            description: role.description.clone(),
            capabilities: rbac.effective_capabilities(&role.name),
        })
        .collect()
}

fn render_matches(matches: &[AlertMatch]) -> String {
    if matches.is_empty() {
        return "No alerts.".to_string();
    }
    matches
        .iter()
        .map(|m| format!("[{}] {}: {}\n    {}", m.severity, m.id, m.title, m.message))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_roles(roles: &[RoleSummary]) -> String {
    roles
        .iter()
        .map(|role| {
            format!(
                "{:<12} {:>2} capabilities  {}",
                role.name,
                role.capabilities.len(),
                role.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::io::Write;

    fn mock_args() -> AlertsArgs {
        AlertsArgs {
            snapshot: None,
            mock: true,
        }
    }

    #[test]
    fn alerts_requires_exactly_one_source() {
        assert!(Cli::try_parse_from(["shopfloor", "alerts"]).is_err());
        assert!(Cli::try_parse_from(["shopfloor", "alerts", "--mock", "--snapshot", "s.json"]).is_err());
        let cli = Cli::try_parse_from(["shopfloor", "--json", "alerts", "--mock"]).unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Alerts(ref a) if a.mock));
    }

    #[tokio::test]
    async fn mock_fixtures_render_every_seeded_alert() {
        let snapshot = load_snapshot(&mock_args()).await.unwrap();
        let matches = evaluate_rules(default_rules(), &snapshot, &AlertThresholds::default());
        assert_eq!(matches.len(), 5);

        let text = render_matches(&matches);
        assert!(text.contains("[warning] machines-down: "));
        assert_eq!(text.lines().count(), 10);

        let json: serde_json::Value = serde_json::from_str(&to_json(&matches).unwrap()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn snapshot_file_is_evaluated() {
        let mut snapshot = Snapshot::empty(Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        snapshot.machines = fetch_snapshot(&MockDataSource::seeded())
            .await
            .unwrap()
            .machines;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&snapshot).unwrap().as_bytes())
            .unwrap();

        let args = AlertsArgs {
            snapshot: Some(file.path().to_path_buf()),
            mock: false,
        };
        let loaded = load_snapshot(&args).await.unwrap();
        let matches = evaluate_rules(default_rules(), &loaded, &AlertThresholds::default());
        let ids: Vec<_> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["machines-down"]);
    }

    #[test]
    fn empty_evaluation_says_so() {
        assert_eq!(render_matches(&[]), "No alerts.");
    }

    #[test]
    fn unknown_role_is_an_error() {
        assert!(capabilities_for("janitor").is_err());
        let caps = capabilities_for("technician").unwrap();
        assert!(caps.contains(&"machines:update".to_string()));
        assert!(!caps.contains(&"ecos:review".to_string()));
    }

    #[test]
    fn roles_table_has_one_line_per_role() {
        let roles = role_summaries();
        assert_eq!(roles.len(), 6);
        assert_eq!(render_roles(&roles).lines().count(), 6);
    }
}
