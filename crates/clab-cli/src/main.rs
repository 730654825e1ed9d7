mod cli;

use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{bail, eyre};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use clab_core::models::{LabelFilter, Settings};
use clab_core::services::exec::exec_in_lab;
use clab_core::services::fs_utils::{self, LAB_DIR_MODE};
use clab_core::services::kinds::builtin_profiles;
use clab_core::services::lab::LabProvisioner;
use clab_core::services::mysocketio;
use clab_core::services::registry::KindRegistry;
use clab_core::services::runtime::DockerCli;
use clab_core::services::state::LaunchSpecStore;
use clab_core::services::templates::TemplateCatalog;
use clab_core::services::topology_loader;

use crate::cli::{Cli, Command, ExecArgs};

const DEBUG_LOG: &str = "clab-debug.log";

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _guard = setup_logging(cli.debug);

    let mut settings = Settings::from_env();
    if let Some(dir) = cli.templates_dir {
        settings.templates_dir = dir;
    }

    match cli.command {
        Command::Provision { topo } => provision(&settings, &topo).await,
        Command::Exec(args) => {
            sudo_check()?;
            exec(args).await
        }
        Command::Publish { topo, via } => {
            sudo_check()?;
            publish(&topo, &via).await
        }
    }
}

/// Human-readable logs on stderr, plus a debug-level log file with `--debug`.
/// The returned guard flushes the file writer and must outlive `main`.
fn setup_logging(debug: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    if !debug {
        tracing_subscriber::registry().with(stderr).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::never(".", DEBUG_LOG);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(EnvFilter::new("debug"));
    tracing_subscriber::registry().with(stderr).with(file).init();
    Some(guard)
}

#[cfg(unix)]
fn sudo_check() -> color_eyre::Result<()> {
    // SAFETY: geteuid has no preconditions and cannot fail.
    if unsafe { libc::geteuid() } != 0 {
        bail!("this command requires root privileges, run with sudo");
    }
    Ok(())
}

#[cfg(not(unix))]
fn sudo_check() -> color_eyre::Result<()> {
    Ok(())
}

async fn provision(settings: &Settings, topo: &std::path::Path) -> color_eyre::Result<()> {
    let topology = Arc::new(topology_loader::load(topo)?);
    let catalog = Arc::new(TemplateCatalog::from_profiles(settings, builtin_profiles()));
    let registry = Arc::new(KindRegistry::builtin(catalog));

    let lab_root = topology.lab_root();
    fs_utils::create_directory(&lab_root, LAB_DIR_MODE)?;
    tracing::info!("lab={}, provisioning into {}", topology.name(), lab_root.display());

    let lab = LabProvisioner::new(registry, topology.clone());
    let report = lab.provision_all(topology.declarations()).await;

    for outcome in &report.outcomes {
        let elapsed = outcome.finished_at - outcome.started_at;
        match &outcome.result {
            Ok(spec) => println!(
                "{:<12} {:<8} ok      {} ({} ms)",
                outcome.node,
                outcome.kind,
                spec.name,
                elapsed.num_milliseconds()
            ),
            Err(e) => println!("{:<12} {:<8} failed  {e}", outcome.node, outcome.kind),
        }
    }

    let store = LaunchSpecStore::new(&lab_root);
    store.save(&report.launch_specs()).await?;
    tracing::debug!("launch specs written to {}", store.path().display());

    let failures = report.failures();
    if !failures.is_empty() {
        bail!("{} of {} nodes failed to provision", failures.len(), report.outcomes.len());
    }
    Ok(())
}

async fn exec(args: ExecArgs) -> color_eyre::Result<()> {
    let lab = match (args.topo, args.name) {
        (Some(topo), _) => topology_loader::load(&topo)?.name().to_string(),
        (None, Some(name)) => name,
        (None, None) => bail!("provide either a topology file or a lab name"),
    };
    let labels = LabelFilter::parse_all(&args.labels)?;

    let runtime = DockerCli::new();
    let results = exec_in_lab(&runtime, &lab, &labels, &args.cmd).await?;
    for exec in &results {
        if let Ok(out) = &exec.result {
            if out.exit_code != 0 {
                tracing::warn!("{}: exited with {}", exec.container, out.exit_code);
            }
        }
    }
    Ok(())
}

async fn publish(topo: &std::path::Path, via: &str) -> color_eyre::Result<()> {
    let topology = topology_loader::load(topo)?;
    let declarations = topology.declarations();
    if !declarations.iter().any(|n| n.short_name == via) {
        return Err(eyre!("node {via} is not part of lab {}", topology.name()));
    }

    let runtime = DockerCli::new();
    let container = topology.long_name(via);
    let started = mysocketio::create_tunnels(&runtime, &container, &declarations).await?;
    tracing::info!("lab={}, {started} tunnels started via {container}", topology.name());
    Ok(())
}
