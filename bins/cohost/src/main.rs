mod catalog;
mod clock;
mod composer;
mod jobs;
mod module;
mod scheduler;
mod selector;
mod services;
#[cfg(feature = "web-api")]
mod status;
#[cfg(test)]
mod testkit;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use cohost_core::cfg::{self, AppId, Config};
use cohost_core::{logx, store};
use tokio::sync::watch;
use tracing::{error, info};

use crate::clock::{Clock, SystemClock};
use crate::jobs::Cohost;
use crate::module::{Module, ModuleCtx};
use crate::scheduler::Scheduler;
use crate::services::Services;

const APP: AppId = AppId {
    qualifier: "com",
    organization: "local",
    application: env!("CARGO_PKG_NAME"),
};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = "Livestream co-host agent")]
struct Cli {
    /// Config file; defaults to config.toml in the platform config dir.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log filter used when RUST_LOG is unset (overrides `log_level`).
    #[arg(long)]
    log: Option<String>,
    /// Serve GET /status on this address (needs the `web-api` feature).
    #[arg(long)]
    status_addr: Option<SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = match &cli.config {
        Some(path) => cfg::load_from(path)?,
        None => cfg::load_or_init(&APP)?,
    };
    logx::init(cli.log.as_deref().unwrap_or(&cfg.log_level));
    info!("{} boot", APP.application);

    #[cfg(feature = "rt-single")]
    let rt = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    #[cfg(not(feature = "rt-single"))]
    let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;

    rt.block_on(run(cfg, cli.status_addr))
}

async fn run(cfg: Config, status_addr: Option<SocketAddr>) -> anyhow::Result<()> {
    let data_dir = cfg::data_dir(&APP, &cfg)?;
    let kv = store::open_default(&data_dir).with_context(|| format!("open store {}", data_dir.display()))?;
    info!("store at {}", kv.root().display());

    let specs = cfg.scheduler.job_specs()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let services = Services::from_config(&cfg)?;
    let cohost = Cohost::new(&cfg, services, kv.clone(), clock.clone());
    let scheduler = Scheduler::new(
        specs,
        cohost,
        clock,
        Duration::from_millis(cfg.scheduler.tick_ms),
        Duration::from_millis(cfg.scheduler.job_timeout_ms),
    )?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let ctx = ModuleCtx { kv, jobs: scheduler.handle(), shutdown: shutdown_rx };

    let mut modules: Vec<Box<dyn Module>> = vec![Box::new(scheduler)];
    match status_addr {
        #[cfg(feature = "web-api")]
        Some(addr) => modules.push(Box::new(status::StatusServer::new(addr))),
        #[cfg(not(feature = "web-api"))]
        Some(addr) => tracing::warn!("--status-addr {} ignored: built without the web-api feature", addr),
        None => {}
    }

    let mut handles = Vec::with_capacity(modules.len());
    for m in modules {
        let name = m.name();
        info!("starting module {}", name);
        handles.push((name, m.spawn(ctx.clone())));
    }

    tokio::signal::ctrl_c().await.context("listen for ctrl-c")?;
    info!("received Ctrl+C, shutting down");
    let _ = shutdown_tx.send(true);

    for (name, handle) in handles {
        match handle.await {
            Ok(Ok(())) => info!("module {} stopped", name),
            Ok(Err(e)) => error!("module {} failed: {:#}", name, e),
            Err(e) => error!("module {} panicked: {}", name, e),
        }
    }
    Ok(())
}
