use std::net::SocketAddr;
use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::info;

use cohost_core::job::JobView;
use cohost_core::store::{ns, DefaultKv, KvSerde};

use crate::module::{Module, ModuleCtx};
use crate::scheduler::RegistryHandle;

#[derive(Clone)]
struct AppState {
    kv: DefaultKv,
    jobs: RegistryHandle,
    started: Instant,
}

#[derive(Serialize)]
struct Status {
    heartbeat_count: u64,
    uptime_ms: u64,
    running: usize,
    jobs: Vec<JobView>,
}

/// Read-only `GET /status`: heartbeat count, uptime and the job table.
pub struct StatusServer {
    addr: SocketAddr,
}

impl StatusServer {
    pub fn new(addr: SocketAddr) -> Self { Self { addr } }
}

impl Module for StatusServer {
    fn name(&self) -> &'static str { "status" }

    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>> {
        tokio::spawn(async move {
            let state = AppState { kv: ctx.kv.clone(), jobs: ctx.jobs.clone(), started: Instant::now() };

            let app = Router::new()
                .route("/status", get(status))
                .with_state(state);

            let listener = tokio::net::TcpListener::bind(self.addr).await?;
            info!("status server listening on http://{}", self.addr);

            let mut shutdown = ctx.shutdown.clone();
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown.changed().await;
                })
                .await?;

            Ok(())
        })
    }
}

async fn status(State(state): State<AppState>) -> Json<Status> {
    let heartbeat_count = state.kv.get_t::<u64>(&ns("heartbeat", "count")).ok().flatten().unwrap_or(0);
    Json(Status {
        heartbeat_count,
        uptime_ms: state.started.elapsed().as_millis() as u64,
        running: state.jobs.running_count(),
        jobs: state.jobs.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cohost_core::job::JobSpec;
    use cohost_core::store::open_default;

    #[tokio::test]
    async fn reports_heartbeat_and_registry() {
        let dir = tempfile::tempdir().unwrap();
        let kv = open_default(dir.path()).unwrap();
        kv.put_t(&ns("heartbeat", "count"), &3u64).unwrap();
        let jobs = RegistryHandle::new(JobSpec::default_registry());
        let state = AppState { kv, jobs, started: Instant::now() };

        let Json(body) = status(State(state)).await;
        assert_eq!(body.heartbeat_count, 3);
        assert_eq!(body.running, 0);
        assert_eq!(body.jobs.len(), 7);
        assert_eq!(body.jobs[0].index, 0);
    }
}
