use cohost_core::store::DefaultKv;
use tokio::task::JoinHandle;

use crate::scheduler::RegistryHandle;

/// Shared handles every runtime module receives.
#[derive(Clone)]
pub struct ModuleCtx {
    pub kv: DefaultKv,
    pub jobs: RegistryHandle,
    pub shutdown: tokio::sync::watch::Receiver<bool>,
}

pub trait Module: Send + 'static {
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, ctx: ModuleCtx) -> JoinHandle<anyhow::Result<()>>;
}
