use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::job::{JobKind, JobSpec};

/// Identifier used to compute per-app configuration directories.
#[derive(Clone, Copy)]
pub struct AppId {
    /// Reverse-DNS style qualifier, e.g. `"com"`.
    pub qualifier: &'static str,
    /// Organization or vendor name, e.g. `"local"`.
    pub organization: &'static str,
    /// Application name, e.g. `"cohost"`.
    pub application: &'static str,
}

/// Application configuration persisted to `config.toml`.
///
/// Every section has defaults, so a partial file is valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Tracing level to use if `RUST_LOG` is not set (e.g. `"info"`).
    pub log_level: String,
    /// KV/memory directory; the platform data dir when unset.
    pub data_dir: Option<String>,
    /// Who the agent is.
    pub agent: AgentCfg,
    /// Tick period, timeouts and per-job timing.
    pub scheduler: SchedulerCfg,
    /// Data gateway endpoint.
    pub gateway: GatewayCfg,
    /// Text generation endpoint.
    pub generation: GenerationCfg,
    /// Speech endpoint.
    pub speech: SpeechCfg,
    /// Comment ingestion behaviour.
    pub chat: ChatCfg,
    /// Peer-room behaviour.
    pub peer: PeerCfg,
    /// Animation catalog the generator must choose from.
    pub animations: Vec<String>,
}

/// Persona settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentCfg {
    /// Agent id used with the gateway.
    pub id: String,
    /// Name shown to viewers and peers.
    pub display_name: String,
    /// Short persona description fed to generation.
    pub persona: String,
    /// Background lore fed to generation.
    pub lore: String,
    /// Whether the agent takes part in the peer room.
    pub in_peer_chat: bool,
    /// Shared peer room id.
    pub room_id: String,
    /// Gift type that always gets a spoken thank-you.
    pub special_gift: String,
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerCfg {
    /// Tick period (ms).
    pub tick_ms: u64,
    /// Upper bound on a single job run (ms).
    pub job_timeout_ms: u64,
    /// Per-job overrides keyed by job name (`chat`, `gifts`, ...).
    pub jobs: BTreeMap<String, JobOverride>,
}

/// Optional timing override for one job.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JobOverride {
    /// Replacement priority.
    pub priority: Option<u32>,
    /// Replacement minimum interval (ms).
    pub min_interval_ms: Option<u64>,
}

/// Data gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayCfg {
    /// Base URL, e.g. `http://127.0.0.1:3000/api`.
    pub base_url: String,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

/// Generation service settings (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationCfg {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Token budget for `SizeClass::Small`.
    pub small_tokens: u32,
    /// Token budget for `SizeClass::Medium`.
    pub medium_tokens: u32,
    /// Token budget for `SizeClass::Large`.
    pub large_tokens: u32,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

/// Speech service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechCfg {
    /// Base URL; speech is disabled when unset.
    pub base_url: Option<String>,
    /// Voice id passed through to the service.
    pub voice: String,
    /// Per-request timeout (ms).
    pub timeout_ms: u64,
}

/// Comment ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatCfg {
    /// Move the watermark to "now" even when the fetch failed.
    pub advance_watermark_on_fetch_error: bool,
}

/// Peer-room settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PeerCfg {
    /// Room messages fetched per run.
    pub history_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            data_dir: None,
            agent: AgentCfg::default(),
            scheduler: SchedulerCfg::default(),
            gateway: GatewayCfg::default(),
            generation: GenerationCfg::default(),
            speech: SpeechCfg::default(),
            chat: ChatCfg::default(),
            peer: PeerCfg::default(),
            animations: default_animations(),
        }
    }
}

impl Default for AgentCfg {
    fn default() -> Self {
        Self {
            id: "cohost".to_string(),
            display_name: "Cohost".to_string(),
            persona: "A cheerful, quick-witted stream co-host.".to_string(),
            lore: String::new(),
            in_peer_chat: false,
            room_id: "lobby".to_string(),
            special_gift: "rocket".to_string(),
        }
    }
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self { tick_ms: 1_000, job_timeout_ms: 120_000, jobs: BTreeMap::new() }
    }
}

impl Default for GatewayCfg {
    fn default() -> Self {
        Self { base_url: "http://127.0.0.1:3000/api".to_string(), timeout_ms: 15_000 }
    }
}

impl Default for GenerationCfg {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "COHOST_GENERATION_API_KEY".to_string(),
            small_tokens: 60,
            medium_tokens: 160,
            large_tokens: 400,
            timeout_ms: 60_000,
        }
    }
}

impl Default for SpeechCfg {
    fn default() -> Self {
        Self { base_url: None, voice: "default".to_string(), timeout_ms: 60_000 }
    }
}

impl Default for ChatCfg {
    fn default() -> Self {
        Self { advance_watermark_on_fetch_error: true }
    }
}

impl Default for PeerCfg {
    fn default() -> Self {
        Self { history_limit: 10 }
    }
}

fn default_animations() -> Vec<String> {
    ["idle", "wave", "dance", "laugh", "nod", "clap", "think", "bow", "cheer", "shrug"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl SchedulerCfg {
    /// The job registry: built-in timing with overrides applied, in default order.
    ///
    /// Unknown job names in `jobs` are rejected.
    pub fn job_specs(&self) -> Result<Vec<JobSpec>> {
        for name in self.jobs.keys() {
            if JobKind::from_name(name).is_none() {
                bail!("unknown job {name:?} in [scheduler.jobs]");
            }
        }
        let specs = JobSpec::default_registry()
            .into_iter()
            .map(|mut spec| {
                if let Some(o) = self.jobs.get(spec.kind.name()) {
                    spec.priority = o.priority.unwrap_or(spec.priority);
                    spec.min_interval_ms = o.min_interval_ms.unwrap_or(spec.min_interval_ms);
                }
                spec
            })
            .collect();
        Ok(specs)
    }
}

/// Return the configuration directory for this app, creating it if needed.
pub fn config_dir(app: &AppId) -> Result<PathBuf> {
    let pd = project_dirs(app)?;
    let dir = pd.config_dir().to_path_buf();
    fs::create_dir_all(&dir).with_context(|| format!("create config dir {}", dir.display()))?;
    Ok(dir)
}

/// Directory for the KV store: `cfg.data_dir` or the platform data dir.
pub fn data_dir(app: &AppId, cfg: &Config) -> Result<PathBuf> {
    match &cfg.data_dir {
        Some(dir) => Ok(PathBuf::from(dir)),
        None => Ok(project_dirs(app)?.data_dir().join("kv")),
    }
}

fn project_dirs(app: &AppId) -> Result<ProjectDirs> {
    ProjectDirs::from(app.qualifier, app.organization, app.application)
        .ok_or_else(|| anyhow::anyhow!("failed to resolve ProjectDirs"))
}

/// Load `config.toml` from the app config dir or create a default one.
pub fn load_or_init(app: &AppId) -> Result<Config> {
    let path = config_dir(app)?.join("config.toml");
    if path.exists() {
        load_from(&path)
    } else {
        let cfg = Config::default();
        save_config(&path, &cfg)?;
        Ok(cfg)
    }
}

/// Load an explicit config file.
pub fn load_from(path: &Path) -> Result<Config> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    let cfg: Config = toml::from_str(&txt)
        .with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Write `cfg` as pretty TOML.
pub fn save_config(path: &Path, cfg: &Config) -> Result<()> {
    let s = toml::to_string_pretty(cfg)?;
    fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
