use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Application registration file holding the client credentials
    #[serde(default = "default_appreg")]
    pub appreg: PathBuf,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            appreg: default_appreg(),
        }
    }
}

fn default_token_url() -> String {
    "https://auth.scp.splunk.com/token".to_string()
}

fn default_appreg() -> PathBuf {
    PathBuf::from("./appreg.json")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Base URL; the tenant and ingest path are appended per request
    #[serde(default = "default_ingest_url")]
    pub url: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            url: default_ingest_url(),
        }
    }
}

fn default_ingest_url() -> String {
    "https://api.scp.splunk.com".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout for both the token and the ingest endpoint
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Batches close before their byte size reaches this value
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Envelope allowance added to each record's encoded length
    #[serde(default = "default_record_overhead")]
    pub record_overhead: u64,
    #[serde(default)]
    pub oversize: OversizePolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
            max_events: default_max_events(),
            record_overhead: default_record_overhead(),
            oversize: OversizePolicy::default(),
        }
    }
}

fn default_max_bytes() -> u64 {
    1024 * 1024
}

fn default_max_events() -> usize {
    500
}

fn default_record_overhead() -> u64 {
    38
}

/// What to do with a record that alone reaches the byte ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OversizePolicy {
    /// Send it in a batch of its own
    #[default]
    Admit,
    /// Fail the run
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Capacity of the record and batch channels between stages
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_channel_capacity() -> usize {
    1000
}
