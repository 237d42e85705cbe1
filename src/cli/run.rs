use crate::auth::{AuthError, Authenticator};
use crate::config::{
    expand_tilde, read_config, resolve_config_path, validate_config, AppRegistration, Config,
    ConfigError, RunParams,
};
use crate::event::EventProperties;
use crate::ingest::{HttpIngestClient, IngestError};
use crate::pipeline::{spawn_interrupt_listener, Pipeline, PipelineError, RunReport};
use crate::source::InputFormat;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("ingest client error: {0}")]
    Ingest(#[from] IngestError),

    #[error("failed to open input: {0}")]
    Io(#[from] std::io::Error),

    #[error("load failed: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Options of the load command, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub input: PathBuf,
    pub tenant: String,
    pub host: Option<String>,
    pub source: Option<String>,
    pub sourcetype: Option<String>,
    pub format: Option<InputFormat>,
    pub config: Option<PathBuf>,
    pub appreg: Option<PathBuf>,
    pub max_bytes: Option<u64>,
    pub max_events: Option<usize>,
}

impl LoadOptions {
    /// Event host falls back to the machine hostname.
    pub fn properties(&self) -> EventProperties {
        let host = self.host.clone().or_else(|| {
            hostname::get()
                .ok()
                .and_then(|h| h.to_str().map(|s| s.to_string()))
        });
        EventProperties::new(host, self.source.clone(), self.sourcetype.clone())
    }

    pub fn params(&self) -> RunParams {
        RunParams::new(
            self.input.clone(),
            self.format,
            self.tenant.clone(),
            self.properties(),
        )
    }

    /// Load the config file (or defaults), apply command line overrides,
    /// then validate the result.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        let mut config = match resolve_config_path(self.config.as_deref()) {
            Some(path) => {
                info!(config_path = %path.display(), "Loading configuration");
                read_config(&path)?
            }
            None => Config::default(),
        };

        if let Some(appreg) = &self.appreg {
            config.auth.appreg = expand_tilde(appreg);
        }
        if let Some(max_bytes) = self.max_bytes {
            config.batch.max_bytes = max_bytes;
        }
        if let Some(max_events) = self.max_events {
            config.batch.max_events = max_events;
        }

        validate_config(&config)?;
        Ok(config)
    }
}

/// Load the input file into the ingest endpoint.
///
/// Configuration, credential and authentication problems fail before any
/// stage starts. The returned report carries the counters even when a stage
/// failed; the caller turns its error into the exit status.
pub async fn run(options: LoadOptions) -> Result<RunReport, RunError> {
    let config = options.resolve_config()?;
    let params = options.params();
    params.validate()?;

    let registration = AppRegistration::load(&config.auth.appreg)?;

    let authenticator = Authenticator::new(config.auth.token_url.clone(), config.http.timeout)?;
    debug!(token_url = %authenticator.token_url(), "Authenticating");
    let session = Arc::new(authenticator.authenticate(&params.tenant, &registration).await?);

    let sink = Arc::new(HttpIngestClient::new(
        &config.ingest.url,
        Arc::clone(&session),
        config.http.timeout,
    )?);

    let input = BufReader::new(File::open(&params.input)?);

    info!(
        input = %params.input.display(),
        format = %params.format,
        tenant = %params.tenant,
        url = %sink.events_url(),
        "Selected event parser"
    );

    let shutdown = CancellationToken::new();
    let listener = spawn_interrupt_listener(shutdown.clone());

    let pipeline = Pipeline::from_config(&params, &config);
    let report = pipeline.run(input, sink, shutdown).await;

    listener.abort();

    if report.cancelled {
        warn!("Run cancelled before the input was fully loaded");
    }
    if !report.is_success() && session.is_expired() {
        warn!("Access token expired during the run");
    }

    Ok(report)
}
