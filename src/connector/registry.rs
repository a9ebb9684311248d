//! Resolves trigger data source names to connectors

use crate::config::Config;
use crate::connector::jira::{JiraCredentials, JiraSource};
use crate::connector::{Connector, JobIdentity, Source};
use crate::session::{read_watermark, SyncEvent};
use crate::storage::{EventBus, IndexService, ParameterStore, SecretStore};
use crate::transport::{HttpTransport, RetryingTransport};
use crate::{ConfigError, SyncError};
use std::sync::Arc;

/// Supported source types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Jira,
}

impl SourceKind {
    /// Matches a trigger's data source name, ignoring case
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "jira" => Ok(Self::Jira),
            _ => Err(ConfigError::UnknownSource(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jira => "jira",
        }
    }
}

/// External services a session talks to
#[derive(Clone)]
pub struct Collaborators {
    pub index: Arc<dyn IndexService>,
    pub parameters: Arc<dyn ParameterStore>,
    pub secrets: Arc<dyn SecretStore>,
    pub events: Arc<dyn EventBus>,
    /// Raw HTTP transport; sources wrap it with the configured retry policy
    pub http: Arc<dyn HttpTransport>,
}

/// Builds the connector for `event`
///
/// Reads the watermark and the source credentials. Nothing is started
/// index-side here.
pub async fn build_connector(
    event: &SyncEvent,
    config: &Config,
    collaborators: &Collaborators,
) -> Result<Connector, SyncError> {
    let kind = SourceKind::from_name(&event.data_source_name)?;

    let watermark = read_watermark(
        collaborators.parameters.as_ref(),
        &config.sync.watermark_parameter,
    )
    .await?;
    tracing::info!("Last crawled watermark: {}", watermark);

    let source: Box<dyn Source> = match kind {
        SourceKind::Jira => Box::new(build_jira(config, collaborators).await?),
    };

    let identity = JobIdentity {
        index_id: event.index_id.clone(),
        data_source_id: event.data_source_id.clone(),
    };

    Ok(Connector::new(
        source,
        collaborators.index.clone(),
        identity,
        watermark,
        &config.sync,
    )
    .with_execution_id(event.job_execution_id.clone()))
}

async fn build_jira(
    config: &Config,
    collaborators: &Collaborators,
) -> Result<JiraSource, SyncError> {
    let jira = config
        .jira
        .as_ref()
        .ok_or_else(|| ConfigError::MissingSource(SourceKind::Jira.as_str().to_string()))?;

    let secret_error = |message: String| SyncError::Secret {
        name: jira.secret_name.clone(),
        message,
    };

    let raw = collaborators
        .secrets
        .get_secret(&jira.secret_name)
        .await
        .map_err(|e| secret_error(e.to_string()))?;
    let credentials = JiraCredentials::from_secret(&raw).map_err(|e| secret_error(e.to_string()))?;

    let transport = RetryingTransport::new(collaborators.http.clone(), &config.retry);
    Ok(JiraSource::new(jira, &credentials, Arc::new(transport)))
}
