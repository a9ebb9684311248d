use crate::config::types::{Config, JiraConfig, RetryConfig, StorageConfig, SyncConfig};
use crate::config::{HOST_TIME_LIMIT_SECS, MAX_BATCH_SIZE};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_sync_config(&config.sync)?;
    validate_retry_config(&config.retry)?;
    if let Some(jira) = &config.jira {
        validate_jira_config(jira)?;
    }
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates session configuration
fn validate_sync_config(config: &SyncConfig) -> Result<(), ConfigError> {
    if config.watermark_parameter.trim().is_empty() {
        return Err(ConfigError::Validation(
            "watermark-parameter cannot be empty".to_string(),
        ));
    }

    if config.continuation_source.trim().is_empty() {
        return Err(ConfigError::Validation(
            "continuation-source cannot be empty".to_string(),
        ));
    }

    if config.time_budget_secs == 0 || config.time_budget_secs >= HOST_TIME_LIMIT_SECS {
        return Err(ConfigError::Validation(format!(
            "time-budget-secs must be between 1 and {}, got {}",
            HOST_TIME_LIMIT_SECS - 1,
            config.time_budget_secs
        )));
    }

    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.start_sync_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "start-sync-attempts must be >= 1, got {}",
            config.start_sync_attempts
        )));
    }

    Ok(())
}

/// Validates retrying transport configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_backoff_ms < config.backoff_factor_ms {
        return Err(ConfigError::Validation(format!(
            "max-backoff-ms ({}) must be >= backoff-factor-ms ({})",
            config.max_backoff_ms, config.backoff_factor_ms
        )));
    }

    if let Some(status) = config
        .status_forcelist
        .iter()
        .find(|s| !(100..=599).contains(*s))
    {
        return Err(ConfigError::Validation(format!(
            "status-forcelist contains invalid HTTP status {}",
            status
        )));
    }

    Ok(())
}

/// Validates the Jira source section
fn validate_jira_config(config: &JiraConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid jira base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "jira base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if config.projects.is_empty() {
        return Err(ConfigError::Validation(
            "jira projects must list at least one project key".to_string(),
        ));
    }

    for project in &config.projects {
        validate_project_key(project)?;
    }

    if config.secret_name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "jira secret-name cannot be empty".to_string(),
        ));
    }

    if config.page_size < 1 || config.page_size > 100 {
        return Err(ConfigError::Validation(format!(
            "jira page-size must be between 1 and 100, got {}",
            config.page_size
        )));
    }

    Ok(())
}

/// Project keys are interpolated into a quoted JQL list
fn validate_project_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::Validation(
            "jira project key cannot be empty".to_string(),
        ));
    }

    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(ConfigError::Validation(format!(
            "jira project key '{}' contains invalid characters",
            key
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.secrets_path.is_empty() {
        return Err(ConfigError::Validation(
            "secrets-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
