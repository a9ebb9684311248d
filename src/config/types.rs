use serde::Deserialize;

/// Main configuration structure for Ticket-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub sync: SyncConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub jira: Option<JiraConfig>,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Session behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Watermark store key holding the last fully crawled timestamp
    #[serde(rename = "watermark-parameter")]
    pub watermark_parameter: String,

    /// Event source name stamped on continuation events
    #[serde(rename = "continuation-source")]
    pub continuation_source: String,

    /// Wall-clock budget for one bounded invocation (seconds)
    #[serde(rename = "time-budget-secs", default = "default_time_budget_secs")]
    pub time_budget_secs: u64,

    /// Overlap subtracted from the watermark when building the change filter (seconds)
    #[serde(
        rename = "watermark-buffer-secs",
        default = "default_watermark_buffer_secs"
    )]
    pub watermark_buffer_secs: u64,

    /// Documents per index submit call
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Total attempts made to start an index-side sync job
    #[serde(rename = "start-sync-attempts", default = "default_start_sync_attempts")]
    pub start_sync_attempts: usize,
}

/// Retrying transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    #[serde(default = "default_retry_total")]
    pub total: usize,

    /// Base backoff; retry `n` waits `factor * 2^(n-1)`
    #[serde(rename = "backoff-factor-ms", default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,

    /// Upper bound for a single backoff sleep
    #[serde(rename = "max-backoff-ms", default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Randomize backoff durations
    #[serde(default)]
    pub jitter: bool,

    /// HTTP statuses treated as transient
    #[serde(rename = "status-forcelist", default = "default_status_forcelist")]
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            total: default_retry_total(),
            backoff_factor_ms: default_backoff_factor_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            jitter: false,
            status_forcelist: default_status_forcelist(),
        }
    }
}

/// Jira Cloud source configuration
#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    /// Site root, e.g. `https://acme.atlassian.net`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Project keys included in the change filter
    pub projects: Vec<String>,

    /// Secret store name of the credential blob
    #[serde(rename = "secret-name")]
    pub secret_name: String,

    /// Issues requested per page
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Issue fields requested from the search endpoint
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
}

/// Local collaborator backends used by the binary
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database backing the index, parameters and events
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the JSON secrets file
    #[serde(rename = "secrets-path", default = "default_secrets_path")]
    pub secrets_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            secrets_path: default_secrets_path(),
        }
    }
}

fn default_time_budget_secs() -> u64 {
    480
}

fn default_watermark_buffer_secs() -> u64 {
    120
}

fn default_batch_size() -> usize {
    10
}

fn default_start_sync_attempts() -> usize {
    6
}

fn default_retry_total() -> usize {
    5
}

fn default_backoff_factor_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    120_000
}

fn default_status_forcelist() -> Vec<u16> {
    vec![400, 404, 429, 500, 502, 503, 504]
}

fn default_page_size() -> u32 {
    100
}

fn default_fields() -> Vec<String> {
    ["id", "description", "summary", "updated", "project"]
        .iter()
        .map(|f| f.to_string())
        .collect()
}

fn default_database_path() -> String {
    "./ticket-sync.db".to_string()
}

fn default_secrets_path() -> String {
    "./secrets.json".to_string()
}
