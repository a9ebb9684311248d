//! Jira Cloud source
//!
//! Issues are searched with JQL through the enhanced search endpoint, which
//! pages with opaque `nextPageToken` cursors. The `updated` filter in JQL is
//! interpreted in the profile timezone of the authenticated account, so the
//! watermark boundary is converted to that timezone before formatting.

use crate::config::JiraConfig;
use crate::connector::document::{
    ContentType, DocumentAttribute, DocumentContext, IndexDocument, ATTR_DATA_SOURCE_ID,
    ATTR_LAST_UPDATED_AT, ATTR_SOURCE_URI, ATTR_SYNC_JOB_EXECUTION_ID,
};
use crate::connector::{Source, SourcePage};
use crate::extract::blob_or_fallback;
use crate::transport::{HttpPairs, HttpRequest, HttpTransport};
use crate::SyncError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const SEARCH_ENDPOINT: &str = "/rest/api/3/search/jql";
const MYSELF_ENDPOINT: &str = "/rest/api/3/myself";
const SOURCE_NAME: &str = "jira";

/// JQL date format, minute precision
const JQL_TIME_FORMAT: &str = "%Y/%m/%d %H:%M";

/// Credential blob stored in the secret store
#[derive(Debug, Clone, Deserialize)]
pub struct JiraCredentials {
    /// Account email
    #[serde(rename = "jiraId")]
    pub account: String,

    /// API token
    #[serde(rename = "jiraCredential")]
    pub api_token: String,
}

impl JiraCredentials {
    pub fn from_secret(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn basic_auth(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.account, self.api_token));
        format!("Basic {}", encoded)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<Value>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Profile {
    #[serde(rename = "timeZone")]
    time_zone: Option<String>,
}

/// Jira issue source
pub struct JiraSource {
    base_url: String,
    projects: Vec<String>,
    page_size: u32,
    fields: String,
    headers: HttpPairs,
    transport: Arc<dyn HttpTransport>,
}

impl JiraSource {
    /// Creates a source; `transport` should already retry transient failures
    pub fn new(
        config: &JiraConfig,
        credentials: &JiraCredentials,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let headers = vec![
            ("Authorization".to_string(), credentials.basic_auth()),
            ("Accept".to_string(), "application/json".to_string()),
            ("Cache-Control".to_string(), "no-cache".to_string()),
        ];

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            projects: config.projects.clone(),
            page_size: config.page_size,
            fields: config.fields.join(","),
            headers,
            transport,
        }
    }

    /// Resolves the profile timezone of the authenticated account
    async fn profile_timezone(&self) -> Result<Tz, SyncError> {
        let request = HttpRequest::get(format!("{}{}", self.base_url, MYSELF_ENDPOINT))
            .headers(&self.headers);

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| SyncError::Timezone(format!("profile lookup failed: {}", e)))?;

        if response.status != 200 {
            return Err(SyncError::Timezone(format!(
                "profile lookup returned HTTP {}: {}",
                response.status,
                response.text()
            )));
        }

        let profile: Profile = serde_json::from_slice(&response.body)
            .map_err(|e| SyncError::Timezone(format!("invalid profile response: {}", e)))?;
        let name = profile
            .time_zone
            .ok_or_else(|| SyncError::Timezone("profile has no timeZone".to_string()))?;

        name.parse::<Tz>()
            .map_err(|e| SyncError::Timezone(format!("unknown timezone {:?}: {}", name, e)))
    }

    fn fetch_error(&self, message: String) -> SyncError {
        SyncError::Fetch {
            source_name: SOURCE_NAME.to_string(),
            message,
        }
    }
}

/// Builds the JQL change filter
///
/// `boundary` is the already-formatted lower bound, in the profile timezone.
pub fn format_jql(projects: &[String], boundary: Option<&str>) -> String {
    let quoted: Vec<String> = projects.iter().map(|p| format!("\"{}\"", p)).collect();
    let mut jql = format!("project IN ({})", quoted.join(","));
    if let Some(boundary) = boundary {
        jql.push_str(&format!(" AND updated > \"{}\"", boundary));
    }
    jql
}

#[async_trait]
impl Source for JiraSource {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    async fn build_query(&self, since: Option<DateTime<Utc>>) -> Result<String, SyncError> {
        let boundary = match since {
            Some(since) => {
                let tz = self.profile_timezone().await?;
                tracing::info!("Jira profile timezone: {}", tz.name());
                Some(since.with_timezone(&tz).format(JQL_TIME_FORMAT).to_string())
            }
            None => None,
        };
        Ok(format_jql(&self.projects, boundary.as_deref()))
    }

    async fn fetch_page(
        &self,
        query: &str,
        page_token: Option<&str>,
    ) -> Result<SourcePage, SyncError> {
        let mut request = HttpRequest::get(format!("{}{}", self.base_url, SEARCH_ENDPOINT))
            .query("jql", query)
            .query("maxResults", self.page_size.to_string())
            .query("fields", self.fields.as_str())
            .headers(&self.headers);
        if let Some(token) = page_token {
            request = request.query("nextPageToken", token);
        }

        tracing::info!(
            "Fetching Jira issues (page token: {})",
            page_token.unwrap_or("<start>")
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| self.fetch_error(e.to_string()))?;

        if !response.is_success() {
            let body = response.text();
            tracing::error!("Jira API error: HTTP {}: {}", response.status, body);
            return Err(self.fetch_error(format!("HTTP {}: {}", response.status, body)));
        }

        let page: SearchResponse = serde_json::from_slice(&response.body)
            .map_err(|e| self.fetch_error(format!("invalid search response: {}", e)))?;

        tracing::info!("Fetched {} Jira issues", page.issues.len());

        Ok(SourcePage {
            records: page.issues,
            next_page_token: page.next_page_token.filter(|t| !t.is_empty()),
        })
    }

    fn to_document(&self, record: &Value, context: &DocumentContext) -> IndexDocument {
        let key = record["key"].as_str().unwrap_or_default();
        let fields = &record["fields"];
        let project_key = fields["project"]["key"].as_str().unwrap_or_default();
        let summary = fields["summary"].as_str().unwrap_or_default();
        let updated = fields["updated"].as_str().unwrap_or_default();

        IndexDocument {
            id: format!("ISSUE-{}-{}", project_key, key),
            blob: blob_or_fallback(&fields["description"], summary),
            title: summary.to_string(),
            content_type: ContentType::PlainText,
            attributes: vec![
                DocumentAttribute::string(ATTR_DATA_SOURCE_ID, context.data_source_id.as_str()),
                DocumentAttribute::string(
                    ATTR_SYNC_JOB_EXECUTION_ID,
                    context.execution_id.as_str(),
                ),
                DocumentAttribute::string(
                    ATTR_SOURCE_URI,
                    format!("{}/browse/{}", self.base_url, key),
                ),
                DocumentAttribute::date(ATTR_LAST_UPDATED_AT, updated),
            ],
        }
    }
}
