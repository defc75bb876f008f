/// HTTP client for the remote workflow API
///
/// Authenticates with company/user/secret credentials, caches the bearer token
/// on the client instance, lists remote workflows and triggers runs. Field names
/// in responses are matched case-insensitively.

use crate::{
    config::RemoteConfig,
    error::{Result, SyncError},
    remote::token::TokenCache,
    workflow::types::RemoteWorkflowRecord,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;

/// Operations the sync core needs from the remote API
#[async_trait]
pub trait RemoteWorkflowClient: Send + Sync {
    /// Every workflow the remote API knows about; `null` bodies yield an empty list
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflowRecord>>;

    /// Ask the remote API to run a workflow
    ///
    /// `Ok(false)` means the API answered with a non-2xx status. Transport
    /// failures are returned as errors.
    async fn trigger_workflow(&self, workflow_id: &str) -> Result<bool>;
}

/// reqwest-backed client for the Universal Loader API
pub struct UniversalLoaderClient {
    http: reqwest::Client,
    base_url: String,
    company_id: String,
    user_id: String,
    user_secret: String,
    timeout_secs: u64,
    /// Held across the authenticate call so concurrent callers share one refresh
    tokens: Mutex<TokenCache>,
}

impl std::fmt::Debug for UniversalLoaderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniversalLoaderClient")
            .field("base_url", &self.base_url)
            .field("company_id", &self.company_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Workflow entry as it appears on the wire, after key normalization
#[derive(Debug, Deserialize)]
struct WireWorkflow {
    id: i64,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "isactive", default)]
    is_active: bool,
    #[serde(rename = "multiexecbehavior", default)]
    multi_exec_behavior: Option<String>,
}

impl From<WireWorkflow> for RemoteWorkflowRecord {
    fn from(wire: WireWorkflow) -> Self {
        Self {
            id: wire.id,
            name: wire.name.unwrap_or_default(),
            is_active: wire.is_active,
            multi_exec_behavior: wire.multi_exec_behavior.unwrap_or_default(),
        }
    }
}

/// Lowercase object keys and drop underscores, recursively
///
/// `isActive`, `IsActive` and `is_active` all become `isactive`.
fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase().replace('_', ""), normalize_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

/// Decode a workflow list body
pub(crate) fn parse_workflow_list(body: &str) -> Result<Vec<RemoteWorkflowRecord>> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| SyncError::deserialization("workflow list", e))?;

    match normalize_keys(value) {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|item| {
                serde_json::from_value::<WireWorkflow>(item)
                    .map(RemoteWorkflowRecord::from)
                    .map_err(|e| SyncError::deserialization("workflow list", e))
            })
            .collect(),
        other => Err(SyncError::deserialization(
            "workflow list",
            format!("expected an array, got {}", json_kind(&other)),
        )),
    }
}

/// Decode an authenticate body into (token, expires_in)
pub(crate) fn parse_token_response(body: &str) -> Result<(String, i64)> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| SyncError::deserialization("authentication response", e))?;

    let map = match normalize_keys(value) {
        Value::Object(map) => map,
        other => {
            return Err(SyncError::deserialization(
                "authentication response",
                format!("expected an object, got {}", json_kind(&other)),
            ))
        }
    };

    let token = map
        .get("accesstoken")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if token.is_empty() {
        return Err(SyncError::Authentication(
            "access token is null or empty in authentication response".into(),
        ));
    }

    let expires_in = map.get("expiresin").and_then(Value::as_i64).unwrap_or(0);
    if expires_in < 0 {
        return Err(SyncError::deserialization(
            "authentication response",
            format!("negative token lifetime {}", expires_in),
        ));
    }
    Ok((token, expires_in))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl UniversalLoaderClient {
    /// Build a client from configuration
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SyncError::Config("BaseUrl configuration is required".into()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SyncError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            company_id: config.company_id.clone(),
            user_id: config.user_id.clone(),
            user_secret: config.user_secret.clone(),
            timeout_secs: config.timeout_secs,
            tokens: Mutex::new(TokenCache::new()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_error(&self, operation: &str, error: reqwest::Error) -> SyncError {
        if error.is_timeout() {
            SyncError::Timeout {
                operation: operation.to_string(),
                seconds: self.timeout_secs,
            }
        } else {
            SyncError::transport(operation, error)
        }
    }

    /// Cached bearer token, authenticating first if it is missing or stale
    async fn bearer_token(&self) -> Result<String> {
        let mut cache = self.tokens.lock().await;
        let now = chrono::Utc::now();

        if let Some(token) = cache.valid_token(now) {
            tracing::debug!("🔑 Using cached access token");
            return Ok(token.to_string());
        }

        tracing::info!("🔑 No valid cached token, requesting a new access token");
        let (token, expires_in) = self.authenticate().await?;
        let expires_at = cache.store(token.clone(), expires_in, now);
        tracing::info!("🔑 Access token cached until {}", expires_at.to_rfc3339());

        Ok(token)
    }

    async fn authenticate(&self) -> Result<(String, i64)> {
        tracing::info!("🔐 Authenticating against {}", self.base_url);

        let response = self
            .http
            .post(self.url("/v2/authenticate"))
            .json(&json!({
                "apiCompanyId": self.company_id,
                "apiUserId": self.user_id,
                "apiUserSecret": self.user_secret,
            }))
            .send()
            .await
            .map_err(|e| self.request_error("authenticate", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error("authenticate", e))?;

        if !status.is_success() {
            tracing::error!("❌ Authentication failed with status {}", status);
            return Err(SyncError::Authentication(format!(
                "authenticate returned {}: {}",
                status, body
            )));
        }

        let (token, expires_in) = parse_token_response(&body)?;
        tracing::info!("✅ Obtained access token, expires in {}s", expires_in);
        Ok((token, expires_in))
    }
}

#[async_trait]
impl RemoteWorkflowClient for UniversalLoaderClient {
    async fn list_workflows(&self) -> Result<Vec<RemoteWorkflowRecord>> {
        let token = self.bearer_token().await?;

        let response = self
            .http
            .get(self.url("/workflows"))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| self.request_error("list workflows", e))?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::UNAUTHORIZED {
                self.tokens.lock().await.clear();
            }
            return Err(SyncError::Transport {
                operation: "list workflows".into(),
                message: format!("unexpected status {}", status),
                source: None,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.request_error("list workflows", e))?;

        let workflows = parse_workflow_list(&body)?;
        tracing::debug!("📥 Remote API returned {} workflows", workflows.len());
        Ok(workflows)
    }

    async fn trigger_workflow(&self, workflow_id: &str) -> Result<bool> {
        let token = self.bearer_token().await?;

        let response = self
            .http
            .post(self.url(&format!("/workflows/{}/run", workflow_id)))
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| self.request_error("trigger workflow", e))?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("🚀 Remote API accepted run for workflow {}", workflow_id);
            Ok(true)
        } else {
            tracing::warn!(
                "⚠️ Remote API rejected run for workflow {} with status {}",
                workflow_id,
                status
            );
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_fields_match_case_insensitively() {
        let body = r#"[
            {"Id": 1, "NAME": "W1", "IsActive": true, "MultiExecBehavior": "Allow"},
            {"id": 2, "name": "W2", "is_active": false, "multi_exec_behavior": null}
        ]"#;

        let workflows = parse_workflow_list(body).unwrap();
        assert_eq!(
            workflows,
            vec![
                RemoteWorkflowRecord {
                    id: 1,
                    name: "W1".into(),
                    is_active: true,
                    multi_exec_behavior: "Allow".into(),
                },
                RemoteWorkflowRecord {
                    id: 2,
                    name: "W2".into(),
                    is_active: false,
                    multi_exec_behavior: String::new(),
                },
            ]
        );
    }

    #[test]
    fn null_workflow_list_is_empty() {
        assert!(parse_workflow_list("null").unwrap().is_empty());
        assert!(parse_workflow_list("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_workflow_list_is_deserialization_error() {
        assert!(matches!(
            parse_workflow_list("invalid json"),
            Err(SyncError::Deserialization { .. })
        ));
        assert!(matches!(
            parse_workflow_list(r#"{"id": 1}"#),
            Err(SyncError::Deserialization { .. })
        ));
        assert!(matches!(
            parse_workflow_list(r#"[{"name": "no id"}]"#),
            Err(SyncError::Deserialization { .. })
        ));
    }

    #[test]
    fn token_response_accepts_both_spellings() {
        let (token, expires) =
            parse_token_response(r#"{"access_token": "t1", "expires_in": 3600}"#).unwrap();
        assert_eq!((token.as_str(), expires), ("t1", 3600));

        let (token, expires) =
            parse_token_response(r#"{"AccessToken": "t2", "TokenType": "Bearer", "ExpiresIn": 60}"#)
                .unwrap();
        assert_eq!((token.as_str(), expires), ("t2", 60));
    }

    #[test]
    fn empty_token_is_authentication_error() {
        assert!(matches!(
            parse_token_response(r#"{"accessToken": "", "expiresIn": 3600}"#),
            Err(SyncError::Authentication(_))
        ));
        assert!(matches!(
            parse_token_response(r#"{"expiresIn": 3600}"#),
            Err(SyncError::Authentication(_))
        ));
    }

    #[test]
    fn negative_token_lifetime_is_deserialization_error() {
        assert!(matches!(
            parse_token_response(r#"{"accessToken": "t", "expiresIn": -1}"#),
            Err(SyncError::Deserialization { .. })
        ));
        assert!(matches!(
            parse_token_response(&format!(r#"{{"accessToken": "t", "expiresIn": {}}}"#, i64::MIN)),
            Err(SyncError::Deserialization { .. })
        ));
    }

    #[test]
    fn null_token_response_is_deserialization_error() {
        assert!(matches!(
            parse_token_response("null"),
            Err(SyncError::Deserialization { .. })
        ));
    }

    #[test]
    fn client_requires_base_url() {
        let config = RemoteConfig {
            base_url: String::new(),
            company_id: "c".into(),
            user_id: "u".into(),
            user_secret: "s".into(),
            timeout_secs: 5,
        };
        assert!(matches!(
            UniversalLoaderClient::new(&config),
            Err(SyncError::Config(_))
        ));
    }
}
