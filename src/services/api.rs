//! Client for the claim-cost service's JSON API
//!
//! Two request/response operations: the claim-cost history and an
//! account's RC manabar. Every call resolves to an explicit `Result`.

use crate::types::{AccountRc, CostHistory, RcField, RcResponse, Result, RctrackError};
use reqwest::Url;
use std::time::Duration;

/// Async HTTP client bound to one service base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000`)
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| RctrackError::Config(format!("invalid api url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(RctrackError::Config(format!(
                "api url '{}' cannot be used as a base",
                base_url
            )));
        }
        // Keep any path prefix when segments are appended later
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("rctrack/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build `{base}/seg1/seg2/...` with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RctrackError::Config(format!("invalid api url '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch the last `hours` of claim-cost samples
    pub async fn cost_history(&self, hours: u32) -> Result<CostHistory> {
        let mut url = self.endpoint(&["api", "rc_cost_data"])?;
        url.query_pairs_mut()
            .append_pair("hours", &hours.to_string());

        tracing::debug!(%url, "fetching cost history");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RctrackError::Api(format!(
                "cost history request failed with status {}",
                status
            )));
        }

        let history: CostHistory = response.json().await?;
        tracing::debug!(samples = history.labels.len(), "cost history received");
        Ok(history)
    }

    /// Fetch an account's RC manabar and pending claims
    pub async fn account_rc(&self, username: &str) -> Result<AccountRc> {
        let username = username.trim();
        if username.is_empty() {
            return Err(RctrackError::InvalidArgument(
                "username must not be empty".into(),
            ));
        }

        let url = self.endpoint(&["api", "rc", username])?;
        tracing::debug!(%url, "fetching account rc");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RctrackError::Api(format!(
                "rc request for '{}' failed with status {}",
                username, status
            )));
        }

        let body: RcResponse = response.json().await?;
        account_from_response(body)
    }
}

/// Validate an `/api/rc/:user` body into an account status
pub fn account_from_response(body: RcResponse) -> Result<AccountRc> {
    let message = if body.message.is_empty() {
        "Unknown error".to_string()
    } else {
        body.message
    };

    if !body.success {
        return Err(RctrackError::Api(message));
    }

    match body.rc {
        Some(RcField::Manabar(manabar)) => Ok(AccountRc {
            manabar,
            claims: body.claims,
        }),
        _ => Err(RctrackError::Api(format!("response has no manabar: {}", message))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(&server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_url() {
        let err = ApiClient::new("not a url", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, RctrackError::Config(_)));
    }

    #[test]
    fn test_endpoint_keeps_path_prefix() {
        let client = ApiClient::new("https://example.com/rc-tool", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(&["api", "rc", "alice"]).unwrap();
        assert_eq!(url.as_str(), "https://example.com/rc-tool/api/rc/alice");
    }

    #[test]
    fn test_endpoint_encodes_username() {
        let client = ApiClient::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        let url = client.endpoint(&["api", "rc", "a/b"]).unwrap();
        assert_eq!(url.path(), "/api/rc/a%2Fb");
    }

    #[tokio::test]
    async fn test_cost_history_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rc_cost_data"))
            .and(query_param("hours", "720"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "labels": ["2025-05-01T10:00:00", "2025-05-01T11:00:00"],
                "costs": [1.5e12, 1.6e12],
                "most_recent_cost": 1.6e12,
                "most_recent_time": "2025-05-01T11:00:00"
            })))
            .mount(&server)
            .await;

        let history = client_for(&server).cost_history(720).await.unwrap();

        assert_eq!(history.labels.len(), 2);
        assert_eq!(history.most_recent_cost, Some(1.6e12));
    }

    #[tokio::test]
    async fn test_cost_history_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rc_cost_data"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server).cost_history(24).await.unwrap_err();
        assert!(matches!(err, RctrackError::Api(_)));
    }

    #[tokio::test]
    async fn test_account_rc_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rc/alice"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "rc": {"current_mana": 9000, "max_mana": 10000},
                "claims": 2,
                "message": "OK"
            })))
            .mount(&server)
            .await;

        let account = client_for(&server).account_rc("alice").await.unwrap();

        assert_eq!(account.manabar.current_mana, 9000);
        assert_eq!(account.claims, Some(2));
    }

    #[tokio::test]
    async fn test_account_rc_reported_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/rc/ghost"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "rc": 0,
                "message": "Account ghost does not exist"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).account_rc("ghost").await.unwrap_err();
        assert_eq!(err.to_string(), "api error: Account ghost does not exist");
    }

    #[tokio::test]
    async fn test_account_rc_empty_username() {
        let client = ApiClient::new("http://localhost:5000", Duration::from_secs(1)).unwrap();
        let err = client.account_rc("  ").await.unwrap_err();
        assert!(matches!(err, RctrackError::InvalidArgument(_)));
    }

    #[test]
    fn test_account_from_response_missing_manabar() {
        let body = RcResponse {
            success: true,
            rc: None,
            claims: None,
            message: String::new(),
        };
        assert!(matches!(
            account_from_response(body),
            Err(RctrackError::Api(_))
        ));
    }
}
