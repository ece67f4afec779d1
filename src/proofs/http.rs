//! HTTP clients for the ZK prover and the public view-count endpoint

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{ResponseMatch, ResponseRedaction, ZkFetchRequest, ZkProof};
use crate::infra::{Result, ServiceError, ViewCountReader, ZkProver};

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::Configuration(format!("failed to build HTTP client: {e}")))
}

fn external(context: &str, err: impl std::fmt::Display) -> ServiceError {
    ServiceError::ExternalService(format!("{context}: {err}"))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicOptions<'a> {
    method: &'a str,
    headers: &'a BTreeMap<String, String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrivateOptions<'a> {
    response_matches: &'a [ResponseMatch],
    response_redactions: &'a [ResponseRedaction],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ZkFetchBody<'a> {
    application_id: Option<&'a str>,
    application_secret: Option<&'a str>,
    url: &'a str,
    public_options: PublicOptions<'a>,
    private_options: PrivateOptions<'a>,
}

/// Client for a zkFetch-compatible proving service.
///
/// Posts to `{base_url}/zk-fetch`; the service answers with the proof JSON,
/// or `null` when it could not produce one.
pub struct HttpZkProver {
    client: reqwest::Client,
    base_url: String,
    app_id: Option<String>,
    app_secret: Option<String>,
}

impl HttpZkProver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: None,
            app_secret: None,
        })
    }

    pub fn with_credentials(mut self, app_id: Option<String>, app_secret: Option<String>) -> Self {
        self.app_id = app_id;
        self.app_secret = app_secret;
        self
    }
}

#[async_trait]
impl ZkProver for HttpZkProver {
    async fn zk_fetch(&self, request: &ZkFetchRequest) -> Result<Option<ZkProof>> {
        let body = ZkFetchBody {
            application_id: self.app_id.as_deref(),
            application_secret: self.app_secret.as_deref(),
            url: &request.url,
            public_options: PublicOptions {
                method: &request.method,
                headers: &request.headers,
            },
            private_options: PrivateOptions {
                response_matches: &request.response_matches,
                response_redactions: &request.response_redactions,
            },
        };

        let endpoint = format!("{}/zk-fetch", self.base_url);
        debug!(%endpoint, target_url = %request.url, "Requesting ZK proof");

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| external("zk prover request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(external("zk prover returned", status));
        }

        response
            .json::<Option<ZkProof>>()
            .await
            .map_err(|e| external("zk prover response", e))
    }
}

#[derive(Deserialize)]
struct ViewCountResponse {
    views: u64,
}

/// Reads `{ views }` from the public view-count endpoint.
pub struct HttpViewCountReader {
    client: reqwest::Client,
}

impl HttpViewCountReader {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl ViewCountReader for HttpViewCountReader {
    async fn read_views(&self, url: &str) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| external("view count request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(external("view count endpoint returned", status));
        }

        let body: ViewCountResponse = response
            .json()
            .await
            .map_err(|e| external("view count response", e))?;
        Ok(body.views)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prover_trims_trailing_slash() {
        let prover = HttpZkProver::new("https://prover.example/", Duration::from_secs(1)).unwrap();
        assert_eq!(prover.base_url, "https://prover.example");
    }

    #[test]
    fn test_fetch_body_shape() {
        let request = ZkFetchRequest::view_count("https://app.example/api/assets/A1/view");
        let body = ZkFetchBody {
            application_id: Some("app"),
            application_secret: None,
            url: &request.url,
            public_options: PublicOptions {
                method: &request.method,
                headers: &request.headers,
            },
            private_options: PrivateOptions {
                response_matches: &request.response_matches,
                response_redactions: &request.response_redactions,
            },
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["applicationId"], "app");
        assert_eq!(value["publicOptions"]["method"], "GET");
        assert_eq!(value["privateOptions"]["responseMatches"][0]["type"], "regex");
    }

    #[test]
    fn test_view_count_response_ignores_extra_fields() {
        let parsed: ViewCountResponse =
            serde_json::from_str(r#"{"success":true,"views":17}"#).unwrap();
        assert_eq!(parsed.views, 17);
    }
}
