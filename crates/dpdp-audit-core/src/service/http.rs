use super::ServiceSettings;
use crate::scan::{ScanError, ScanRequest, ScanResult, ScanTransport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

/// Posts scan requests to the remote compliance service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScanTransport {
    http: Client,
    url: String,
}

impl HttpScanTransport {
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("dpdp-audit/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build scan service HTTP client")?;
        Ok(Self {
            http,
            url: settings.scan_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ScanTransport for HttpScanTransport {
    #[instrument(skip_all, fields(repo_url = %request.repo_url))]
    async fn scan(&self, request: &ScanRequest) -> Result<ScanResult, ScanError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|err| ScanError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %truncate(&body, 200), "scan service returned an error status");
            return Err(ScanError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| ScanError::Transport(err.to_string()))?;
        debug!(url = %self.url, bytes = body.len(), "scan response received");
        serde_json::from_slice(&body).map_err(|err| ScanError::Decode(err.to_string()))
    }
}

fn truncate(input: &str, max_chars: usize) -> String {
    if input.chars().count() <= max_chars {
        return input.to_string();
    }
    input.chars().take(max_chars).collect::<String>() + "…"
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(url: String) -> ServiceSettings {
        ServiceSettings {
            endpoint: url,
            ..ServiceSettings::default()
        }
    }

    fn flask_request() -> ScanRequest {
        ScanRequest::new("https://github.com/pallets/flask").unwrap()
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn scan_posts_repo_url_and_parses_result() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/scan")
                .header("content-type", "application/json")
                .json_body(json!({ "repo_url": "https://github.com/pallets/flask" }));
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"score":72,"scan_method":"static","summary":"ok","violations":[{"type":"PII_LOGGED","severity":"HIGH","fix":"redact"}]}"#);
        });

        let transport = HttpScanTransport::new(&settings(server.base_url())).unwrap();
        let result = transport.scan(&flask_request()).await.unwrap();
        assert_eq!(result.score, 72);
        assert_eq!(result.violations[0].kind, "PII_LOGGED");
        mock.assert();
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn server_error_maps_to_status_failure() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/scan");
            then.status(500).body("boom");
        });

        let transport = HttpScanTransport::new(&settings(server.base_url())).unwrap();
        let err = transport.scan(&flask_request()).await.unwrap_err();
        assert!(matches!(err, ScanError::Status { status: 500 }));
        mock.assert_hits(1);
    }

    #[tokio::test]
    #[ignore = "requires loopback networking"]
    async fn malformed_payload_maps_to_decode_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/api/scan");
            then.status(200).body(r#"{"score":"high"}"#);
        });

        let transport = HttpScanTransport::new(&settings(server.base_url())).unwrap();
        let err = transport.scan(&flask_request()).await.unwrap_err();
        assert!(matches!(err, ScanError::Decode(_)));
        assert!(err.user_message().ends_with("Make sure repo is public."));
    }

    #[test]
    fn transport_targets_scan_endpoint() {
        let transport =
            HttpScanTransport::new(&settings("https://audit.example.com/".into())).unwrap();
        assert_eq!(transport.url(), "https://audit.example.com/api/scan");
    }

    #[test]
    fn truncate_long_strings_adds_ellipsis() {
        assert_eq!(truncate("abc", 10), "abc");
        assert_eq!(truncate("abcdefghijklmnopqrstuvwxyz", 5), "abcde…");
    }
}
