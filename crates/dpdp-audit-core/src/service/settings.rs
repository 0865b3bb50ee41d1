use anyhow::{Context, Result};
use std::{collections::HashMap, time::Duration};

use crate::scan::controller::DEFAULT_SCAN_TIMEOUT;

/// Environment-driven configuration for reaching the scanning service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// Base URL of the service; scans are posted to `{endpoint}/api/scan`.
    pub endpoint: String,
    /// Bounded wait before a scan is reported as timed out.
    pub timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

impl ServiceSettings {
    pub const DEFAULT_ENDPOINT: &'static str = "http://localhost:3000";
    pub const ENDPOINT_ENV: &'static str = "DPDP_AUDIT_ENDPOINT";
    pub const TIMEOUT_ENV: &'static str = "DPDP_AUDIT_TIMEOUT";

    /// Load settings from environment variables.
    ///
    /// * `DPDP_AUDIT_ENDPOINT` — Base URL of the scanning service (default: `http://localhost:3000`).
    /// * `DPDP_AUDIT_TIMEOUT`  — Scan timeout as a human duration, e.g. `90s` or `2m` (default: `60s`).
    pub fn from_env() -> Result<Self> {
        Self::default().with_env()
    }

    /// Overlay any environment variables that are set on top of `self`.
    pub fn with_env(self) -> Result<Self> {
        self.with_vars(std::env::vars().collect())
    }

    fn with_vars(self, vars: HashMap<String, String>) -> Result<Self> {
        let mut settings = self;
        if let Some(endpoint) = vars
            .get(Self::ENDPOINT_ENV)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            settings.endpoint = endpoint.to_string();
        }
        if let Some(raw) = vars
            .get(Self::TIMEOUT_ENV)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
        {
            settings.timeout = parse_timeout(raw)
                .with_context(|| format!("invalid {} value `{raw}`", Self::TIMEOUT_ENV))?;
        }
        Ok(settings)
    }

    /// Full URL of the scan endpoint.
    pub fn scan_url(&self) -> String {
        format!("{}/api/scan", self.endpoint.trim_end_matches('/'))
    }
}

/// Parse a human duration such as `45s`; a zero duration is rejected.
pub fn parse_timeout(raw: &str) -> Result<Duration> {
    let timeout = humantime::parse_duration(raw.trim())
        .with_context(|| format!("`{raw}` is not a duration (try `60s` or `2m`)"))?;
    if timeout.is_zero() {
        anyhow::bail!("timeout must be greater than zero");
    }
    Ok(timeout)
}
