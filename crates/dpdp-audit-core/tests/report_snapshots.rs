use std::sync::Arc;

use async_trait::async_trait;
use dpdp_audit_core::{
    render_report, OutputFormat, ScanController, ScanError, ScanRequest, ScanResult,
    ScanTransport, Violation,
};
use insta::assert_snapshot;

struct CannedTransport(ScanResult);

#[async_trait]
impl ScanTransport for CannedTransport {
    async fn scan(&self, _request: &ScanRequest) -> Result<ScanResult, ScanError> {
        Ok(self.0.clone())
    }
}

async fn scan_and_render(result: ScanResult) -> String {
    let controller = ScanController::new(Arc::new(CannedTransport(result)));
    controller
        .submit("https://github.com/pallets/flask")
        .await
        .expect("submission should be accepted");
    render_report(&controller.state(), OutputFormat::Human).expect("report should render")
}

#[tokio::test(flavor = "current_thread")]
async fn mixed_severity_report_snapshot() {
    let output = scan_and_render(ScanResult {
        score: 42,
        scan_method: "coderabbit+cline".into(),
        summary: "3 issues across logging and storage".into(),
        violations: vec![
            Violation {
                kind: "AADHAAR_IN_LOGS".into(),
                severity: "critical".into(),
                fix: "Mask Aadhaar numbers before logging".into(),
            },
            Violation {
                kind: "PII_LOGGED".into(),
                severity: "HIGH".into(),
                fix: "redact".into(),
            },
            Violation {
                kind: "NO_RETENTION_POLICY".into(),
                severity: "low".into(),
                fix: "Document a data retention schedule".into(),
            },
        ],
    })
    .await;
    assert_snapshot!("mixed_severity_report", output);
}

#[tokio::test(flavor = "current_thread")]
async fn compliant_report_snapshot() {
    let output = scan_and_render(ScanResult {
        score: 95,
        scan_method: "static".into(),
        summary: "No personal data handling detected".into(),
        violations: Vec::new(),
    })
    .await;
    assert_snapshot!("compliant_report", output);
}
