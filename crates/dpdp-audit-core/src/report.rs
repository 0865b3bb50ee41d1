use std::fmt::Write;

use serde::Serialize;

use crate::present::{ColorToken, ScoreBand, SeverityClass, ViolationsView, COMPLIANT_NOTICE};
use crate::scan::{ScanResult, ScanState};

/// Format styles supported in default reporter implementations.
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Applies a color token to a span of human output.
pub type Paint<'a> = &'a dyn Fn(&str, ColorToken) -> String;

fn plain(text: &str, _color: ColorToken) -> String {
    text.to_string()
}

/// Produce a report string from a `ScanState` using the desired format.
pub fn render_report(state: &ScanState, format: OutputFormat) -> anyhow::Result<String> {
    render_report_with(state, format, &plain)
}

/// Like [`render_report`], with colored spans for human output.
pub fn render_report_with(
    state: &ScanState,
    format: OutputFormat,
    paint: Paint<'_>,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Human => render_human(state, paint),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&JsonReport::from(state))?),
    }
}

fn render_human(state: &ScanState, paint: Paint<'_>) -> anyhow::Result<String> {
    let mut out = String::new();
    match state {
        ScanState::Idle => writeln!(out, "No scan submitted yet.")?,
        ScanState::Loading => writeln!(out, "⏳ Scanning...")?,
        ScanState::Failed(message) => writeln!(out, "{}", paint(message, ERROR_COLOR))?,
        ScanState::Success(result) => render_result(&mut out, result, paint)?,
    }
    Ok(out)
}

const ERROR_COLOR: ColorToken = SeverityClass::Critical.color();

fn render_result(out: &mut String, result: &ScanResult, paint: Paint<'_>) -> anyhow::Result<()> {
    let band = ScoreBand::from_score(result.score);
    writeln!(out, "{}", paint(&result.score.to_string(), band.color()))?;
    writeln!(out, "DPDP Compliance Score")?;
    writeln!(out, "{}", paint(band.label(), band.color()))?;
    writeln!(out)?;
    writeln!(out, "🛠️ Scan Method: {}", result.scan_method)?;
    writeln!(out, "Summary: {}", result.summary)?;
    writeln!(out)?;

    match ViolationsView::of(result) {
        ViolationsView::Compliant => writeln!(out, "{COMPLIANT_NOTICE}")?,
        ViolationsView::Issues(violations) => {
            writeln!(out, "🐛 Issues Found ({})", violations.len())?;
            for violation in violations {
                let class = SeverityClass::from_label(&violation.severity);
                writeln!(out, "  {} {}", class.marker(), violation.kind)?;
                writeln!(
                    out,
                    "     Severity: {}",
                    paint(&violation.severity, class.color())
                )?;
                writeln!(out, "     💡 Fix: {}", violation.fix)?;
            }
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonResult<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JsonResult<'a> {
    score: i64,
    band: ScoreBand,
    band_label: &'static str,
    band_color: ColorToken,
    scan_method: &'a str,
    summary: &'a str,
    compliant_without_violations: bool,
    violations: Vec<JsonViolation<'a>>,
}

#[derive(Debug, Serialize)]
struct JsonViolation<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    severity: &'a str,
    severity_class: SeverityClass,
    color: ColorToken,
    marker: &'static str,
    fix: &'a str,
}

impl<'a> From<&'a ScanResult> for JsonResult<'a> {
    fn from(result: &'a ScanResult) -> Self {
        let band = ScoreBand::from_score(result.score);
        Self {
            score: result.score,
            band,
            band_label: band.label(),
            band_color: band.color(),
            scan_method: &result.scan_method,
            summary: &result.summary,
            compliant_without_violations: ViolationsView::of(result) == ViolationsView::Compliant,
            violations: result
                .violations
                .iter()
                .map(|violation| {
                    let class = SeverityClass::from_label(&violation.severity);
                    JsonViolation {
                        kind: &violation.kind,
                        severity: &violation.severity,
                        severity_class: class,
                        color: class.color(),
                        marker: class.marker(),
                        fix: &violation.fix,
                    }
                })
                .collect(),
        }
    }
}

impl<'a> From<&'a ScanState> for JsonReport<'a> {
    fn from(state: &'a ScanState) -> Self {
        let (name, result, error) = match state {
            ScanState::Idle => ("idle", None, None),
            ScanState::Loading => ("loading", None, None),
            ScanState::Success(result) => ("success", Some(JsonResult::from(result)), None),
            ScanState::Failed(message) => ("failed", None, Some(message.as_str())),
        };
        Self {
            state: name,
            result,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::Violation;

    fn sample_result(violations: Vec<Violation>) -> ScanResult {
        ScanResult {
            score: 72,
            scan_method: "static".into(),
            summary: "ok".into(),
            violations,
        }
    }

    fn pii_violation() -> Violation {
        Violation {
            kind: "PII_LOGGED".into(),
            severity: "HIGH".into(),
            fix: "redact".into(),
        }
    }

    #[test]
    fn human_report_lists_violations_with_markers() {
        let state = ScanState::Success(sample_result(vec![pii_violation()]));
        let output = render_report(&state, OutputFormat::Human).unwrap();
        assert!(output.contains("⚠️ MOSTLY COMPLIANT"));
        assert!(output.contains("Issues Found (1)"));
        assert!(output.contains("🟠 PII_LOGGED"));
        assert!(!output.contains(COMPLIANT_NOTICE));
    }

    #[test]
    fn human_report_shows_compliant_notice_for_empty_list() {
        let state = ScanState::Success(sample_result(Vec::new()));
        let output = render_report(&state, OutputFormat::Human).unwrap();
        assert!(output.contains(COMPLIANT_NOTICE));
        assert!(!output.contains("Issues Found"));
    }

    #[test]
    fn failed_state_renders_only_the_banner() {
        let state = ScanState::Failed("Error: Scan failed. Make sure repo is public.".into());
        let output = render_report(&state, OutputFormat::Human).unwrap();
        assert_eq!(output, "Error: Scan failed. Make sure repo is public.\n");
    }

    #[test]
    fn paint_wraps_score_and_severity() {
        let state = ScanState::Success(sample_result(vec![pii_violation()]));
        let paint = |text: &str, color: ColorToken| format!("<{}>{text}</>", color.hex());
        let output = render_report_with(&state, OutputFormat::Human, &paint).unwrap();
        assert!(output.contains("<#f59e0b>72</>"));
        assert!(output.contains("<#ea580c>HIGH</>"));
    }

    #[test]
    fn json_report_serializes() {
        let state = ScanState::Success(sample_result(vec![pii_violation()]));
        let output = render_report(&state, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["state"], "success");
        assert_eq!(value["result"]["band"], "MOSTLY_COMPLIANT");
        assert_eq!(value["result"]["violations"][0]["type"], "PII_LOGGED");
        assert_eq!(value["result"]["violations"][0]["severity_class"], "high");
        assert_eq!(value["result"]["compliant_without_violations"], false);
        assert!(value.get("error").is_none());
    }

    #[test]
    fn json_report_carries_error() {
        let state = ScanState::Failed("Error: Scan failed. Make sure repo is public.".into());
        let output = render_report(&state, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["state"], "failed");
        assert!(value.get("result").is_none());
    }
}
