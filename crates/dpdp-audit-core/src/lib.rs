pub mod present;
pub mod report;
pub mod scan;
pub mod service;

pub use present::{ColorToken, ScoreBand, SeverityClass, ViolationsView};
pub use report::{render_report, render_report_with, OutputFormat};
pub use scan::{
    controller::{PendingScan, ScanController, ScanOutcome, DEFAULT_SCAN_TIMEOUT},
    ScanError, ScanRequest, ScanResult, ScanState, ScanTransport, SubmitError, Violation,
};
pub use service::{HttpScanTransport, ServiceSettings};
