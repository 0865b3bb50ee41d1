//! Pure mappings from scan values to display classifications.
//!
//! Every function here is total: malformed scores and unknown severities
//! resolve to a class instead of failing.

use serde::Serialize;

use crate::scan::{ScanResult, Violation};

/// A `#rrggbb` color token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColorToken(&'static str);

impl ColorToken {
    pub const fn hex(self) -> &'static str {
        self.0
    }

    /// Red, green, and blue channels for truecolor terminals.
    pub fn rgb(self) -> (u8, u8, u8) {
        let channel = |range: std::ops::Range<usize>| {
            self.0
                .get(range)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok())
                .unwrap_or(0)
        };
        (channel(1..3), channel(3..5), channel(5..7))
    }
}

/// Compliance tier derived from the numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScoreBand {
    Compliant,
    MostlyCompliant,
    PartiallyCompliant,
    NonCompliant,
}

impl ScoreBand {
    pub const COMPLIANT_MIN: i64 = 80;
    pub const MOSTLY_COMPLIANT_MIN: i64 = 60;
    pub const PARTIALLY_COMPLIANT_MIN: i64 = 40;

    /// Map any integer score into a band. Out-of-range values clamp to the extremes.
    pub fn from_score(score: i64) -> Self {
        if score >= Self::COMPLIANT_MIN {
            Self::Compliant
        } else if score >= Self::MOSTLY_COMPLIANT_MIN {
            Self::MostlyCompliant
        } else if score >= Self::PARTIALLY_COMPLIANT_MIN {
            Self::PartiallyCompliant
        } else {
            Self::NonCompliant
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::MostlyCompliant => "MOSTLY_COMPLIANT",
            Self::PartiallyCompliant => "PARTIALLY_COMPLIANT",
            Self::NonCompliant => "NON_COMPLIANT",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Compliant => "✅ COMPLIANT",
            Self::MostlyCompliant => "⚠️ MOSTLY COMPLIANT",
            Self::PartiallyCompliant => "🟠 PARTIALLY COMPLIANT",
            Self::NonCompliant => "❌ NON-COMPLIANT",
        }
    }

    pub const fn color(self) -> ColorToken {
        match self {
            Self::Compliant => ColorToken("#10b981"),
            Self::MostlyCompliant => ColorToken("#f59e0b"),
            Self::PartiallyCompliant => ColorToken("#ef4444"),
            Self::NonCompliant => ColorToken("#991b1b"),
        }
    }
}

/// Display tier for a violation's reported severity.
///
/// Only three labels are recognized. Everything else, including an empty or
/// `LOW` severity, lands in `Default`, the most muted class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityClass {
    Critical,
    High,
    Medium,
    Default,
}

impl SeverityClass {
    /// Classify a raw severity label, ignoring case.
    pub fn from_label(label: &str) -> Self {
        match label.to_uppercase().as_str() {
            "CRITICAL" => Self::Critical,
            "HIGH" => Self::High,
            "MEDIUM" => Self::Medium,
            _ => Self::Default,
        }
    }

    pub const fn color(self) -> ColorToken {
        match self {
            Self::Critical => ColorToken("#dc2626"),
            Self::High => ColorToken("#ea580c"),
            Self::Medium => ColorToken("#eab308"),
            Self::Default => ColorToken("#3b82f6"),
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Critical => "🔴",
            Self::High => "🟠",
            Self::Medium => "🟡",
            Self::Default => "🔵",
        }
    }
}

/// How the violations section of a result is presented.
///
/// An empty list is an affirmative compliant signal, not missing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationsView<'a> {
    Compliant,
    Issues(&'a [Violation]),
}

impl<'a> ViolationsView<'a> {
    pub fn of(result: &'a ScanResult) -> Self {
        if result.violations.is_empty() {
            Self::Compliant
        } else {
            Self::Issues(&result.violations)
        }
    }
}

pub const COMPLIANT_NOTICE: &str =
    "✅ No DPDP violations found! This repository appears compliant.";
