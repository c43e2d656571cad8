//! Alert events handed over by the alerting pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Severity levels for alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - normal operations
    Info,
    /// Warning - something needs attention
    Warning,
    /// Critical - immediate action required
    Critical,
    /// Emergency - the target is down
    Emergency,
}

impl Severity {
    /// Get display name for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
            Self::Emergency => "Emergency",
        }
    }

    /// Get the Discord embed color for this severity.
    #[must_use]
    pub const fn color(&self) -> u32 {
        match self {
            Self::Info => 0x0034_98db,      // Blue
            Self::Warning => 0x00f3_9c12,   // Orange
            Self::Critical => 0x00e7_4c3c,  // Red
            Self::Emergency => 0x008e_44ad, // Purple
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fired alert.
///
/// Only ever read by this crate. `fields` feeds template substitution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Identity of the monitored target (host, service, monitor name).
    pub target: String,
    pub severity: Severity,
    /// Human-readable alert text produced by the rule that fired.
    #[serde(default)]
    pub content: String,
    #[serde(default = "Utc::now")]
    pub fired_at: DateTime<Utc>,
    /// Named values available to templates as `{name}`.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Alert {
    #[must_use]
    pub fn new(target: impl Into<String>, severity: Severity, fired_at: DateTime<Utc>) -> Self {
        Self {
            target: target.into(),
            severity,
            content: String::new(),
            fired_at,
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Resolve a template placeholder against this alert.
    ///
    /// Explicit fields shadow the built-in names `target`, `severity`,
    /// `content` and `fired_at`.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<String> {
        if let Some(value) = self.fields.get(name) {
            return Some(value.clone());
        }

        match name {
            "target" => Some(self.target.clone()),
            "severity" => Some(self.severity.as_str().to_string()),
            "content" => Some(self.content.clone()),
            "fired_at" => Some(self.fired_at.to_rfc3339()),
            _ => None,
        }
    }
}
