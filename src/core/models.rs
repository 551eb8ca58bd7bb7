// src/core/models.rs

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, EnumString};

use crate::core::errors::ModelError;

// --- Scan Lifecycle ---

/// The lifecycle state of a scan, as written by the backend executor.
///
/// `Pending` and `Running` both mean "still scanning". `Success`, `Error`, `Failed` and
/// `Cancelled` are terminal: once one of them is observed the scan never changes again.
///
/// Some executors write `processing` for a running scan and `completed` for a scan that
/// finished without rows; both decode to their usual counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ScanStatus {
    Pending,
    #[serde(alias = "processing")]
    #[strum(to_string = "running", serialize = "processing")]
    Running,
    #[serde(alias = "completed")]
    #[strum(to_string = "success", serialize = "completed")]
    Success,
    Error,
    Failed,
    /// Stopped on the backend before it finished. Terminal, without results.
    Cancelled,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScanStatus::Pending | ScanStatus::Running)
    }

    /// Only a successful scan has result collections worth fetching.
    pub fn unlocks_results(self) -> bool {
        self == ScanStatus::Success
    }

    pub fn is_failure(self) -> bool {
        matches!(self, ScanStatus::Error | ScanStatus::Failed)
    }
}

// A single invocation of an external tool against a scope target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub scan_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_target_id: Option<String>,
    pub status: ScanStatus,
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        deserialize_with = "deserialize_execution_time",
        serialize_with = "serialize_execution_time",
        skip_serializing_if = "Option::is_none"
    )]
    pub execution_time: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Returns the newest scan of a history; every older one is superseded by it.
/// On equal timestamps the later entry of the list wins.
pub fn latest_scan(scans: &[ScanRecord]) -> Option<&ScanRecord> {
    scans.iter().max_by_key(|scan| scan.created_at)
}

// Body of `POST /{tool}/run/{scope_target_id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanParams {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domains: Vec<String>,
    /// Tool-specific parameters, sent alongside `domains` at the top level.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ScanParams {
    pub fn with_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains.into_iter().map(Into::into).collect(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedScan {
    pub scan_id: String,
}

// --- Tools and Targets ---

static TOOL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("tool name pattern is valid")
});

/// Name of an external reconnaissance tool (`amass`, `dnsx`, `httpx`, ...).
///
/// The name is used verbatim as a URL path segment, so it is restricted to a
/// conservative character set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tool(String);

impl Tool {
    pub fn new(name: &str) -> Result<Self, ModelError> {
        let name = name.trim();
        if TOOL_NAME.is_match(name) {
            Ok(Tool(name.to_string()))
        } else {
            Err(ModelError::InvalidTool(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Tool {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::new(s)
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub scope_target: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

// --- Result Collections ---

/// DNS record tag. Anything outside the known set is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
#[strum(ascii_case_insensitive)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Ns,
    Txt,
    Ptr,
    Srv,
    #[strum(disabled)]
    Other(String),
}

impl RecordType {
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Ns => "NS",
            RecordType::Txt => "TXT",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Other(raw) => raw,
        }
    }
}

impl From<String> for RecordType {
    fn from(raw: String) -> Self {
        raw.trim().parse().unwrap_or(RecordType::Other(raw))
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloud provider a discovered domain belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "String", into = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
    #[strum(disabled)]
    Other(String),
}

impl CloudProvider {
    pub fn as_str(&self) -> &str {
        match self {
            CloudProvider::Aws => "aws",
            CloudProvider::Gcp => "gcp",
            CloudProvider::Azure => "azure",
            CloudProvider::Other(raw) => raw,
        }
    }
}

impl From<String> for CloudProvider {
    fn from(raw: String) -> Self {
        raw.trim().parse().unwrap_or(CloudProvider::Other(raw))
    }
}

impl From<CloudProvider> for String {
    fn from(value: CloudProvider) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// The backend names the tag `record_type` on DNS rows and `type` on cloud rows, and
// occasionally swaps them. Both spellings are accepted on both kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    pub domain: String,
    #[serde(alias = "type")]
    pub record_type: RecordType,
    pub record: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudDomain {
    pub domain: String,
    #[serde(rename = "type", alias = "record_type")]
    pub provider: CloudProvider,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    pub domain: String,
    pub raw_output: String,
    pub created_at: DateTime<Utc>,
}

// --- Execution Time ---

// The backend reports execution time either as seconds or as a duration string
// such as "1m2.5s". Values that match neither shape decode as `None`.
fn deserialize_execution_time<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().and_then(seconds_to_duration),
        Some(serde_json::Value::String(s)) => parse_duration_str(&s),
        _ => None,
    })
}

fn serialize_execution_time<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(d) => serializer.serialize_f64(d.as_secs_f64()),
        None => serializer.serialize_none(),
    }
}

// Negative, NaN and out-of-range values yield `None`.
fn seconds_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

/// Parses a plain number of seconds or a compound duration like `1h2m3.5s`, `450ms`.
pub fn parse_duration_str(input: &str) -> Option<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(secs) = input.parse::<f64>() {
        return seconds_to_duration(secs);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut total = 0.0_f64;
    let mut rest = input;
    while !rest.is_empty() {
        let number_end = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        if number_end == 0 {
            return None;
        }
        let value: f64 = rest[..number_end].parse().ok()?;
        rest = &rest[number_end..];

        let unit_end = rest.find(is_number).unwrap_or(rest.len());
        let factor = match &rest[..unit_end] {
            "h" => 3600.0,
            "m" => 60.0,
            "s" => 1.0,
            "ms" => 1e-3,
            "us" | "µs" => 1e-6,
            "ns" => 1e-9,
            _ => return None,
        };
        total += value * factor;
        rest = &rest[unit_end..];
    }
    seconds_to_duration(total)
}

/// Short human form used by the UI: `4.2s`, `3m 07s`, `1h 02m 03s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        format!("{}h {:02}m {:02}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}
